use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, put},
};

/// Admin Router Module
///
/// Account moderation. The handlers reject non-staff actors with `403`.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/users
        .route("/users", get(handlers::get_admin_users))
        // PUT /admin/users/{id}/frozen
        // Body is a bare JSON boolean.
        .route("/users/{id}/frozen", put(handlers::update_user_frozen))
}
