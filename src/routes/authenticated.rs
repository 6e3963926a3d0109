use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post, put},
};

/// Authenticated Router Module
///
/// Every write lives here. The router layer guarantees an authenticated
/// actor; the handlers then apply the per-resource gates (author or staff
/// for articles and comments, staff for categories).
///
/// The paths share a prefix with public GET routes; axum merges the method
/// routers, so `GET /articles/{id}` stays public while `PUT` requires a user.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /me
        .route("/me", get(handlers::get_me))
        // POST /articles
        // New articles start as drafts unless a status is given.
        .route("/articles", post(handlers::create_article))
        // PUT/DELETE /articles/{id}
        .route(
            "/articles/{id}",
            put(handlers::update_article).delete(handlers::delete_article),
        )
        .route("/articles/{id}/comments", post(handlers::add_comment))
        .route(
            "/comments/{id}",
            put(handlers::update_comment).delete(handlers::delete_comment),
        )
        // Category writes: staff only, checked in the handler.
        .route("/categories", post(handlers::create_category))
        .route(
            "/categories/{id}",
            put(handlers::update_category).delete(handlers::delete_category),
        )
}
