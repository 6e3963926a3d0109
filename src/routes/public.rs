use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Read endpoints and token issuance. Handlers resolve an optional `Actor`,
/// so an authenticated caller may still see their own drafts here.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        .route("/health", get(|| async { "ok" }))
        // POST /token
        // Credential exchange; frozen accounts are refused after the password check.
        .route("/token", post(handlers::obtain_token))
        // GET /articles?status=&category=&author=&search=&ordering=
        .route("/articles", get(handlers::get_articles))
        // GET /articles/{id}
        // Published, or the actor's own draft.
        .route("/articles/{id}", get(handlers::get_article))
        .route("/articles/{id}/comments", get(handlers::get_article_comments))
        .route("/categories", get(handlers::get_categories))
        .route("/categories/{id}", get(handlers::get_category))
        // GET /categories/{id}/closure
        // The category plus all of its descendants.
        .route("/categories/{id}/closure", get(handlers::get_category_closure))
}
