//! Static pages

use axum::{extract::State, response::Response, routing::get, Router};

use crate::web::common::{base_context, render};
use crate::web::error::WebError;
use crate::web::middleware::{AppState, CurrentUser};

/// Build the static pages router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/pages/about/", get(about))
        .route("/pages/rules/", get(rules))
}

/// GET /pages/about/
pub async fn about(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> Result<Response, WebError> {
    render(&state, "pages/about.html", &base_context(user.as_ref()))
}

/// GET /pages/rules/
pub async fn rules(State(state): State<AppState>, CurrentUser(user): CurrentUser) -> Result<Response, WebError> {
    render(&state, "pages/rules.html", &base_context(user.as_ref()))
}

/// Any unmatched route
pub async fn not_found() -> WebError {
    WebError::NotFound
}
