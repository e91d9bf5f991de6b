//! Web layer - HTML handlers and routing
//!
//! Every response is a rendered page or a 302 redirect. Request flow,
//! outermost first:
//! - request tracing
//! - session resolution into [`CurrentUser`]
//! - error-page rendering
//! - origin check on unsafe methods
//! - the handler

pub mod auth;
pub mod blog;
pub mod comments;
pub mod common;
pub mod error;
pub mod middleware;
pub mod pages;
pub mod profile;

use axum::{middleware as axum_middleware, Router};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::services::media::MEDIA_URL;

pub use error::{ErrorPage, WebError};
pub use middleware::{AppState, CurrentUser, LoginRequired, SESSION_COOKIE};

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let media_prefix = MEDIA_URL.trim_end_matches('/');
    let media_files = ServeDir::new(state.media.root());

    Router::new()
        .merge(blog::router(state.media.max_file_size()))
        .merge(comments::router())
        .merge(profile::router())
        .merge(auth::router())
        .merge(pages::router())
        .nest_service(media_prefix, media_files)
        .fallback(pages::not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::origin_check,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::error_pages,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::resolve_user,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
