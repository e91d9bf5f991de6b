//! Web error type
//!
//! Handlers return `Result<Response, WebError>`. Redirects become bare 302
//! responses; error statuses are tagged with [`ErrorPage`] so the error-page
//! middleware can render the matching template around them.

use axum::{
    extract::{multipart::MultipartError, rejection::PathRejection},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::services::{CategoryServiceError, CommentServiceError, PostServiceError, UserServiceError};
use crate::theme::ThemeEngine;
use crate::web::common::{found, login_url, post_url};

/// Marker extension asking the error-page middleware to render a template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorPage;

/// Failures a handler can end with
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    #[error("Not found")]
    NotFound,

    #[error("Forbidden")]
    Forbidden,

    /// Malformed request body
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Anonymous user on a route that needs a login
    #[error("Login required for {next}")]
    LoginRequired { next: String },

    /// Send the user elsewhere; used for ownership violations
    #[error("Redirect to {0}")]
    Redirect(String),

    #[error("Internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

/// Bare response with an error status, to be dressed by the middleware
pub fn error_page(status: StatusCode) -> Response {
    let mut response = status.into_response();
    response.extensions_mut().insert(ErrorPage);
    response
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        match self {
            WebError::NotFound => error_page(StatusCode::NOT_FOUND),
            WebError::Forbidden => error_page(StatusCode::FORBIDDEN),
            WebError::BadRequest(reason) => {
                tracing::debug!("Bad request: {}", reason);
                (
                    StatusCode::BAD_REQUEST,
                    Html(ThemeEngine::simple_error_page(400, "Bad request")),
                )
                    .into_response()
            }
            WebError::LoginRequired { next } => found(&login_url(&next)),
            WebError::Redirect(to) => found(&to),
            WebError::Internal(e) => {
                tracing::error!("Request failed: {:#}", e);
                error_page(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

impl From<PathRejection> for WebError {
    fn from(_: PathRejection) -> Self {
        WebError::NotFound
    }
}

impl From<MultipartError> for WebError {
    fn from(e: MultipartError) -> Self {
        WebError::BadRequest(e.body_text())
    }
}

impl From<PostServiceError> for WebError {
    fn from(e: PostServiceError) -> Self {
        match e {
            PostServiceError::NotFound(_) => WebError::NotFound,
            PostServiceError::NotOwner { post_id } => WebError::Redirect(post_url(post_id)),
            PostServiceError::InternalError(e) => WebError::Internal(e),
            other => WebError::Internal(other.into()),
        }
    }
}

impl From<CommentServiceError> for WebError {
    fn from(e: CommentServiceError) -> Self {
        match e {
            CommentServiceError::PostNotFound(_) | CommentServiceError::NotFound(_) => WebError::NotFound,
            CommentServiceError::NotOwner { post_id, .. } => WebError::Redirect(post_url(post_id)),
            CommentServiceError::InternalError(e) => WebError::Internal(e),
        }
    }
}

impl From<CategoryServiceError> for WebError {
    fn from(e: CategoryServiceError) -> Self {
        match e {
            CategoryServiceError::NotFound(_) => WebError::NotFound,
            CategoryServiceError::InternalError(e) => WebError::Internal(e),
            other => WebError::Internal(other.into()),
        }
    }
}

impl From<UserServiceError> for WebError {
    fn from(e: UserServiceError) -> Self {
        match e {
            UserServiceError::NotFound => WebError::NotFound,
            UserServiceError::InternalError(e) => WebError::Internal(e),
            other => WebError::Internal(other.into()),
        }
    }
}
