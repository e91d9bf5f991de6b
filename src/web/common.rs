//! Common web utilities shared by the handlers

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use tera::Context as TeraContext;

use crate::models::User;
use crate::services::media::MEDIA_URL;
use crate::web::error::WebError;
use crate::web::middleware::AppState;

/// `?page=` as typed; resolved leniently by the paginator
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// `?next=` on the login page
#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

/// 302 redirect
pub fn found(to: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, to.to_string())]).into_response()
}

pub fn post_url(post_id: i64) -> String {
    format!("/posts/{}/", post_id)
}

pub fn profile_url(username: &str) -> String {
    format!("/profile/{}/", urlencoding::encode(username))
}

pub fn login_url(next: &str) -> String {
    format!("/auth/login/?next={}", urlencoding::encode(next))
}

/// Context every page starts from
pub fn base_context(user: Option<&User>) -> TeraContext {
    let mut context = TeraContext::new();
    context.insert("user", &user);
    context.insert("media_url", MEDIA_URL);
    context
}

/// Render a page with status 200
pub fn render(state: &AppState, template: &str, context: &TeraContext) -> Result<Response, WebError> {
    let html = state.theme.render(template, context)?;
    Ok(Html(html).into_response())
}

/// Value of the `Host` header, if any
pub fn request_host(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::HOST).and_then(|v| v.to_str().ok())
}
