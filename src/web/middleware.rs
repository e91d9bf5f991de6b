//! Web middleware and extractors
//!
//! Contains:
//! - Session resolution (`sessionid` cookie → [`CurrentUser`])
//! - [`LoginRequired`] extractor for authoring routes
//! - Origin check for unsafe methods
//! - Error-page rendering for 404/403/500 responses

use axum::{
    body::HttpBody,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, Method, StatusCode},
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use std::convert::Infallible;
use std::sync::Arc;

use crate::config::Config;
use crate::db::repositories::{
    SqlxCategoryRepository, SqlxCommentRepository, SqlxLocationRepository, SqlxPostRepository,
    SqlxSessionRepository, SqlxUserRepository,
};
use crate::db::DynDatabasePool;
use crate::models::User;
use crate::services::{
    CategoryService, CommentService, LocationService, MediaStore, PostService, UserService,
};
use crate::theme::{ThemeEngine, SERVER_ERROR_TEMPLATE};
use crate::web::common::{base_context, request_host};
use crate::web::error::{error_page, ErrorPage, WebError};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "sessionid";

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub post_service: Arc<PostService>,
    pub comment_service: Arc<CommentService>,
    pub category_service: Arc<CategoryService>,
    pub location_service: Arc<LocationService>,
    pub media: Arc<MediaStore>,
    pub theme: Arc<ThemeEngine>,
    /// Origins allowed to POST besides the request's own host
    pub trusted_origins: Arc<Vec<String>>,
}

impl AppState {
    /// Wire repositories and services over one database pool
    pub fn new(pool: DynDatabasePool, config: &Config, theme: ThemeEngine) -> Self {
        let users = SqlxUserRepository::boxed(pool.clone());
        let sessions = SqlxSessionRepository::boxed(pool.clone());
        let categories = SqlxCategoryRepository::boxed(pool.clone());
        let locations = SqlxLocationRepository::boxed(pool.clone());
        let posts = SqlxPostRepository::boxed(pool.clone());
        let comments = SqlxCommentRepository::boxed(pool);

        Self {
            user_service: Arc::new(UserService::with_session_expiration(
                users,
                sessions,
                config.session.expiration_days,
            )),
            post_service: Arc::new(PostService::new(posts.clone(), categories.clone(), locations.clone())),
            comment_service: Arc::new(CommentService::new(comments, posts)),
            category_service: Arc::new(CategoryService::new(categories)),
            location_service: Arc::new(LocationService::new(locations)),
            media: Arc::new(MediaStore::new(config.media.clone())),
            theme: Arc::new(theme),
            trusted_origins: Arc::new(config.server.trusted_origins.clone()),
        }
    }
}

/// The user behind the request, if any
#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<User>);

/// A logged-in user; anonymous requests are redirected to the login page
#[derive(Debug, Clone)]
pub struct LoginRequired(pub User);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<CurrentUser>().cloned().unwrap_or_default())
    }
}

impl<S: Send + Sync> FromRequestParts<S> for LoginRequired {
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<CurrentUser>() {
            Some(CurrentUser(Some(user))) => Ok(LoginRequired(user.clone())),
            _ => {
                let next = parts
                    .uri
                    .path_and_query()
                    .map(|p| p.as_str().to_string())
                    .unwrap_or_else(|| "/".to_string());
                Err(WebError::LoginRequired { next })
            }
        }
    }
}

/// Extract the session token from the `Cookie` header
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let prefix = format!("{}=", SESSION_COOKIE);
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .map(str::trim)
        .find_map(|cookie| cookie.strip_prefix(prefix.as_str()))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// `Set-Cookie` value starting a session
pub fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE, token, max_age_secs
    )
}

/// `Set-Cookie` value ending a session
pub fn clear_session_cookie() -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", SESSION_COOKIE)
}

/// Resolve the session cookie into a [`CurrentUser`] extension.
///
/// Unknown or expired tokens make the request anonymous.
pub async fn resolve_user(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let mut user = None;
    if let Some(token) = session_token(request.headers()) {
        match state.user_service.validate_session(&token).await {
            Ok(found) => user = found,
            Err(e) => tracing::warn!("Session lookup failed: {}", e),
        }
    }
    request.extensions_mut().insert(CurrentUser(user));
    next.run(request).await
}

/// Reject cross-origin form submissions.
///
/// An unsafe request carrying an `Origin` header must come from the
/// request's own host or from a trusted origin.
pub async fn origin_check(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if is_safe_method(request.method()) {
        return next.run(request).await;
    }

    if let Some(origin) = request.headers().get(header::ORIGIN) {
        let allowed = origin
            .to_str()
            .map(|origin| origin_allowed(origin, request.headers(), &state.trusted_origins))
            .unwrap_or(false);
        if !allowed {
            tracing::warn!(
                origin = ?origin,
                path = %request.uri().path(),
                "Rejected cross-origin request"
            );
            return error_page(StatusCode::FORBIDDEN);
        }
    }

    next.run(request).await
}

fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE)
}

fn origin_allowed(origin: &str, headers: &HeaderMap, trusted: &[String]) -> bool {
    if trusted.iter().any(|t| t == origin) {
        return true;
    }
    match request_host(headers) {
        Some(host) => origin
            .strip_prefix("http://")
            .or_else(|| origin.strip_prefix("https://"))
            .is_some_and(|rest| rest == host),
        None => false,
    }
}

/// Render the error template for marked responses and for bare 404s
/// (unmatched routes, missing media files).
pub async fn error_pages(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let user = request
        .extensions()
        .get::<CurrentUser>()
        .and_then(|current| current.0.clone());

    let response = next.run(request).await;

    let status = response.status();
    let marked = response.extensions().get::<ErrorPage>().is_some();
    let bare_not_found = status == StatusCode::NOT_FOUND && response.body().size_hint().exact() == Some(0);
    if !marked && !bare_not_found {
        return response;
    }

    let template = match status {
        StatusCode::NOT_FOUND => "pages/404.html",
        StatusCode::FORBIDDEN => "pages/403csrf.html",
        _ => SERVER_ERROR_TEMPLATE,
    };
    let html = state
        .theme
        .render_with_fallback(template, &base_context(user.as_ref()));
    (status, Html(html)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_session_token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; sessionid=abc-123; other=1"),
        );
        assert_eq!(session_token(&headers), Some("abc-123".to_string()));
    }

    #[test]
    fn test_session_token_missing_or_empty() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(&headers), None);

        headers.insert(header::COOKIE, HeaderValue::from_static("sessionid="));
        assert_eq!(session_token(&headers), None);

        headers.insert(header::COOKIE, HeaderValue::from_static("xsessionid=abc"));
        assert_eq!(session_token(&headers), None);
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("tok", 1209600);
        assert_eq!(cookie, "sessionid=tok; HttpOnly; SameSite=Lax; Path=/; Max-Age=1209600");
        assert!(clear_session_cookie().contains("Max-Age=0"));
    }

    #[test]
    fn test_origin_allowed() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("blog.example:8080"));
        let trusted = vec!["https://trusted.example".to_string()];

        assert!(origin_allowed("http://blog.example:8080", &headers, &trusted));
        assert!(origin_allowed("https://blog.example:8080", &headers, &trusted));
        assert!(origin_allowed("https://trusted.example", &headers, &trusted));
        assert!(!origin_allowed("https://evil.example", &headers, &trusted));
        assert!(!origin_allowed("null", &headers, &trusted));
        assert!(!origin_allowed("http://blog.example", &headers, &trusted));
    }

    #[test]
    fn test_safe_methods() {
        assert!(is_safe_method(&Method::GET));
        assert!(is_safe_method(&Method::HEAD));
        assert!(!is_safe_method(&Method::POST));
        assert!(!is_safe_method(&Method::DELETE));
    }
}
