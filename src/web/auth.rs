//! Authentication pages: login, logout and registration

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue},
    response::Response,
    routing::get,
    Form, Router,
};

use crate::forms::profile::USERNAME_TAKEN;
use crate::forms::{FormErrors, LoginForm, RegistrationForm};
use crate::models::User;
use crate::services::UserServiceError;
use crate::web::common::{base_context, found, render, NextQuery};
use crate::web::error::WebError;
use crate::web::middleware::{clear_session_cookie, session_cookie, session_token, AppState, CurrentUser};

/// Build the auth router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/login/", get(login_form).post(login))
        .route("/auth/logout/", get(logout).post(logout))
        .route("/auth/registration/", get(registration_form).post(register))
}

fn set_cookie(response: &mut Response, cookie: &str) -> Result<(), WebError> {
    let value = HeaderValue::from_str(cookie).map_err(|e| WebError::Internal(e.into()))?;
    response.headers_mut().insert(header::SET_COOKIE, value);
    Ok(())
}

fn render_login(
    state: &AppState,
    user: Option<&User>,
    form: &LoginForm,
    errors: &FormErrors,
) -> Result<Response, WebError> {
    let mut context = base_context(user);
    context.insert("form", form);
    context.insert("errors", errors);
    render(state, "registration/login.html", &context)
}

fn render_registration(
    state: &AppState,
    user: Option<&User>,
    form: &RegistrationForm,
    errors: &FormErrors,
) -> Result<Response, WebError> {
    let mut context = base_context(user);
    context.insert("form", form);
    context.insert("errors", errors);
    render(state, "registration/registration_form.html", &context)
}

/// GET /auth/login/
pub async fn login_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<NextQuery>,
) -> Result<Response, WebError> {
    let form = LoginForm {
        next: query.next,
        ..LoginForm::default()
    };
    render_login(&state, user.as_ref(), &form, &FormErrors::new())
}

/// POST /auth/login/
pub async fn login(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<LoginForm>,
) -> Result<Response, WebError> {
    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => return render_login(&state, user.as_ref(), &form, &errors),
    };

    match state.user_service.login(input).await {
        Ok(session) => {
            let max_age = state.user_service.session_lifetime().num_seconds();
            let mut response = found(form.redirect_target());
            set_cookie(&mut response, &session_cookie(&session.id, max_age))?;
            Ok(response)
        }
        Err(UserServiceError::AuthenticationError(_)) => {
            render_login(&state, user.as_ref(), &form, &LoginForm::invalid_credentials())
        }
        Err(e) => Err(e.into()),
    }
}

/// GET or POST /auth/logout/
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, WebError> {
    if let Some(token) = session_token(&headers) {
        state.user_service.logout(&token).await?;
    }

    let mut response = render(&state, "registration/logged_out.html", &base_context(None))?;
    set_cookie(&mut response, &clear_session_cookie())?;
    Ok(response)
}

/// GET /auth/registration/
pub async fn registration_form(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Response, WebError> {
    render_registration(&state, user.as_ref(), &RegistrationForm::default(), &FormErrors::new())
}

/// POST /auth/registration/
pub async fn register(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<RegistrationForm>,
) -> Result<Response, WebError> {
    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => return render_registration(&state, user.as_ref(), &form, &errors),
    };

    match state.user_service.register(input).await {
        Ok(_) => Ok(found("/")),
        Err(UserServiceError::UserExists(_)) => render_registration(
            &state,
            user.as_ref(),
            &form,
            &FormErrors::single("username", USERNAME_TAKEN),
        ),
        Err(UserServiceError::ValidationError(message)) => {
            let mut errors = FormErrors::new();
            errors.add_non_field(message);
            render_registration(&state, user.as_ref(), &form, &errors)
        }
        Err(e) => Err(e.into()),
    }
}
