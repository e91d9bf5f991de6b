//! Profile page and profile editing

use axum::{
    extract::{rejection::PathRejection, Path, Query, State},
    response::Response,
    routing::get,
    Form, Router,
};

use crate::forms::profile::USERNAME_TAKEN;
use crate::forms::{FormErrors, ProfileForm};
use crate::models::User;
use crate::services::{Ownership, UserServiceError};
use crate::web::common::{base_context, found, profile_url, render, PageQuery};
use crate::web::error::WebError;
use crate::web::middleware::{AppState, CurrentUser, LoginRequired};

/// Build the profile router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile/{username}/", get(profile))
        .route("/profile/{username}/edit/", get(edit_profile_form).post(edit_profile))
}

async fn find_profile(state: &AppState, username: &str) -> Result<User, WebError> {
    state
        .user_service
        .get_by_username(username)
        .await?
        .ok_or(WebError::NotFound)
}

/// Load the profile `user` wants to edit; anyone but its owner is sent
/// back to the profile page.
async fn owned_profile(state: &AppState, username: &str, user: &User) -> Result<User, WebError> {
    let profile = find_profile(state, username).await?;
    match Ownership::check(profile.id, Some(user)) {
        Ownership::Owner => Ok(profile),
        Ownership::NotOwner => Err(WebError::Redirect(profile_url(&profile.username))),
    }
}

fn render_edit_page(
    state: &AppState,
    user: &User,
    form: &ProfileForm,
    errors: &FormErrors,
) -> Result<Response, WebError> {
    let mut context = base_context(Some(user));
    context.insert("form", form);
    context.insert("errors", errors);
    render(state, "blog/user.html", &context)
}

/// GET /profile/{username}/
pub async fn profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    username: Result<Path<String>, PathRejection>,
    Query(query): Query<PageQuery>,
) -> Result<Response, WebError> {
    let Path(username) = username?;
    let profile = find_profile(&state, &username).await?;
    let page_obj = state
        .post_service
        .list_for_profile(&profile, query.page.as_deref())
        .await?;

    let mut context = base_context(user.as_ref());
    context.insert("profile", &profile);
    context.insert("page_obj", &page_obj);
    render(&state, "blog/profile.html", &context)
}

/// GET /profile/{username}/edit/
pub async fn edit_profile_form(
    State(state): State<AppState>,
    LoginRequired(user): LoginRequired,
    username: Result<Path<String>, PathRejection>,
) -> Result<Response, WebError> {
    let Path(username) = username?;
    let profile = owned_profile(&state, &username, &user).await?;

    render_edit_page(&state, &user, &ProfileForm::from_user(&profile), &FormErrors::new())
}

/// POST /profile/{username}/edit/
pub async fn edit_profile(
    State(state): State<AppState>,
    LoginRequired(user): LoginRequired,
    username: Result<Path<String>, PathRejection>,
    Form(form): Form<ProfileForm>,
) -> Result<Response, WebError> {
    let Path(username) = username?;
    let profile = owned_profile(&state, &username, &user).await?;

    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => return render_edit_page(&state, &user, &form, &errors),
    };

    match state.user_service.update_profile(profile.id, input).await {
        Ok(updated) => {
            tracing::info!(user_id = updated.id, "Profile updated");
            Ok(found(&profile_url(&updated.username)))
        }
        Err(UserServiceError::UserExists(_)) => {
            render_edit_page(&state, &user, &form, &FormErrors::single("username", USERNAME_TAKEN))
        }
        Err(UserServiceError::ValidationError(message)) => {
            render_edit_page(&state, &user, &form, &FormErrors::single("username", message))
        }
        Err(e) => Err(e.into()),
    }
}
