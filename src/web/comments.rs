//! Comment handlers
//!
//! The post and author of a comment come from the URL and the session,
//! never from the submitted form.

use axum::{
    extract::{rejection::PathRejection, Path, State},
    response::Response,
    routing::{get, post},
    Form, Router,
};

use crate::forms::{CommentForm, FormErrors};
use crate::models::{Comment, User};
use crate::web::common::{base_context, found, post_url, render};
use crate::web::error::WebError;
use crate::web::middleware::{AppState, LoginRequired};

/// Build the comment router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/posts/{post_id}/comment/", post(add_comment))
        .route(
            "/posts/{post_id}/edit_comment/{comment_id}/",
            get(edit_comment_form).post(edit_comment),
        )
        .route(
            "/posts/{post_id}/delete_comment/{comment_id}/",
            get(delete_comment_form).post(delete_comment),
        )
}

fn render_comment_page(
    state: &AppState,
    user: &User,
    post_id: i64,
    comment: Option<&Comment>,
    form: Option<&CommentForm>,
    errors: &FormErrors,
) -> Result<Response, WebError> {
    let mut context = base_context(Some(user));
    context.insert("post_id", &post_id);
    context.insert("comment", &comment);
    context.insert("form", &form);
    context.insert("errors", errors);
    render(state, "blog/comment.html", &context)
}

/// POST /posts/{post_id}/comment/
pub async fn add_comment(
    State(state): State<AppState>,
    LoginRequired(user): LoginRequired,
    post_id: Result<Path<i64>, PathRejection>,
    Form(form): Form<CommentForm>,
) -> Result<Response, WebError> {
    let Path(post_id) = post_id?;
    state.comment_service.ensure_post(post_id).await?;

    match form.validate() {
        Ok(text) => {
            state.comment_service.create(post_id, &user, text).await?;
            Ok(found(&post_url(post_id)))
        }
        Err(errors) => render_comment_page(&state, &user, post_id, None, Some(&form), &errors),
    }
}

/// GET /posts/{post_id}/edit_comment/{comment_id}/
pub async fn edit_comment_form(
    State(state): State<AppState>,
    LoginRequired(user): LoginRequired,
    ids: Result<Path<(i64, i64)>, PathRejection>,
) -> Result<Response, WebError> {
    let Path((post_id, comment_id)) = ids?;
    let comment = state
        .comment_service
        .get_for_owner(post_id, comment_id, &user)
        .await?;

    let form = CommentForm::new(comment.text.clone());
    render_comment_page(&state, &user, post_id, Some(&comment), Some(&form), &FormErrors::new())
}

/// POST /posts/{post_id}/edit_comment/{comment_id}/
pub async fn edit_comment(
    State(state): State<AppState>,
    LoginRequired(user): LoginRequired,
    ids: Result<Path<(i64, i64)>, PathRejection>,
    Form(form): Form<CommentForm>,
) -> Result<Response, WebError> {
    let Path((post_id, comment_id)) = ids?;
    let comment = state
        .comment_service
        .get_for_owner(post_id, comment_id, &user)
        .await?;

    match form.validate() {
        Ok(text) => {
            state
                .comment_service
                .update(post_id, comment_id, &user, text)
                .await?;
            Ok(found(&post_url(comment.post_id)))
        }
        Err(errors) => render_comment_page(&state, &user, post_id, Some(&comment), Some(&form), &errors),
    }
}

/// GET /posts/{post_id}/delete_comment/{comment_id}/ - confirmation page
pub async fn delete_comment_form(
    State(state): State<AppState>,
    LoginRequired(user): LoginRequired,
    ids: Result<Path<(i64, i64)>, PathRejection>,
) -> Result<Response, WebError> {
    let Path((post_id, comment_id)) = ids?;
    let comment = state
        .comment_service
        .get_for_owner(post_id, comment_id, &user)
        .await?;

    render_comment_page(&state, &user, post_id, Some(&comment), None, &FormErrors::new())
}

/// POST /posts/{post_id}/delete_comment/{comment_id}/
pub async fn delete_comment(
    State(state): State<AppState>,
    LoginRequired(user): LoginRequired,
    ids: Result<Path<(i64, i64)>, PathRejection>,
) -> Result<Response, WebError> {
    let Path((post_id, comment_id)) = ids?;
    state
        .comment_service
        .delete(post_id, comment_id, &user)
        .await?;

    Ok(found(&post_url(post_id)))
}
