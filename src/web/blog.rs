//! Blog pages: listings, post detail and post authoring
//!
//! Authoring routes take the post form as `multipart/form-data` so an image
//! can ride along with the text fields.

use axum::{
    body::Bytes,
    extract::{rejection::PathRejection, DefaultBodyLimit, Multipart, Path, Query, State},
    response::Response,
    routing::get,
    Router,
};
use chrono::Utc;

use crate::forms::{CommentForm, FormErrors, PostFields, PostForm};
use crate::models::{PostWithMeta, User};
use crate::services::{MediaError, MediaStore, PostServiceError};
use crate::web::common::{base_context, found, post_url, profile_url, render, PageQuery};
use crate::web::error::WebError;
use crate::web::middleware::{AppState, CurrentUser, LoginRequired};

const UPLOAD_FIELD: &str = "image";
const CLEAR_FIELD: &str = "image-clear";

/// Room for the text fields around an uploaded image
const FORM_OVERHEAD: usize = 64 * 1024;

/// Build the blog router
pub fn router(upload_limit: u64) -> Router<AppState> {
    let body_limit = usize::try_from(upload_limit)
        .unwrap_or(usize::MAX)
        .saturating_add(FORM_OVERHEAD);

    let authoring = Router::new()
        .route("/posts/create/", get(create_post_form).post(create_post))
        .route("/posts/{post_id}/edit/", get(edit_post_form).post(edit_post))
        .layer(DefaultBodyLimit::max(body_limit));

    Router::new()
        .route("/", get(index))
        .route("/category/{slug}/", get(category_posts))
        .route("/posts/{post_id}/", get(post_detail))
        .route("/posts/{post_id}/delete/", get(delete_post_form).post(delete_post))
        .merge(authoring)
}

// ============================================================================
// Listings
// ============================================================================

/// GET / - publicly visible posts, newest first
pub async fn index(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<PageQuery>,
) -> Result<Response, WebError> {
    let page_obj = state
        .post_service
        .list_visible(query.page.as_deref(), Utc::now())
        .await?;

    let mut context = base_context(user.as_ref());
    context.insert("page_obj", &page_obj);
    render(&state, "blog/index.html", &context)
}

/// GET /category/{slug}/ - visible posts of a published category
pub async fn category_posts(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    slug: Result<Path<String>, PathRejection>,
    Query(query): Query<PageQuery>,
) -> Result<Response, WebError> {
    let Path(slug) = slug?;
    let category = state.category_service.get_published(&slug).await?;
    let page_obj = state
        .post_service
        .list_in_category(category.id, query.page.as_deref(), Utc::now())
        .await?;

    let mut context = base_context(user.as_ref());
    context.insert("category", &category);
    context.insert("page_obj", &page_obj);
    render(&state, "blog/category.html", &context)
}

/// GET /posts/{post_id}/ - a single post with its comments
pub async fn post_detail(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    post_id: Result<Path<i64>, PathRejection>,
) -> Result<Response, WebError> {
    let Path(post_id) = post_id?;
    let post = state
        .post_service
        .get_for_viewer(post_id, user.as_ref(), Utc::now())
        .await?;
    let comments = state.comment_service.list_for_post(post_id).await?;

    let mut context = base_context(user.as_ref());
    if let Some(image) = &post.post.image {
        context.insert("image_url", &state.media.url(image));
    }
    context.insert("post", &post);
    context.insert("comments", &comments);
    context.insert("form", &CommentForm::default());
    context.insert("errors", &FormErrors::new());
    render(&state, "blog/detail.html", &context)
}

// ============================================================================
// Authoring
// ============================================================================

/// An uploaded file kept in memory until the form validates
struct Upload {
    content_type: String,
    data: Bytes,
}

/// The post form plus its optional image, as read from a multipart body
struct PostSubmission {
    form: PostForm,
    upload: Option<Upload>,
}

impl PostSubmission {
    async fn read(mut multipart: Multipart) -> Result<Self, WebError> {
        let mut form = PostForm::default();
        let mut upload = None;

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or("").to_string();
            match name.as_str() {
                UPLOAD_FIELD => {
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let data = field.bytes().await?;
                    // Browsers send an empty part when no file was chosen
                    if !data.is_empty() {
                        upload = Some(Upload { content_type, data });
                    }
                }
                CLEAR_FIELD => {
                    field.text().await?;
                    form.image_clear = true;
                }
                "title" => form.title = field.text().await?,
                "text" => form.text = field.text().await?,
                "pub_date" => form.pub_date = field.text().await?,
                "category" => form.category = field.text().await?,
                "location" => form.location = field.text().await?,
                _ => {}
            }
        }

        Ok(Self { form, upload })
    }

    /// Validate the fields and the upload together so every problem is
    /// reported at once.
    fn validate(&self, media: &MediaStore) -> Result<PostFields, FormErrors> {
        let mut errors = FormErrors::new();
        let fields = match self.form.validate() {
            Ok(fields) => Some(fields),
            Err(e) => {
                errors.merge(e);
                None
            }
        };

        if let Some(upload) = &self.upload {
            if let Err(e) = media.validate(&upload.content_type, upload.data.len()) {
                errors.add(UPLOAD_FIELD, upload_message(&e));
            }
        }

        match fields {
            Some(fields) if errors.is_empty() => Ok(fields),
            _ => Err(errors),
        }
    }

    /// Write the upload to the media root, if there is one
    async fn store_upload(&self, media: &MediaStore) -> Result<Option<String>, WebError> {
        match &self.upload {
            Some(upload) => media
                .save_post_image(&upload.content_type, &upload.data)
                .await
                .map(Some)
                .map_err(|e| WebError::Internal(e.into())),
            None => Ok(None),
        }
    }
}

fn upload_message(e: &MediaError) -> String {
    match e {
        MediaError::InvalidType(_) => {
            "Upload a valid image. The file you uploaded was either not an image or a corrupted image."
                .to_string()
        }
        other => other.to_string(),
    }
}

/// Turn a reference failure into form errors; anything else stays an error
fn reference_errors(e: PostServiceError) -> Result<FormErrors, WebError> {
    match e {
        PostServiceError::UnknownCategory(_) => Ok(PostForm::unknown_category()),
        PostServiceError::UnknownLocation(_) => Ok(PostForm::unknown_location()),
        other => Err(other.into()),
    }
}

/// Which screen of `blog/create.html` to show
#[derive(Clone, Copy)]
enum PostScreen {
    Create,
    Edit,
    Delete,
}

async fn render_post_form(
    state: &AppState,
    user: &User,
    screen: PostScreen,
    form: &PostForm,
    errors: &FormErrors,
    post: Option<&PostWithMeta>,
) -> Result<Response, WebError> {
    let categories = state.category_service.list().await?;
    let locations = state.location_service.list().await?;

    let mut context = base_context(Some(user));
    context.insert("form", form);
    context.insert("errors", errors);
    context.insert("categories", &categories);
    context.insert("locations", &locations);
    context.insert("post", &post);
    context.insert("is_edit", &matches!(screen, PostScreen::Edit));
    context.insert("is_delete", &matches!(screen, PostScreen::Delete));
    render(state, "blog/create.html", &context)
}

/// GET /posts/create/
pub async fn create_post_form(
    State(state): State<AppState>,
    LoginRequired(user): LoginRequired,
) -> Result<Response, WebError> {
    render_post_form(&state, &user, PostScreen::Create, &PostForm::default(), &FormErrors::new(), None).await
}

/// POST /posts/create/
pub async fn create_post(
    State(state): State<AppState>,
    LoginRequired(user): LoginRequired,
    multipart: Multipart,
) -> Result<Response, WebError> {
    let submission = PostSubmission::read(multipart).await?;
    let fields = match submission.validate(&state.media) {
        Ok(fields) => fields,
        Err(errors) => {
            return render_post_form(&state, &user, PostScreen::Create, &submission.form, &errors, None).await;
        }
    };

    let image = submission.store_upload(&state.media).await?;
    match state.post_service.create(&user, fields.into_input(image.clone())).await {
        Ok(_) => Ok(found(&profile_url(&user.username))),
        Err(e) => {
            if let Some(image) = &image {
                state.media.remove(image).await;
            }
            let errors = reference_errors(e)?;
            render_post_form(&state, &user, PostScreen::Create, &submission.form, &errors, None).await
        }
    }
}

/// GET /posts/{post_id}/edit/
pub async fn edit_post_form(
    State(state): State<AppState>,
    LoginRequired(user): LoginRequired,
    post_id: Result<Path<i64>, PathRejection>,
) -> Result<Response, WebError> {
    let Path(post_id) = post_id?;
    let post = state.post_service.get_for_owner(post_id, &user).await?;

    let form = PostForm::from_post(&post);
    render_post_form(&state, &user, PostScreen::Edit, &form, &FormErrors::new(), Some(&post)).await
}

/// POST /posts/{post_id}/edit/
pub async fn edit_post(
    State(state): State<AppState>,
    LoginRequired(user): LoginRequired,
    post_id: Result<Path<i64>, PathRejection>,
    multipart: Multipart,
) -> Result<Response, WebError> {
    let Path(post_id) = post_id?;
    let post = state.post_service.get_for_owner(post_id, &user).await?;

    let submission = PostSubmission::read(multipart).await?;
    let fields = match submission.validate(&state.media) {
        Ok(fields) => fields,
        Err(errors) => {
            return render_post_form(&state, &user, PostScreen::Edit, &submission.form, &errors, Some(&post))
                .await;
        }
    };

    let uploaded = submission.store_upload(&state.media).await?;
    let image = match (&uploaded, fields.image_clear) {
        (Some(new), _) => Some(new.clone()),
        (None, true) => None,
        (None, false) => post.post.image.clone(),
    };

    match state.post_service.update(post_id, &user, fields.into_input(image.clone())).await {
        Ok(_) => {
            if let Some(old) = &post.post.image {
                if image.as_ref() != Some(old) {
                    state.media.remove(old).await;
                }
            }
            Ok(found(&post_url(post_id)))
        }
        Err(e) => {
            if let Some(new) = &uploaded {
                state.media.remove(new).await;
            }
            let errors = reference_errors(e)?;
            render_post_form(&state, &user, PostScreen::Edit, &submission.form, &errors, Some(&post)).await
        }
    }
}

/// GET /posts/{post_id}/delete/ - confirmation page
pub async fn delete_post_form(
    State(state): State<AppState>,
    LoginRequired(user): LoginRequired,
    post_id: Result<Path<i64>, PathRejection>,
) -> Result<Response, WebError> {
    let Path(post_id) = post_id?;
    let post = state.post_service.get_for_owner(post_id, &user).await?;

    let form = PostForm::from_post(&post);
    render_post_form(&state, &user, PostScreen::Delete, &form, &FormErrors::new(), Some(&post)).await
}

/// POST /posts/{post_id}/delete/
pub async fn delete_post(
    State(state): State<AppState>,
    LoginRequired(user): LoginRequired,
    post_id: Result<Path<i64>, PathRejection>,
) -> Result<Response, WebError> {
    let Path(post_id) = post_id?;
    let deleted = state.post_service.delete(post_id, &user).await?;

    if let Some(image) = &deleted.post.image {
        state.media.remove(image).await;
    }
    Ok(found("/"))
}
