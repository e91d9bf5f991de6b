//! Post service
//!
//! Implements business logic for posts:
//! - Creation stamped with the acting user as author
//! - Single-post reads gated by [`Visibility`]
//! - Edits and deletions gated by [`Ownership`]
//! - Paginated listings for the index, a category and a profile

use crate::db::repositories::{CategoryRepository, LocationRepository, PostRepository, PostScope};
use crate::models::{PagedResult, Post, PostInput, PostWithMeta, User};
use crate::services::access::{Ownership, Visibility};
use crate::services::pagination::Paginator;
use anyhow::Context;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Error types for post service operations
#[derive(Debug, thiserror::Error)]
pub enum PostServiceError {
    /// Post does not exist, or exists but is hidden from the viewer
    #[error("Post not found: {0}")]
    NotFound(i64),

    /// Acting user is not the post's author
    #[error("User is not the author of post {post_id}")]
    NotOwner { post_id: i64 },

    /// Referenced category does not exist
    #[error("Unknown category: {0}")]
    UnknownCategory(i64),

    /// Referenced location does not exist
    #[error("Unknown location: {0}")]
    UnknownLocation(i64),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Post service for authoring and browsing posts
pub struct PostService {
    repo: Arc<dyn PostRepository>,
    categories: Arc<dyn CategoryRepository>,
    locations: Arc<dyn LocationRepository>,
    paginator: Paginator,
}

impl PostService {
    /// Create a new post service with the standard page size
    pub fn new(
        repo: Arc<dyn PostRepository>,
        categories: Arc<dyn CategoryRepository>,
        locations: Arc<dyn LocationRepository>,
    ) -> Self {
        Self {
            repo,
            categories,
            locations,
            paginator: Paginator::default(),
        }
    }

    /// Create a post authored by `author`.
    ///
    /// The author always comes from the acting user, never from input.
    pub async fn create(&self, author: &User, input: PostInput) -> Result<Post, PostServiceError> {
        self.check_references(&input).await?;

        let post = self
            .repo
            .create(author.id, &input)
            .await
            .context("Failed to create post")?;

        tracing::info!(post_id = post.id, author_id = author.id, "Post created");
        Ok(post)
    }

    /// Load a post for display to `viewer`.
    ///
    /// A post hidden from the viewer is indistinguishable from a missing one.
    pub async fn get_for_viewer(
        &self,
        id: i64,
        viewer: Option<&User>,
        now: DateTime<Utc>,
    ) -> Result<PostWithMeta, PostServiceError> {
        let post = self.get_with_meta(id).await?;

        match Visibility::check(&post, viewer, now) {
            Visibility::Visible => Ok(post),
            Visibility::Hidden => Err(PostServiceError::NotFound(id)),
        }
    }

    /// Load a post that `user` is about to edit or delete.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the post does not exist
    /// - `NotOwner` if `user` did not write it
    pub async fn get_for_owner(&self, id: i64, user: &User) -> Result<PostWithMeta, PostServiceError> {
        let post = self.get_with_meta(id).await?;

        match Ownership::check(post.post.author_id, Some(user)) {
            Ownership::Owner => Ok(post),
            Ownership::NotOwner => Err(PostServiceError::NotOwner { post_id: id }),
        }
    }

    /// Replace a post's editable fields. The author is never changed.
    pub async fn update(&self, id: i64, user: &User, input: PostInput) -> Result<Post, PostServiceError> {
        self.get_for_owner(id, user).await?;
        self.check_references(&input).await?;

        self.repo.update(id, &input).await.context("Failed to update post")?;

        self.repo
            .get_by_id(id)
            .await
            .context("Failed to reload post")?
            .ok_or(PostServiceError::NotFound(id))
    }

    /// Delete a post and its comments; returns the deleted post so the
    /// caller can clean up its image.
    pub async fn delete(&self, id: i64, user: &User) -> Result<PostWithMeta, PostServiceError> {
        let post = self.get_for_owner(id, user).await?;

        self.repo.delete(id).await.context("Failed to delete post")?;

        tracing::info!(post_id = id, author_id = user.id, "Post deleted");
        Ok(post)
    }

    /// Publicly visible posts, newest first
    pub async fn list_visible(
        &self,
        page: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<PagedResult<PostWithMeta>, PostServiceError> {
        self.list(PostScope::Visible { now }, page).await
    }

    /// Publicly visible posts in one category
    pub async fn list_in_category(
        &self,
        category_id: i64,
        page: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<PagedResult<PostWithMeta>, PostServiceError> {
        self.list(PostScope::VisibleInCategory { category_id, now }, page).await
    }

    /// Every post on a profile page, including unpublished and scheduled
    /// ones, whoever is looking.
    pub async fn list_for_profile(
        &self,
        profile: &User,
        page: Option<&str>,
    ) -> Result<PagedResult<PostWithMeta>, PostServiceError> {
        self.list(PostScope::ByAuthor { author_id: profile.id }, page).await
    }

    async fn list(
        &self,
        scope: PostScope,
        page: Option<&str>,
    ) -> Result<PagedResult<PostWithMeta>, PostServiceError> {
        let total = self.repo.count(&scope).await.context("Failed to count posts")?;
        let params = self.paginator.resolve(page, total);
        let items = self
            .repo
            .list(&scope, &params)
            .await
            .context("Failed to list posts")?;

        Ok(PagedResult::new(items, total, &params))
    }

    async fn get_with_meta(&self, id: i64) -> Result<PostWithMeta, PostServiceError> {
        self.repo
            .get_with_meta(id)
            .await
            .context("Failed to get post")?
            .ok_or(PostServiceError::NotFound(id))
    }

    async fn check_references(&self, input: &PostInput) -> Result<(), PostServiceError> {
        if self
            .categories
            .get_by_id(input.category_id)
            .await
            .context("Failed to get category")?
            .is_none()
        {
            return Err(PostServiceError::UnknownCategory(input.category_id));
        }

        if let Some(location_id) = input.location_id {
            if self
                .locations
                .get_by_id(location_id)
                .await
                .context("Failed to get location")?
                .is_none()
            {
                return Err(PostServiceError::UnknownLocation(location_id));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::post::unpublish_post;
    use crate::db::repositories::{
        SqlxCategoryRepository, SqlxLocationRepository, SqlxPostRepository, SqlxUserRepository,
        UserRepository,
    };
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::{CreateCategoryInput, CreateLocationInput, CreateUserInput};
    use chrono::Duration;

    struct Fixture {
        service: PostService,
        pool: DynDatabasePool,
        posts: Arc<dyn PostRepository>,
        alice: User,
        bob: User,
        category_id: i64,
        hidden_category_id: i64,
        location_id: i64,
    }

    async fn setup() -> Fixture {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::new(pool.clone());
        let alice = users.create(&CreateUserInput::new("alice", "hash")).await.unwrap();
        let bob = users.create(&CreateUserInput::new("bob", "hash")).await.unwrap();

        let categories = SqlxCategoryRepository::boxed(pool.clone());
        let category_id = categories
            .create(&CreateCategoryInput::new("Travel", "travel"))
            .await
            .unwrap()
            .id;
        let hidden_category_id = categories
            .create(&CreateCategoryInput::new("Drafts", "drafts").unpublished())
            .await
            .unwrap()
            .id;
        let locations = SqlxLocationRepository::boxed(pool.clone());
        let location_id = locations
            .create(&CreateLocationInput::new("Tula"))
            .await
            .unwrap()
            .id;

        let posts = SqlxPostRepository::boxed(pool.clone());
        Fixture {
            service: PostService::new(posts.clone(), categories, locations),
            pool,
            posts,
            alice,
            bob,
            category_id,
            hidden_category_id,
            location_id,
        }
    }

    fn input(title: &str, category_id: i64, pub_date: DateTime<Utc>) -> PostInput {
        PostInput {
            title: title.to_string(),
            text: "Some text".to_string(),
            pub_date,
            category_id,
            location_id: None,
            image: None,
        }
    }

    #[tokio::test]
    async fn test_create_stamps_author() {
        let f = setup().await;
        let post = f
            .service
            .create(&f.alice, input("Hello", f.category_id, Utc::now()))
            .await
            .expect("Failed to create post");

        assert_eq!(post.author_id, f.alice.id);
        assert!(post.is_published);
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_references() {
        let f = setup().await;

        let result = f.service.create(&f.alice, input("x", 999, Utc::now())).await;
        assert!(matches!(result, Err(PostServiceError::UnknownCategory(999))));

        let mut with_location = input("x", f.category_id, Utc::now());
        with_location.location_id = Some(f.location_id + 50);
        let result = f.service.create(&f.alice, with_location).await;
        assert!(matches!(result, Err(PostServiceError::UnknownLocation(_))));
    }

    #[tokio::test]
    async fn test_hidden_post_only_visible_to_author() {
        let f = setup().await;
        let now = Utc::now();
        let future = f
            .service
            .create(&f.alice, input("Later", f.category_id, now + Duration::days(2)))
            .await
            .unwrap();

        assert!(matches!(
            f.service.get_for_viewer(future.id, None, now).await,
            Err(PostServiceError::NotFound(_))
        ));
        assert!(matches!(
            f.service.get_for_viewer(future.id, Some(&f.bob), now).await,
            Err(PostServiceError::NotFound(_))
        ));
        let seen = f
            .service
            .get_for_viewer(future.id, Some(&f.alice), now)
            .await
            .expect("Author should see own post");
        assert_eq!(seen.post.id, future.id);
    }

    #[tokio::test]
    async fn test_unpublished_and_uncategorised_posts_are_hidden() {
        let f = setup().await;
        let now = Utc::now();
        let earlier = now - Duration::hours(1);

        let unpublished = f.service.create(&f.alice, input("a", f.category_id, earlier)).await.unwrap();
        unpublish_post(&f.pool, unpublished.id).await;
        let in_hidden = f
            .service
            .create(&f.alice, input("b", f.hidden_category_id, earlier))
            .await
            .unwrap();

        for id in [unpublished.id, in_hidden.id] {
            assert!(f.service.get_for_viewer(id, Some(&f.bob), now).await.is_err());
        }
    }

    #[tokio::test]
    async fn test_missing_post_not_found() {
        let f = setup().await;
        assert!(matches!(
            f.service.get_for_viewer(404, Some(&f.alice), Utc::now()).await,
            Err(PostServiceError::NotFound(404))
        ));
        assert!(matches!(
            f.service.get_for_owner(404, &f.alice).await,
            Err(PostServiceError::NotFound(404))
        ));
    }

    #[tokio::test]
    async fn test_non_owner_cannot_update_or_delete() {
        let f = setup().await;
        let post = f
            .service
            .create(&f.alice, input("Mine", f.category_id, Utc::now()))
            .await
            .unwrap();

        let result = f
            .service
            .update(post.id, &f.bob, input("Stolen", f.category_id, Utc::now()))
            .await;
        assert!(matches!(result, Err(PostServiceError::NotOwner { post_id }) if post_id == post.id));

        let result = f.service.delete(post.id, &f.bob).await;
        assert!(matches!(result, Err(PostServiceError::NotOwner { .. })));

        let stored = f.posts.get_by_id(post.id).await.unwrap().unwrap();
        assert_eq!(stored.title, "Mine");
    }

    #[tokio::test]
    async fn test_owner_updates_and_deletes() {
        let f = setup().await;
        let post = f
            .service
            .create(&f.alice, input("Draft", f.category_id, Utc::now()))
            .await
            .unwrap();

        let mut changed = input("Final", f.category_id, Utc::now());
        changed.location_id = Some(f.location_id);
        let updated = f.service.update(post.id, &f.alice, changed).await.unwrap();
        assert_eq!(updated.title, "Final");
        assert_eq!(updated.location_id, Some(f.location_id));
        assert_eq!(updated.author_id, f.alice.id);

        f.service.delete(post.id, &f.alice).await.unwrap();
        assert!(f.posts.get_by_id(post.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_index_paginates_visible_posts() {
        let f = setup().await;
        let now = Utc::now();
        for i in 0..12 {
            f.service
                .create(&f.alice, input(&format!("p{}", i), f.category_id, now - Duration::minutes(i)))
                .await
                .unwrap();
        }
        f.service
            .create(&f.alice, input("future", f.category_id, now + Duration::days(1)))
            .await
            .unwrap();

        let first = f.service.list_visible(None, now).await.unwrap();
        assert_eq!(first.total, 12);
        assert_eq!(first.items.len(), 10);
        assert_eq!(first.items[0].post.title, "p0");

        let second = f.service.list_visible(Some("2"), now).await.unwrap();
        assert_eq!(second.items.len(), 2);
        assert_eq!(second.items[1].post.title, "p11");

        let clamped = f.service.list_visible(Some("9"), now).await.unwrap();
        assert_eq!(clamped.page, 2);
        let garbage = f.service.list_visible(Some("two"), now).await.unwrap();
        assert_eq!(garbage.page, 1);
    }

    #[tokio::test]
    async fn test_profile_listing_ignores_visibility() {
        let f = setup().await;
        let now = Utc::now();
        f.service
            .create(&f.alice, input("public", f.category_id, now - Duration::hours(1)))
            .await
            .unwrap();
        f.service
            .create(&f.alice, input("scheduled", f.category_id, now + Duration::days(1)))
            .await
            .unwrap();
        f.service
            .create(&f.alice, input("drafted", f.hidden_category_id, now - Duration::hours(1)))
            .await
            .unwrap();
        f.service
            .create(&f.bob, input("not hers", f.category_id, now - Duration::hours(1)))
            .await
            .unwrap();

        let page = f.service.list_for_profile(&f.alice, None).await.unwrap();
        assert_eq!(page.total, 3);
        let titles: Vec<_> = page.items.iter().map(|p| p.post.title.as_str()).collect();
        assert_eq!(titles, vec!["scheduled", "drafted", "public"]);
    }

    #[tokio::test]
    async fn test_category_listing() {
        let f = setup().await;
        let now = Utc::now();
        f.service
            .create(&f.alice, input("in travel", f.category_id, now - Duration::hours(1)))
            .await
            .unwrap();
        f.service
            .create(&f.alice, input("in drafts", f.hidden_category_id, now - Duration::hours(1)))
            .await
            .unwrap();

        let page = f.service.list_in_category(f.category_id, None, now).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].post.title, "in travel");
        assert_eq!(page.num_pages, 1);
    }
}
