//! Category service
//!
//! Category pages only exist for published categories; the post form lists
//! every category.

use crate::db::repositories::CategoryRepository;
use crate::models::{Category, CreateCategoryInput};
use anyhow::Context;
use std::sync::Arc;

/// Error types for category service operations
#[derive(Debug, thiserror::Error)]
pub enum CategoryServiceError {
    /// Category slug already exists
    #[error("Category slug already exists: {0}")]
    DuplicateSlug(String),

    /// Category not found or not published
    #[error("Category not found: {0}")]
    NotFound(String),

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Category service for blog categories
pub struct CategoryService {
    repo: Arc<dyn CategoryRepository>,
}

impl CategoryService {
    pub fn new(repo: Arc<dyn CategoryRepository>) -> Self {
        Self { repo }
    }

    /// Create a new category
    ///
    /// # Errors
    /// - `ValidationError` if the title or slug is empty or malformed
    /// - `DuplicateSlug` if the slug is taken
    pub async fn create(&self, input: CreateCategoryInput) -> Result<Category, CategoryServiceError> {
        if input.title.trim().is_empty() {
            return Err(CategoryServiceError::ValidationError(
                "Category title cannot be empty".to_string(),
            ));
        }
        if !is_valid_slug(&input.slug) {
            return Err(CategoryServiceError::ValidationError(format!(
                "Invalid slug: {:?}",
                input.slug
            )));
        }
        if self
            .repo
            .get_by_slug(&input.slug)
            .await
            .context("Failed to check slug uniqueness")?
            .is_some()
        {
            return Err(CategoryServiceError::DuplicateSlug(input.slug));
        }

        let category = self.repo.create(&input).await.context("Failed to create category")?;
        Ok(category)
    }

    /// Look up a category for its listing page.
    ///
    /// Unknown and unpublished categories are both `NotFound`.
    pub async fn get_published(&self, slug: &str) -> Result<Category, CategoryServiceError> {
        self.repo
            .get_by_slug(slug)
            .await
            .context("Failed to get category by slug")?
            .filter(|c| c.is_published)
            .ok_or_else(|| CategoryServiceError::NotFound(slug.to_string()))
    }

    /// All categories, ordered by title
    pub async fn list(&self) -> Result<Vec<Category>, CategoryServiceError> {
        let list = self.repo.list().await.context("Failed to list categories")?;
        Ok(list)
    }
}

/// A slug is a non-empty run of ASCII letters, digits, hyphens and underscores.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxCategoryRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_service() -> CategoryService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        CategoryService::new(SqlxCategoryRepository::boxed(pool))
    }

    #[test]
    fn test_is_valid_slug() {
        assert!(is_valid_slug("travel"));
        assert!(is_valid_slug("long_walks-2024"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("with space"));
        assert!(!is_valid_slug("путешествия"));
    }

    #[tokio::test]
    async fn test_create_category() {
        let service = setup_test_service().await;

        let category = service
            .create(CreateCategoryInput::new("Travel", "travel").with_description("Trips"))
            .await
            .expect("Failed to create category");

        assert_eq!(category.title, "Travel");
        assert_eq!(category.description, "Trips");
        assert!(category.is_published);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input() {
        let service = setup_test_service().await;

        let result = service.create(CreateCategoryInput::new(" ", "blank")).await;
        assert!(matches!(result, Err(CategoryServiceError::ValidationError(_))));

        let result = service.create(CreateCategoryInput::new("Bad", "bad slug")).await;
        assert!(matches!(result, Err(CategoryServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_create_duplicate_slug_fails() {
        let service = setup_test_service().await;
        service.create(CreateCategoryInput::new("Travel", "travel")).await.unwrap();

        let result = service.create(CreateCategoryInput::new("Trips", "travel")).await;
        assert!(matches!(result, Err(CategoryServiceError::DuplicateSlug(_))));
    }

    #[tokio::test]
    async fn test_get_published() {
        let service = setup_test_service().await;
        service.create(CreateCategoryInput::new("Travel", "travel")).await.unwrap();
        service
            .create(CreateCategoryInput::new("Hidden", "hidden").unpublished())
            .await
            .unwrap();

        assert_eq!(service.get_published("travel").await.unwrap().slug, "travel");
        assert!(matches!(
            service.get_published("hidden").await,
            Err(CategoryServiceError::NotFound(_))
        ));
        assert!(matches!(
            service.get_published("missing").await,
            Err(CategoryServiceError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_includes_unpublished() {
        let service = setup_test_service().await;
        service.create(CreateCategoryInput::new("Travel", "travel")).await.unwrap();
        service
            .create(CreateCategoryInput::new("Hidden", "hidden").unpublished())
            .await
            .unwrap();

        let titles: Vec<String> = service.list().await.unwrap().into_iter().map(|c| c.title).collect();
        assert_eq!(titles, vec!["Hidden", "Travel"]);
    }
}
