//! Category model
//!
//! Categories group posts under a slug address. An unpublished category
//! hides every post filed under it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    /// Unique identifier
    pub id: i64,
    /// Display title
    pub title: String,
    /// Free-form description
    pub description: String,
    /// URL-friendly slug (unique)
    pub slug: String,
    /// Whether the category and its posts are shown publicly
    pub is_published: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Input for creating a category
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCategoryInput {
    pub title: String,
    pub description: String,
    pub slug: String,
    pub is_published: bool,
}

impl CreateCategoryInput {
    pub fn new(title: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            slug: slug.into(),
            is_published: true,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn unpublished(mut self) -> Self {
        self.is_published = false;
        self
    }
}
