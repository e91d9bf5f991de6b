//! Post model
//!
//! A post is publicly visible only when it is published, filed under a
//! published category, and its publication date has arrived. Authors always
//! see their own posts; that rule lives in `services::access`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Post entity as stored
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    /// Unique identifier
    pub id: i64,
    /// Title (at most 256 characters)
    pub title: String,
    /// Body text
    pub text: String,
    /// Publication date; a future date defers publication
    pub pub_date: DateTime<Utc>,
    /// Author user ID
    pub author_id: i64,
    /// Category ID (None once the category is deleted)
    pub category_id: Option<i64>,
    /// Location ID
    pub location_id: Option<i64>,
    /// Image path relative to the media root
    pub image: Option<String>,
    /// Publication flag
    pub is_published: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Author fields shown next to a post
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostAuthor {
    pub id: i64,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

/// Category fields shown next to a post
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostCategory {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub is_published: bool,
}

/// Location fields shown next to a post
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostLocation {
    pub id: i64,
    pub name: String,
    pub is_published: bool,
}

/// Post joined with its author, category and location, annotated with the
/// number of comments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostWithMeta {
    #[serde(flatten)]
    pub post: Post,
    pub author: PostAuthor,
    pub category: Option<PostCategory>,
    pub location: Option<PostLocation>,
    pub comment_count: i64,
}

impl PostWithMeta {
    /// Whether anyone, not just the author, may see this post at `now`
    pub fn is_publicly_visible(&self, now: DateTime<Utc>) -> bool {
        self.post.is_published
            && self.category.as_ref().is_some_and(|c| c.is_published)
            && self.post.pub_date <= now
    }
}

/// Input for creating or replacing a post's editable fields
#[derive(Debug, Clone, PartialEq)]
pub struct PostInput {
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub category_id: i64,
    pub location_id: Option<i64>,
    pub image: Option<String>,
}
