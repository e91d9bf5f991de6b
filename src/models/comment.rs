//! Comment model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Comment entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Comment {
    pub id: i64,
    pub text: String,
    pub post_id: i64,
    pub author_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Comment with its author's username, for display under a post
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommentWithAuthor {
    #[serde(flatten)]
    pub comment: Comment,
    pub author: String,
}

/// Input for creating a comment
///
/// `post_id` and `author_id` come from the URL and the session, never from
/// submitted form data.
#[derive(Debug, Clone)]
pub struct CreateCommentInput {
    pub post_id: i64,
    pub author_id: i64,
    pub text: String,
}
