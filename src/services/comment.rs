//! Comment service
//!
//! Comments are always stamped with the acting user and the post named in
//! the URL. Editing and deleting require the comment to sit under that post
//! and to belong to the acting user.

use crate::db::repositories::{CommentRepository, PostRepository};
use crate::models::{Comment, CommentWithAuthor, CreateCommentInput, User};
use crate::services::access::Ownership;
use anyhow::Context;
use std::sync::Arc;

/// Error types for comment service operations
#[derive(Debug, thiserror::Error)]
pub enum CommentServiceError {
    /// Post does not exist
    #[error("Post not found: {0}")]
    PostNotFound(i64),

    /// Comment does not exist or sits under a different post
    #[error("Comment not found: {0}")]
    NotFound(i64),

    /// Acting user is not the comment's author
    #[error("User is not the author of comment {comment_id}")]
    NotOwner { post_id: i64, comment_id: i64 },

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Comment service
pub struct CommentService {
    repo: Arc<dyn CommentRepository>,
    posts: Arc<dyn PostRepository>,
}

impl CommentService {
    pub fn new(repo: Arc<dyn CommentRepository>, posts: Arc<dyn PostRepository>) -> Self {
        Self { repo, posts }
    }

    /// Fail with `PostNotFound` unless `post_id` names an existing post
    pub async fn ensure_post(&self, post_id: i64) -> Result<(), CommentServiceError> {
        self.posts
            .get_by_id(post_id)
            .await
            .context("Failed to get post")?
            .map(|_| ())
            .ok_or(CommentServiceError::PostNotFound(post_id))
    }

    /// Add a comment by `author` under `post_id`.
    pub async fn create(
        &self,
        post_id: i64,
        author: &User,
        text: String,
    ) -> Result<Comment, CommentServiceError> {
        self.ensure_post(post_id).await?;

        let comment = self
            .repo
            .create(&CreateCommentInput {
                post_id,
                author_id: author.id,
                text,
            })
            .await
            .context("Failed to create comment")?;

        tracing::debug!(comment_id = comment.id, post_id, "Comment created");
        Ok(comment)
    }

    /// Comments under a post, oldest first
    pub async fn list_for_post(&self, post_id: i64) -> Result<Vec<CommentWithAuthor>, CommentServiceError> {
        let comments = self
            .repo
            .list_by_post(post_id)
            .await
            .context("Failed to list comments")?;

        Ok(comments)
    }

    /// Load a comment that `user` is about to edit or delete.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the comment does not exist or is not under `post_id`
    /// - `NotOwner` if `user` did not write it
    pub async fn get_for_owner(
        &self,
        post_id: i64,
        comment_id: i64,
        user: &User,
    ) -> Result<Comment, CommentServiceError> {
        let comment = self
            .repo
            .get_by_id(comment_id)
            .await
            .context("Failed to get comment")?
            .filter(|c| c.post_id == post_id)
            .ok_or(CommentServiceError::NotFound(comment_id))?;

        match Ownership::check(comment.author_id, Some(user)) {
            Ownership::Owner => Ok(comment),
            Ownership::NotOwner => Err(CommentServiceError::NotOwner {
                post_id: comment.post_id,
                comment_id,
            }),
        }
    }

    /// Replace the text of one's own comment
    pub async fn update(
        &self,
        post_id: i64,
        comment_id: i64,
        user: &User,
        text: String,
    ) -> Result<Comment, CommentServiceError> {
        let comment = self.get_for_owner(post_id, comment_id, user).await?;

        self.repo
            .update_text(comment_id, &text)
            .await
            .context("Failed to update comment")?;

        Ok(Comment { text, ..comment })
    }

    /// Delete one's own comment
    pub async fn delete(
        &self,
        post_id: i64,
        comment_id: i64,
        user: &User,
    ) -> Result<(), CommentServiceError> {
        self.get_for_owner(post_id, comment_id, user).await?;

        self.repo
            .delete(comment_id)
            .await
            .context("Failed to delete comment")?;

        tracing::debug!(comment_id, post_id, "Comment deleted");
        Ok(())
    }
}
