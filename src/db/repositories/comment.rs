//! Comment repository
//!
//! Database operations for comments. Comments under a post are always
//! returned oldest first.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Comment, CommentWithAuthor, CreateCommentInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Comment repository trait
#[async_trait]
pub trait CommentRepository: Send + Sync {
    /// Create a new comment
    async fn create(&self, input: &CreateCommentInput) -> Result<Comment>;

    /// Get comment by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>>;

    /// Replace a comment's text
    async fn update_text(&self, id: i64, text: &str) -> Result<()>;

    /// Delete a comment
    async fn delete(&self, id: i64) -> Result<()>;

    /// All comments on a post with their authors, oldest first
    async fn list_by_post(&self, post_id: i64) -> Result<Vec<CommentWithAuthor>>;
}

/// SQLx-based comment repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxCommentRepository {
    pool: DynDatabasePool,
}

impl SqlxCommentRepository {
    /// Create a new SQLx comment repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CommentRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CommentRepository for SqlxCommentRepository {
    async fn create(&self, input: &CreateCommentInput) -> Result<Comment> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_comment_sqlite(self.pool.sqlite()?, input).await,
            DatabaseDriver::Mysql => create_comment_mysql(self.pool.mysql()?, input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_comment_by_id_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_comment_by_id_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn update_text(&self, id: i64, text: &str) -> Result<()> {
        let sql = "UPDATE comments SET text = ? WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(text)
                    .bind(id)
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to update comment")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(text)
                    .bind(id)
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to update comment")?;
            }
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let sql = "DELETE FROM comments WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to delete comment")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to delete comment")?;
            }
        }
        Ok(())
    }

    async fn list_by_post(&self, post_id: i64) -> Result<Vec<CommentWithAuthor>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_by_post_sqlite(self.pool.sqlite()?, post_id).await,
            DatabaseDriver::Mysql => list_by_post_mysql(self.pool.mysql()?, post_id).await,
        }
    }
}

const LIST_BY_POST_SQL: &str = r#"
    SELECT cm.id, cm.text, cm.post_id, cm.author_id, cm.created_at, u.username AS author
    FROM comments cm
    JOIN users u ON u.id = cm.author_id
    WHERE cm.post_id = ?
    ORDER BY cm.created_at ASC, cm.id ASC
"#;

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_comment_sqlite(pool: &SqlitePool, input: &CreateCommentInput) -> Result<Comment> {
    let now = Utc::now();

    let result = sqlx::query(
        "INSERT INTO comments (text, post_id, author_id, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&input.text)
    .bind(input.post_id)
    .bind(input.author_id)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    Ok(Comment {
        id: result.last_insert_rowid(),
        text: input.text.clone(),
        post_id: input.post_id,
        author_id: input.author_id,
        created_at: now,
    })
}

async fn get_comment_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Comment>> {
    let row = sqlx::query(
        "SELECT id, text, post_id, author_id, created_at FROM comments WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get comment by ID")?;

    row.as_ref().map(row_to_comment_sqlite).transpose()
}

async fn list_by_post_sqlite(pool: &SqlitePool, post_id: i64) -> Result<Vec<CommentWithAuthor>> {
    let rows = sqlx::query(LIST_BY_POST_SQL)
        .bind(post_id)
        .fetch_all(pool)
        .await
        .context("Failed to list comments")?;

    rows.iter()
        .map(|row| {
            Ok(CommentWithAuthor {
                comment: row_to_comment_sqlite(row)?,
                author: row.get("author"),
            })
        })
        .collect()
}

fn row_to_comment_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Comment> {
    Ok(Comment {
        id: row.get("id"),
        text: row.get("text"),
        post_id: row.get("post_id"),
        author_id: row.get("author_id"),
        created_at: row.get("created_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_comment_mysql(pool: &MySqlPool, input: &CreateCommentInput) -> Result<Comment> {
    let now = Utc::now();

    let result = sqlx::query(
        "INSERT INTO comments (text, post_id, author_id, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(&input.text)
    .bind(input.post_id)
    .bind(input.author_id)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create comment")?;

    Ok(Comment {
        id: result.last_insert_id() as i64,
        text: input.text.clone(),
        post_id: input.post_id,
        author_id: input.author_id,
        created_at: now,
    })
}

async fn get_comment_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Comment>> {
    let row = sqlx::query(
        "SELECT id, text, post_id, author_id, created_at FROM comments WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get comment by ID")?;

    row.as_ref().map(row_to_comment_mysql).transpose()
}

async fn list_by_post_mysql(pool: &MySqlPool, post_id: i64) -> Result<Vec<CommentWithAuthor>> {
    let rows = sqlx::query(LIST_BY_POST_SQL)
        .bind(post_id)
        .fetch_all(pool)
        .await
        .context("Failed to list comments")?;

    rows.iter()
        .map(|row| {
            Ok(CommentWithAuthor {
                comment: row_to_comment_mysql(row)?,
                author: row.get("author"),
            })
        })
        .collect()
}

fn row_to_comment_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Comment> {
    Ok(Comment {
        id: row.get("id"),
        text: row.get("text"),
        post_id: row.get("post_id"),
        author_id: row.get("author_id"),
        created_at: row.get("created_at"),
    })
}
