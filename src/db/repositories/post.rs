//! Post repository
//!
//! Database operations for posts. Listings join each post with its author,
//! category and location and annotate it with its comment count, newest
//! publication date first.
//!
//! This module provides:
//! - `PostRepository` trait defining the interface for post data access
//! - `SqlxPostRepository` implementing the trait for SQLite and MySQL
//! - `PostScope` selecting which posts a listing contains

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{
    ListParams, Post, PostAuthor, PostCategory, PostInput, PostLocation, PostWithMeta,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Which posts a listing contains.
///
/// The `Visible*` scopes apply the public visibility rule at `now`:
/// published, in a published category, and `pub_date <= now`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PostScope {
    /// Every publicly visible post
    Visible { now: DateTime<Utc> },
    /// Publicly visible posts in one category
    VisibleInCategory { category_id: i64, now: DateTime<Utc> },
    /// Every post by one author, regardless of visibility
    ByAuthor { author_id: i64 },
}

/// A value bound into a scope's WHERE clause
enum ScopeArg {
    Int(i64),
    Bool(bool),
    Time(DateTime<Utc>),
}

const VISIBLE_CLAUSE: &str = "p.is_published = ? AND c.is_published = ? AND p.pub_date <= ?";

impl PostScope {
    fn where_clause(&self) -> String {
        match self {
            PostScope::Visible { .. } => VISIBLE_CLAUSE.to_string(),
            PostScope::VisibleInCategory { .. } => format!("p.category_id = ? AND {}", VISIBLE_CLAUSE),
            PostScope::ByAuthor { .. } => "p.author_id = ?".to_string(),
        }
    }

    fn args(&self) -> Vec<ScopeArg> {
        let visible = |now: DateTime<Utc>| [ScopeArg::Bool(true), ScopeArg::Bool(true), ScopeArg::Time(now)];
        match *self {
            PostScope::Visible { now } => visible(now).into_iter().collect(),
            PostScope::VisibleInCategory { category_id, now } => std::iter::once(ScopeArg::Int(category_id))
                .chain(visible(now))
                .collect(),
            PostScope::ByAuthor { author_id } => vec![ScopeArg::Int(author_id)],
        }
    }
}

/// Post repository trait
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// Create a post authored by `author_id`
    async fn create(&self, author_id: i64, input: &PostInput) -> Result<Post>;

    /// Get post by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Post>>;

    /// Get post by ID joined with author, category, location and comment count
    async fn get_with_meta(&self, id: i64) -> Result<Option<PostWithMeta>>;

    /// Replace the editable fields of a post
    async fn update(&self, id: i64, input: &PostInput) -> Result<()>;

    /// Delete a post and, through the foreign key, its comments
    async fn delete(&self, id: i64) -> Result<()>;

    /// One page of posts in `scope`, newest `pub_date` first
    async fn list(&self, scope: &PostScope, params: &ListParams) -> Result<Vec<PostWithMeta>>;

    /// Number of posts in `scope`
    async fn count(&self, scope: &PostScope) -> Result<i64>;
}

/// SQLx-based post repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxPostRepository {
    pool: DynDatabasePool,
}

impl SqlxPostRepository {
    /// Create a new SQLx post repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn PostRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl PostRepository for SqlxPostRepository {
    async fn create(&self, author_id: i64, input: &PostInput) -> Result<Post> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_post_sqlite(self.pool.sqlite()?, author_id, input).await,
            DatabaseDriver::Mysql => create_post_mysql(self.pool.mysql()?, author_id, input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Post>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_post_by_id_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_post_by_id_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn get_with_meta(&self, id: i64) -> Result<Option<PostWithMeta>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_post_with_meta_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_post_with_meta_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn update(&self, id: i64, input: &PostInput) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_post_sqlite(self.pool.sqlite()?, id, input).await,
            DatabaseDriver::Mysql => update_post_mysql(self.pool.mysql()?, id, input).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let sql = "DELETE FROM posts WHERE id = ?";
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(self.pool.sqlite()?)
                    .await
                    .context("Failed to delete post")?;
            }
            DatabaseDriver::Mysql => {
                sqlx::query(sql)
                    .bind(id)
                    .execute(self.pool.mysql()?)
                    .await
                    .context("Failed to delete post")?;
            }
        }
        Ok(())
    }

    async fn list(&self, scope: &PostScope, params: &ListParams) -> Result<Vec<PostWithMeta>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_posts_sqlite(self.pool.sqlite()?, scope, params).await,
            DatabaseDriver::Mysql => list_posts_mysql(self.pool.mysql()?, scope, params).await,
        }
    }

    async fn count(&self, scope: &PostScope) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_posts_sqlite(self.pool.sqlite()?, scope).await,
            DatabaseDriver::Mysql => count_posts_mysql(self.pool.mysql()?, scope).await,
        }
    }
}

const POST_COLUMNS: &str = "id, title, text, pub_date, author_id, category_id, location_id, image, is_published, created_at";

/// Joined select shared by detail and listing queries
const POST_WITH_META_SELECT: &str = r#"
    SELECT p.id, p.title, p.text, p.pub_date, p.author_id, p.category_id, p.location_id,
           p.image, p.is_published, p.created_at,
           u.username AS author_username, u.first_name AS author_first_name,
           u.last_name AS author_last_name,
           c.title AS category_title, c.slug AS category_slug,
           c.is_published AS category_is_published,
           l.name AS location_name, l.is_published AS location_is_published,
           (SELECT COUNT(*) FROM comments cm WHERE cm.post_id = p.id) AS comment_count
    FROM posts p
    JOIN users u ON u.id = p.author_id
    LEFT JOIN categories c ON c.id = p.category_id
    LEFT JOIN locations l ON l.id = p.location_id
"#;

const POST_ORDER: &str = "ORDER BY p.pub_date DESC, p.id DESC";

fn list_sql(scope: &PostScope) -> String {
    format!(
        "{} WHERE {} {} LIMIT ? OFFSET ?",
        POST_WITH_META_SELECT,
        scope.where_clause(),
        POST_ORDER
    )
}

fn count_sql(scope: &PostScope) -> String {
    format!(
        "SELECT COUNT(*) AS count FROM posts p LEFT JOIN categories c ON c.id = p.category_id WHERE {}",
        scope.where_clause()
    )
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_post_sqlite(pool: &SqlitePool, author_id: i64, input: &PostInput) -> Result<Post> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO posts (title, text, pub_date, author_id, category_id, location_id, image, is_published, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.title)
    .bind(&input.text)
    .bind(input.pub_date)
    .bind(author_id)
    .bind(input.category_id)
    .bind(input.location_id)
    .bind(&input.image)
    .bind(true)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    Ok(post_from_input(result.last_insert_rowid(), author_id, input, now))
}

async fn get_post_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Post>> {
    let row = sqlx::query(&format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by ID")?;

    row.as_ref().map(row_to_post_sqlite).transpose()
}

async fn get_post_with_meta_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<PostWithMeta>> {
    let row = sqlx::query(&format!("{} WHERE p.id = ?", POST_WITH_META_SELECT))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get post details")?;

    row.as_ref().map(row_to_post_with_meta_sqlite).transpose()
}

async fn update_post_sqlite(pool: &SqlitePool, id: i64, input: &PostInput) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE posts
        SET title = ?, text = ?, pub_date = ?, category_id = ?, location_id = ?, image = ?
        WHERE id = ?
        "#,
    )
    .bind(&input.title)
    .bind(&input.text)
    .bind(input.pub_date)
    .bind(input.category_id)
    .bind(input.location_id)
    .bind(&input.image)
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to update post")?;

    Ok(())
}

async fn list_posts_sqlite(
    pool: &SqlitePool,
    scope: &PostScope,
    params: &ListParams,
) -> Result<Vec<PostWithMeta>> {
    let sql = list_sql(scope);
    let mut query = sqlx::query(&sql);
    for arg in scope.args() {
        query = match arg {
            ScopeArg::Int(v) => query.bind(v),
            ScopeArg::Bool(v) => query.bind(v),
            ScopeArg::Time(v) => query.bind(v),
        };
    }

    let rows = query
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list posts")?;

    rows.iter().map(row_to_post_with_meta_sqlite).collect()
}

async fn count_posts_sqlite(pool: &SqlitePool, scope: &PostScope) -> Result<i64> {
    let sql = count_sql(scope);
    let mut query = sqlx::query(&sql);
    for arg in scope.args() {
        query = match arg {
            ScopeArg::Int(v) => query.bind(v),
            ScopeArg::Bool(v) => query.bind(v),
            ScopeArg::Time(v) => query.bind(v),
        };
    }

    let row = query
        .fetch_one(pool)
        .await
        .context("Failed to count posts")?;

    Ok(row.get("count"))
}

fn row_to_post_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Post> {
    Ok(Post {
        id: row.get("id"),
        title: row.get("title"),
        text: row.get("text"),
        pub_date: row.get("pub_date"),
        author_id: row.get("author_id"),
        category_id: row.get("category_id"),
        location_id: row.get("location_id"),
        image: row.get("image"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
    })
}

fn row_to_post_with_meta_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<PostWithMeta> {
    let post = row_to_post_sqlite(row)?;

    let author = PostAuthor {
        id: post.author_id,
        username: row.get("author_username"),
        first_name: row.get("author_first_name"),
        last_name: row.get("author_last_name"),
    };

    let category = match post.category_id {
        Some(id) => Some(PostCategory {
            id,
            title: row.try_get("category_title").context("Missing category title")?,
            slug: row.try_get("category_slug").context("Missing category slug")?,
            is_published: row
                .try_get("category_is_published")
                .context("Missing category flag")?,
        }),
        None => None,
    };

    let location = match post.location_id {
        Some(id) => Some(PostLocation {
            id,
            name: row.try_get("location_name").context("Missing location name")?,
            is_published: row
                .try_get("location_is_published")
                .context("Missing location flag")?,
        }),
        None => None,
    };

    Ok(PostWithMeta {
        comment_count: row.get("comment_count"),
        post,
        author,
        category,
        location,
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_post_mysql(pool: &MySqlPool, author_id: i64, input: &PostInput) -> Result<Post> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO posts (title, text, pub_date, author_id, category_id, location_id, image, is_published, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.title)
    .bind(&input.text)
    .bind(input.pub_date)
    .bind(author_id)
    .bind(input.category_id)
    .bind(input.location_id)
    .bind(&input.image)
    .bind(true)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create post")?;

    Ok(post_from_input(result.last_insert_id() as i64, author_id, input, now))
}

async fn get_post_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Post>> {
    let row = sqlx::query(&format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get post by ID")?;

    row.as_ref().map(row_to_post_mysql).transpose()
}

async fn get_post_with_meta_mysql(pool: &MySqlPool, id: i64) -> Result<Option<PostWithMeta>> {
    let row = sqlx::query(&format!("{} WHERE p.id = ?", POST_WITH_META_SELECT))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get post details")?;

    row.as_ref().map(row_to_post_with_meta_mysql).transpose()
}

async fn update_post_mysql(pool: &MySqlPool, id: i64, input: &PostInput) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE posts
        SET title = ?, text = ?, pub_date = ?, category_id = ?, location_id = ?, image = ?
        WHERE id = ?
        "#,
    )
    .bind(&input.title)
    .bind(&input.text)
    .bind(input.pub_date)
    .bind(input.category_id)
    .bind(input.location_id)
    .bind(&input.image)
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to update post")?;

    Ok(())
}

async fn list_posts_mysql(
    pool: &MySqlPool,
    scope: &PostScope,
    params: &ListParams,
) -> Result<Vec<PostWithMeta>> {
    let sql = list_sql(scope);
    let mut query = sqlx::query(&sql);
    for arg in scope.args() {
        query = match arg {
            ScopeArg::Int(v) => query.bind(v),
            ScopeArg::Bool(v) => query.bind(v),
            ScopeArg::Time(v) => query.bind(v),
        };
    }

    let rows = query
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(pool)
        .await
        .context("Failed to list posts")?;

    rows.iter().map(row_to_post_with_meta_mysql).collect()
}

async fn count_posts_mysql(pool: &MySqlPool, scope: &PostScope) -> Result<i64> {
    let sql = count_sql(scope);
    let mut query = sqlx::query(&sql);
    for arg in scope.args() {
        query = match arg {
            ScopeArg::Int(v) => query.bind(v),
            ScopeArg::Bool(v) => query.bind(v),
            ScopeArg::Time(v) => query.bind(v),
        };
    }

    let row = query
        .fetch_one(pool)
        .await
        .context("Failed to count posts")?;

    Ok(row.get("count"))
}

fn row_to_post_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Post> {
    Ok(Post {
        id: row.get("id"),
        title: row.get("title"),
        text: row.get("text"),
        pub_date: row.get("pub_date"),
        author_id: row.get("author_id"),
        category_id: row.get("category_id"),
        location_id: row.get("location_id"),
        image: row.get("image"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
    })
}

fn row_to_post_with_meta_mysql(row: &sqlx::mysql::MySqlRow) -> Result<PostWithMeta> {
    let post = row_to_post_mysql(row)?;

    let author = PostAuthor {
        id: post.author_id,
        username: row.get("author_username"),
        first_name: row.get("author_first_name"),
        last_name: row.get("author_last_name"),
    };

    let category = match post.category_id {
        Some(id) => Some(PostCategory {
            id,
            title: row.try_get("category_title").context("Missing category title")?,
            slug: row.try_get("category_slug").context("Missing category slug")?,
            is_published: row
                .try_get("category_is_published")
                .context("Missing category flag")?,
        }),
        None => None,
    };

    let location = match post.location_id {
        Some(id) => Some(PostLocation {
            id,
            name: row.try_get("location_name").context("Missing location name")?,
            is_published: row
                .try_get("location_is_published")
                .context("Missing location flag")?,
        }),
        None => None,
    };

    Ok(PostWithMeta {
        comment_count: row.get("comment_count"),
        post,
        author,
        category,
        location,
    })
}

/// Clear a post's publication flag; posts are created published and
/// nothing in the app unpublishes them.
#[cfg(test)]
pub(crate) async fn unpublish_post(pool: &DynDatabasePool, id: i64) {
    sqlx::query("UPDATE posts SET is_published = ? WHERE id = ?")
        .bind(false)
        .bind(id)
        .execute(pool.sqlite().expect("Test pool is SQLite"))
        .await
        .expect("Failed to unpublish post");
}

fn post_from_input(id: i64, author_id: i64, input: &PostInput, created_at: DateTime<Utc>) -> Post {
    Post {
        id,
        title: input.title.clone(),
        text: input.text.clone(),
        pub_date: input.pub_date,
        author_id,
        category_id: Some(input.category_id),
        location_id: input.location_id,
        image: input.image.clone(),
        is_published: true,
        created_at,
    }
}
