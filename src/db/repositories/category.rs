//! Category repository
//!
//! Database operations for categories.
//!
//! This module provides:
//! - `CategoryRepository` trait defining the interface for category data access
//! - `SqlxCategoryRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Category, CreateCategoryInput};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Create a new category
    async fn create(&self, input: &CreateCategoryInput) -> Result<Category>;

    /// Get category by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Category>>;

    /// Get category by slug
    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>>;

    /// List all categories ordered by title
    async fn list(&self) -> Result<Vec<Category>>;

    /// Delete a category; its posts lose their category
    async fn delete(&self, id: i64) -> Result<()>;
}

/// SQLx-based category repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    /// Create a new SQLx category repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn CategoryRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn create(&self, input: &CreateCategoryInput) -> Result<Category> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_category_sqlite(self.pool.sqlite()?, input).await,
            DatabaseDriver::Mysql => create_category_mysql(self.pool.mysql()?, input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_category_by_id_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_category_by_id_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_category_by_slug_sqlite(self.pool.sqlite()?, slug).await
            }
            DatabaseDriver::Mysql => get_category_by_slug_mysql(self.pool.mysql()?, slug).await,
        }
    }

    async fn list(&self) -> Result<Vec<Category>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_categories_sqlite(self.pool.sqlite()?).await,
            DatabaseDriver::Mysql => list_categories_mysql(self.pool.mysql()?).await,
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => delete_category_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => delete_category_mysql(self.pool.mysql()?, id).await,
        }
    }
}

const CATEGORY_COLUMNS: &str = "id, title, description, slug, is_published, created_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_category_sqlite(pool: &SqlitePool, input: &CreateCategoryInput) -> Result<Category> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO categories (title, description, slug, is_published, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.title)
    .bind(&input.description)
    .bind(&input.slug)
    .bind(input.is_published)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create category")?;

    Ok(category_from_input(result.last_insert_rowid(), input, now))
}

async fn get_category_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Category>> {
    let row = sqlx::query(&format!("SELECT {} FROM categories WHERE id = ?", CATEGORY_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by ID")?;

    row.as_ref().map(row_to_category_sqlite).transpose()
}

async fn get_category_by_slug_sqlite(pool: &SqlitePool, slug: &str) -> Result<Option<Category>> {
    let row = sqlx::query(&format!("SELECT {} FROM categories WHERE slug = ?", CATEGORY_COLUMNS))
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by slug")?;

    row.as_ref().map(row_to_category_sqlite).transpose()
}

async fn list_categories_sqlite(pool: &SqlitePool) -> Result<Vec<Category>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM categories ORDER BY title, id",
        CATEGORY_COLUMNS
    ))
    .fetch_all(pool)
    .await
    .context("Failed to list categories")?;

    rows.iter().map(row_to_category_sqlite).collect()
}

async fn delete_category_sqlite(pool: &SqlitePool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete category")?;

    Ok(())
}

fn row_to_category_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Category> {
    Ok(Category {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        slug: row.get("slug"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_category_mysql(pool: &MySqlPool, input: &CreateCategoryInput) -> Result<Category> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO categories (title, description, slug, is_published, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.title)
    .bind(&input.description)
    .bind(&input.slug)
    .bind(input.is_published)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create category")?;

    Ok(category_from_input(result.last_insert_id() as i64, input, now))
}

async fn get_category_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Category>> {
    let row = sqlx::query(&format!("SELECT {} FROM categories WHERE id = ?", CATEGORY_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by ID")?;

    row.as_ref().map(row_to_category_mysql).transpose()
}

async fn get_category_by_slug_mysql(pool: &MySqlPool, slug: &str) -> Result<Option<Category>> {
    let row = sqlx::query(&format!("SELECT {} FROM categories WHERE slug = ?", CATEGORY_COLUMNS))
        .bind(slug)
        .fetch_optional(pool)
        .await
        .context("Failed to get category by slug")?;

    row.as_ref().map(row_to_category_mysql).transpose()
}

async fn list_categories_mysql(pool: &MySqlPool) -> Result<Vec<Category>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM categories ORDER BY title, id",
        CATEGORY_COLUMNS
    ))
    .fetch_all(pool)
    .await
    .context("Failed to list categories")?;

    rows.iter().map(row_to_category_mysql).collect()
}

async fn delete_category_mysql(pool: &MySqlPool, id: i64) -> Result<()> {
    sqlx::query("DELETE FROM categories WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await
        .context("Failed to delete category")?;

    Ok(())
}

fn row_to_category_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Category> {
    Ok(Category {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        slug: row.get("slug"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
    })
}

fn category_from_input(
    id: i64,
    input: &CreateCategoryInput,
    created_at: chrono::DateTime<Utc>,
) -> Category {
    Category {
        id,
        title: input.title.clone(),
        description: input.description.clone(),
        slug: input.slug.clone(),
        is_published: input.is_published,
        created_at,
    }
}
