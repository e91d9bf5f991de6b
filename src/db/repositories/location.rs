//! Location repository
//!
//! Database operations for locations.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{CreateLocationInput, Location};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Location repository trait
#[async_trait]
pub trait LocationRepository: Send + Sync {
    /// Create a new location
    async fn create(&self, input: &CreateLocationInput) -> Result<Location>;

    /// Get location by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<Location>>;

    /// List all locations ordered by name
    async fn list(&self) -> Result<Vec<Location>>;
}

/// SQLx-based location repository implementation
pub struct SqlxLocationRepository {
    pool: DynDatabasePool,
}

impl SqlxLocationRepository {
    /// Create a new SQLx location repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn LocationRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl LocationRepository for SqlxLocationRepository {
    async fn create(&self, input: &CreateLocationInput) -> Result<Location> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_location_sqlite(self.pool.sqlite()?, input).await,
            DatabaseDriver::Mysql => create_location_mysql(self.pool.mysql()?, input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Location>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_location_by_id_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_location_by_id_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn list(&self) -> Result<Vec<Location>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => list_locations_sqlite(self.pool.sqlite()?).await,
            DatabaseDriver::Mysql => list_locations_mysql(self.pool.mysql()?).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_location_sqlite(pool: &SqlitePool, input: &CreateLocationInput) -> Result<Location> {
    let now = Utc::now();

    let result = sqlx::query(
        "INSERT INTO locations (name, is_published, created_at) VALUES (?, ?, ?)",
    )
    .bind(&input.name)
    .bind(input.is_published)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create location")?;

    Ok(Location {
        id: result.last_insert_rowid(),
        name: input.name.clone(),
        is_published: input.is_published,
        created_at: now,
    })
}

async fn get_location_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<Location>> {
    let row = sqlx::query(
        "SELECT id, name, is_published, created_at FROM locations WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get location by ID")?;

    row.as_ref().map(row_to_location_sqlite).transpose()
}

async fn list_locations_sqlite(pool: &SqlitePool) -> Result<Vec<Location>> {
    let rows = sqlx::query(
        "SELECT id, name, is_published, created_at FROM locations ORDER BY name, id",
    )
    .fetch_all(pool)
    .await
    .context("Failed to list locations")?;

    rows.iter().map(row_to_location_sqlite).collect()
}

fn row_to_location_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Location> {
    Ok(Location {
        id: row.get("id"),
        name: row.get("name"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_location_mysql(pool: &MySqlPool, input: &CreateLocationInput) -> Result<Location> {
    let now = Utc::now();

    let result = sqlx::query(
        "INSERT INTO locations (name, is_published, created_at) VALUES (?, ?, ?)",
    )
    .bind(&input.name)
    .bind(input.is_published)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create location")?;

    Ok(Location {
        id: result.last_insert_id() as i64,
        name: input.name.clone(),
        is_published: input.is_published,
        created_at: now,
    })
}

async fn get_location_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<Location>> {
    let row = sqlx::query(
        "SELECT id, name, is_published, created_at FROM locations WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .context("Failed to get location by ID")?;

    row.as_ref().map(row_to_location_mysql).transpose()
}

async fn list_locations_mysql(pool: &MySqlPool) -> Result<Vec<Location>> {
    let rows = sqlx::query(
        "SELECT id, name, is_published, created_at FROM locations ORDER BY name, id",
    )
    .fetch_all(pool)
    .await
    .context("Failed to list locations")?;

    rows.iter().map(row_to_location_mysql).collect()
}

fn row_to_location_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Location> {
    Ok(Location {
        id: row.get("id"),
        name: row.get("name"),
        is_published: row.get("is_published"),
        created_at: row.get("created_at"),
    })
}
