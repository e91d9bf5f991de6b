//! Connection pools
//!
//! Repositories hold a [`DynDatabasePool`] and dispatch on its driver. The
//! SQLite pool also accepts bare file paths and `:memory:`.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use sqlx::{
    mysql::{MySqlPool, MySqlPoolOptions},
    sqlite::{SqlitePool, SqlitePoolOptions},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{DatabaseConfig, DatabaseDriver};

const SQLITE_MAX_CONNECTIONS: u32 = 20;
const MYSQL_MAX_CONNECTIONS: u32 = 30;

/// A pool for one of the supported drivers
#[async_trait]
pub trait DatabasePool: Send + Sync {
    fn driver(&self) -> DatabaseDriver;

    /// The SQLite pool; an error on any other driver
    fn sqlite(&self) -> Result<&SqlitePool>;

    /// The MySQL pool; an error on any other driver
    fn mysql(&self) -> Result<&MySqlPool>;

    /// Round-trip a trivial query
    async fn ping(&self) -> Result<()>;

    /// Stop handing out connections and wait for checked-out ones
    async fn close(&self);
}

pub type DynDatabasePool = Arc<dyn DatabasePool>;

/// Where a SQLite URL points
#[derive(Debug, PartialEq, Eq)]
struct SqliteTarget {
    /// URL handed to sqlx
    url: String,
    /// Database file, absent for in-memory databases
    file: Option<PathBuf>,
}

impl SqliteTarget {
    fn parse(url: &str) -> Self {
        if url == ":memory:" || url.starts_with("sqlite::memory:") {
            let url = if url == ":memory:" { "sqlite::memory:" } else { url };
            return Self {
                url: url.to_string(),
                file: None,
            };
        }

        let path = url.strip_prefix("sqlite:").unwrap_or(url);
        let file = path.split('?').next().map(PathBuf::from);
        let url = match (url.starts_with("sqlite:"), url.contains('?')) {
            (true, true) => url.to_string(),
            (true, false) => format!("{}?mode=rwc", url),
            (false, _) => format!("sqlite:{}?mode=rwc", url),
        };
        Self { url, file }
    }

    fn in_memory(&self) -> bool {
        self.file.is_none()
    }
}

pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    pub async fn connect(url: &str) -> Result<Self> {
        let target = SqliteTarget::parse(url);
        if let Some(parent) = target.file.as_deref().and_then(Path::parent) {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create database directory {}", parent.display()))?;
            }
        }

        // Each connection to an in-memory database sees a fresh database,
        // so those pools keep exactly one connection alive forever.
        let options = if target.in_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(SQLITE_MAX_CONNECTIONS)
        };
        let pool = options
            .connect(&target.url)
            .await
            .with_context(|| format!("Failed to open SQLite database {}", url))?;

        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&pool)
            .await
            .context("Failed to enable foreign keys")?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl DatabasePool for SqliteDatabase {
    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Sqlite
    }

    fn sqlite(&self) -> Result<&SqlitePool> {
        Ok(&self.pool)
    }

    fn mysql(&self) -> Result<&MySqlPool> {
        bail!("SQLite pool used as MySQL")
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("SQLite ping failed")?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

pub struct MysqlDatabase {
    pool: MySqlPool,
}

impl MysqlDatabase {
    pub async fn connect(url: &str) -> Result<Self> {
        let url = if url.starts_with("mysql://") {
            url.to_string()
        } else {
            format!("mysql://{}", url)
        };

        let pool = MySqlPoolOptions::new()
            .max_connections(MYSQL_MAX_CONNECTIONS)
            .connect(&url)
            .await
            .context("Failed to connect to MySQL")?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl DatabasePool for MysqlDatabase {
    fn driver(&self) -> DatabaseDriver {
        DatabaseDriver::Mysql
    }

    fn sqlite(&self) -> Result<&SqlitePool> {
        bail!("MySQL pool used as SQLite")
    }

    fn mysql(&self) -> Result<&MySqlPool> {
        Ok(&self.pool)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("MySQL ping failed")?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

/// Open the pool named by the configuration
pub async fn create_pool(config: &DatabaseConfig) -> Result<DynDatabasePool> {
    let pool: DynDatabasePool = match config.driver {
        DatabaseDriver::Sqlite => Arc::new(SqliteDatabase::connect(&config.url).await?),
        DatabaseDriver::Mysql => Arc::new(MysqlDatabase::connect(&config.url).await?),
    };
    Ok(pool)
}

/// In-memory SQLite pool for tests
pub async fn create_test_pool() -> Result<DynDatabasePool> {
    create_pool(&DatabaseConfig {
        driver: DatabaseDriver::Sqlite,
        url: ":memory:".to_string(),
    })
    .await
}
