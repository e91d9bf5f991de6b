//! Database layer
//!
//! Blogicum stores users, sessions, categories, locations, posts and
//! comments in a relational database. It supports:
//! - SQLite (default, for single-binary deployment)
//! - MySQL
//!
//! The driver is selected from configuration and hidden behind the
//! [`DatabasePool`] trait. Repositories dispatch on [`DatabasePool::driver`]
//! to per-dialect query functions.
//!
//! # Usage
//!
//! ```ignore
//! use blogicum::config::DatabaseConfig;
//! use blogicum::db::{create_pool, migrations};
//!
//! let pool = create_pool(&DatabaseConfig::default()).await?;
//! migrations::run_migrations(&pool).await?;
//! pool.ping().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DynDatabasePool, MysqlDatabase, SqliteDatabase,
};
