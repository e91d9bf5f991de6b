//! User repository
//!
//! Database operations for users.
//!
//! This module provides:
//! - `UserRepository` trait defining the interface for user data access
//! - `SqlxUserRepository` implementing the trait for SQLite and MySQL

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{CreateUserInput, UpdateProfileInput, User};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user
    async fn create(&self, input: &CreateUserInput) -> Result<User>;

    /// Get user by ID
    async fn get_by_id(&self, id: i64) -> Result<Option<User>>;

    /// Get user by username
    async fn get_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Replace the profile fields of a user
    async fn update_profile(&self, id: i64, input: &UpdateProfileInput) -> Result<()>;

    /// Count total users
    async fn count(&self) -> Result<i64>;
}

/// SQLx-based user repository implementation
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxUserRepository {
    pool: DynDatabasePool,
}

impl SqlxUserRepository {
    /// Create a new SQLx user repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn UserRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, input: &CreateUserInput) -> Result<User> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_user_sqlite(self.pool.sqlite()?, input).await,
            DatabaseDriver::Mysql => create_user_mysql(self.pool.mysql()?, input).await,
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => get_user_by_id_sqlite(self.pool.sqlite()?, id).await,
            DatabaseDriver::Mysql => get_user_by_id_mysql(self.pool.mysql()?, id).await,
        }
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_user_by_username_sqlite(self.pool.sqlite()?, username).await
            }
            DatabaseDriver::Mysql => {
                get_user_by_username_mysql(self.pool.mysql()?, username).await
            }
        }
    }

    async fn update_profile(&self, id: i64, input: &UpdateProfileInput) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => update_profile_sqlite(self.pool.sqlite()?, id, input).await,
            DatabaseDriver::Mysql => update_profile_mysql(self.pool.mysql()?, id, input).await,
        }
    }

    async fn count(&self) -> Result<i64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => count_users_sqlite(self.pool.sqlite()?).await,
            DatabaseDriver::Mysql => count_users_mysql(self.pool.mysql()?).await,
        }
    }
}

const USER_COLUMNS: &str =
    "id, username, first_name, last_name, email, password_hash, date_joined";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(pool: &SqlitePool, input: &CreateUserInput) -> Result<User> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO users (username, first_name, last_name, email, password_hash, date_joined)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.username)
    .bind(&input.first_name)
    .bind(&input.last_name)
    .bind(&input.email)
    .bind(&input.password_hash)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(user_from_input(result.last_insert_rowid(), input, now))
}

async fn get_user_by_id_sqlite(pool: &SqlitePool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by ID")?;

    row.as_ref().map(row_to_user_sqlite).transpose()
}

async fn get_user_by_username_sqlite(pool: &SqlitePool, username: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS))
        .bind(username)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by username")?;

    row.as_ref().map(row_to_user_sqlite).transpose()
}

async fn update_profile_sqlite(
    pool: &SqlitePool,
    id: i64,
    input: &UpdateProfileInput,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE users
        SET username = ?, first_name = ?, last_name = ?, email = ?
        WHERE id = ?
        "#,
    )
    .bind(&input.username)
    .bind(&input.first_name)
    .bind(&input.last_name)
    .bind(&input.email)
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to update user profile")?;

    Ok(())
}

async fn count_users_sqlite(pool: &SqlitePool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM users")
        .fetch_one(pool)
        .await
        .context("Failed to count users")?;

    Ok(row.get("count"))
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        date_joined: row.get("date_joined"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_user_mysql(pool: &MySqlPool, input: &CreateUserInput) -> Result<User> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        INSERT INTO users (username, first_name, last_name, email, password_hash, date_joined)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.username)
    .bind(&input.first_name)
    .bind(&input.last_name)
    .bind(&input.email)
    .bind(&input.password_hash)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to create user")?;

    Ok(user_from_input(result.last_insert_id() as i64, input, now))
}

async fn get_user_by_id_mysql(pool: &MySqlPool, id: i64) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by ID")?;

    row.as_ref().map(row_to_user_mysql).transpose()
}

async fn get_user_by_username_mysql(pool: &MySqlPool, username: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!("SELECT {} FROM users WHERE username = ?", USER_COLUMNS))
        .bind(username)
        .fetch_optional(pool)
        .await
        .context("Failed to get user by username")?;

    row.as_ref().map(row_to_user_mysql).transpose()
}

async fn update_profile_mysql(pool: &MySqlPool, id: i64, input: &UpdateProfileInput) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE users
        SET username = ?, first_name = ?, last_name = ?, email = ?
        WHERE id = ?
        "#,
    )
    .bind(&input.username)
    .bind(&input.first_name)
    .bind(&input.last_name)
    .bind(&input.email)
    .bind(id)
    .execute(pool)
    .await
    .context("Failed to update user profile")?;

    Ok(())
}

async fn count_users_mysql(pool: &MySqlPool) -> Result<i64> {
    let row = sqlx::query("SELECT COUNT(*) as count FROM users")
        .fetch_one(pool)
        .await
        .context("Failed to count users")?;

    Ok(row.get("count"))
}

fn row_to_user_mysql(row: &sqlx::mysql::MySqlRow) -> Result<User> {
    Ok(User {
        id: row.get("id"),
        username: row.get("username"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        date_joined: row.get("date_joined"),
    })
}

fn user_from_input(id: i64, input: &CreateUserInput, date_joined: chrono::DateTime<Utc>) -> User {
    User {
        id,
        username: input.username.clone(),
        first_name: input.first_name.clone(),
        last_name: input.last_name.clone(),
        email: input.email.clone(),
        password_hash: input.password_hash.clone(),
        date_joined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations};
    use crate::services::password::hash_password;

    async fn setup_test_repo() -> (DynDatabasePool, SqlxUserRepository) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let repo = SqlxUserRepository::new(pool.clone());
        (pool, repo)
    }

    #[tokio::test]
    async fn test_create_user() {
        let (_pool, repo) = setup_test_repo().await;

        let user = repo
            .create(&CreateUserInput::new("testuser", "hash"))
            .await
            .expect("Failed to create user");

        assert!(user.id > 0);
        assert_eq!(user.username, "testuser");
        assert_eq!(user.email, "");
        assert_eq!(user.first_name, "");
    }

    #[tokio::test]
    async fn test_get_user_by_id() {
        let (_pool, repo) = setup_test_repo().await;
        let created = repo
            .create(&CreateUserInput::new("testuser", "hash"))
            .await
            .unwrap();

        let found = repo
            .get_by_id(created.id)
            .await
            .expect("Failed to get user")
            .expect("User not found");

        assert_eq!(found.id, created.id);
        assert_eq!(found.username, "testuser");
    }

    #[tokio::test]
    async fn test_get_user_by_id_not_found() {
        let (_pool, repo) = setup_test_repo().await;
        assert!(repo.get_by_id(999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_user_by_username() {
        let (_pool, repo) = setup_test_repo().await;
        repo.create(&CreateUserInput::new("leo", "hash")).await.unwrap();

        let found = repo.get_by_username("leo").await.unwrap();
        assert!(found.is_some());
        assert!(repo.get_by_username("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_profile() {
        let (_pool, repo) = setup_test_repo().await;
        let user = repo.create(&CreateUserInput::new("leo", "hash")).await.unwrap();

        let update = UpdateProfileInput {
            username: "lev".to_string(),
            first_name: "Lev".to_string(),
            last_name: "Tolstoy".to_string(),
            email: "lev@example.com".to_string(),
        };
        repo.update_profile(user.id, &update)
            .await
            .expect("Failed to update profile");

        let found = repo.get_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(found.username, "lev");
        assert_eq!(found.first_name, "Lev");
        assert_eq!(found.last_name, "Tolstoy");
        assert_eq!(found.email, "lev@example.com");
        // Password is untouched
        assert_eq!(found.password_hash, "hash");
    }

    #[tokio::test]
    async fn test_count_users() {
        let (_pool, repo) = setup_test_repo().await;
        assert_eq!(repo.count().await.unwrap(), 0);

        repo.create(&CreateUserInput::new("a", "hash")).await.unwrap();
        repo.create(&CreateUserInput::new("b", "hash")).await.unwrap();
        assert_eq!(repo.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_unique_username_constraint() {
        let (_pool, repo) = setup_test_repo().await;
        repo.create(&CreateUserInput::new("leo", "hash")).await.unwrap();

        let result = repo.create(&CreateUserInput::new("leo", "other")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_password_hash_stored_correctly() {
        let (_pool, repo) = setup_test_repo().await;
        let hash = hash_password("securepassword").expect("Failed to hash password");

        let user = repo
            .create(&CreateUserInput::new("leo", hash.clone()))
            .await
            .unwrap();

        let found = repo.get_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(found.password_hash, hash);
        assert!(found.password_hash.starts_with("$argon2"));
    }
}
