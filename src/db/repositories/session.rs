//! Session repository
//!
//! Sessions are plain rows keyed by their token. The SQL is identical on
//! both drivers, so each operation only picks the pool.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Session;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[async_trait]
pub trait SessionRepository: Send + Sync {
    async fn create(&self, session: &Session) -> Result<()>;

    /// Look a session up by token, expired or not
    async fn get_by_token(&self, token: &str) -> Result<Option<Session>>;

    async fn delete(&self, token: &str) -> Result<()>;

    /// Remove every session that expired before `now`; returns how many
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64>;
}

pub struct SqlxSessionRepository {
    pool: DynDatabasePool,
}

impl SqlxSessionRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

const INSERT_SESSION: &str = "INSERT INTO sessions (id, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)";
const SELECT_SESSION: &str = "SELECT id, user_id, expires_at, created_at FROM sessions WHERE id = ?";
const DELETE_SESSION: &str = "DELETE FROM sessions WHERE id = ?";
const DELETE_EXPIRED: &str = "DELETE FROM sessions WHERE expires_at < ?";

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(&self, session: &Session) -> Result<()> {
        let result = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(INSERT_SESSION)
                .bind(&session.id)
                .bind(session.user_id)
                .bind(session.expires_at)
                .bind(session.created_at)
                .execute(self.pool.sqlite()?)
                .await
                .map(|_| ()),
            DatabaseDriver::Mysql => sqlx::query(INSERT_SESSION)
                .bind(&session.id)
                .bind(session.user_id)
                .bind(session.expires_at)
                .bind(session.created_at)
                .execute(self.pool.mysql()?)
                .await
                .map(|_| ()),
        };
        result.context("Failed to create session")
    }

    async fn get_by_token(&self, token: &str) -> Result<Option<Session>> {
        let result = match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                sqlx::query_as::<_, Session>(SELECT_SESSION)
                    .bind(token)
                    .fetch_optional(self.pool.sqlite()?)
                    .await
            }
            DatabaseDriver::Mysql => {
                sqlx::query_as::<_, Session>(SELECT_SESSION)
                    .bind(token)
                    .fetch_optional(self.pool.mysql()?)
                    .await
            }
        };
        result.context("Failed to load session")
    }

    async fn delete(&self, token: &str) -> Result<()> {
        let result = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(DELETE_SESSION)
                .bind(token)
                .execute(self.pool.sqlite()?)
                .await
                .map(|_| ()),
            DatabaseDriver::Mysql => sqlx::query(DELETE_SESSION)
                .bind(token)
                .execute(self.pool.mysql()?)
                .await
                .map(|_| ()),
        };
        result.context("Failed to delete session")
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(DELETE_EXPIRED)
                .bind(now)
                .execute(self.pool.sqlite()?)
                .await
                .map(|done| done.rows_affected()),
            DatabaseDriver::Mysql => sqlx::query(DELETE_EXPIRED)
                .bind(now)
                .execute(self.pool.mysql()?)
                .await
                .map(|done| done.rows_affected()),
        };
        result.context("Failed to delete expired sessions")
    }
}
