//! Database migrations
//!
//! Schema changes are embedded in the binary as SQL strings, one dialect per
//! supported backend. Applied versions are tracked in the `_migrations` table,
//! so `run_migrations` is safe to call on every start.
//!
//! ```ignore
//! use blogicum::db::{create_pool, migrations};
//!
//! let pool = create_pool(&config).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

use anyhow::{Context, Result};
use sqlx::{MySqlPool, SqlitePool};

use super::DynDatabasePool;
use crate::config::DatabaseDriver;

/// A database migration with SQL for both SQLite and MySQL
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (must be unique and sequential)
    pub version: i32,
    /// Human-readable migration name
    pub name: &'static str,
    /// SQL statements for SQLite
    pub up_sqlite: &'static str,
    /// SQL statements for MySQL
    pub up_mysql: &'static str,
}

/// All schema migrations, in application order.
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_users",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username VARCHAR(150) NOT NULL UNIQUE,
                first_name VARCHAR(150) NOT NULL DEFAULT '',
                last_name VARCHAR(150) NOT NULL DEFAULT '',
                email VARCHAR(254) NOT NULL DEFAULT '',
                password_hash VARCHAR(255) NOT NULL,
                date_joined TIMESTAMP NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_users_username ON users(username);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                username VARCHAR(150) NOT NULL UNIQUE,
                first_name VARCHAR(150) NOT NULL DEFAULT '',
                last_name VARCHAR(150) NOT NULL DEFAULT '',
                email VARCHAR(254) NOT NULL DEFAULT '',
                password_hash VARCHAR(255) NOT NULL,
                date_joined DATETIME NOT NULL
            );
            CREATE INDEX idx_users_username ON users(username);
        "#,
    },
    Migration {
        version: 2,
        name: "create_sessions",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id VARCHAR(64) PRIMARY KEY,
                user_id INTEGER NOT NULL,
                expires_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id VARCHAR(64) PRIMARY KEY,
                user_id BIGINT NOT NULL,
                expires_at DATETIME NOT NULL,
                created_at DATETIME NOT NULL,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_sessions_user_id ON sessions(user_id);
            CREATE INDEX idx_sessions_expires_at ON sessions(expires_at);
        "#,
    },
    Migration {
        version: 3,
        name: "create_categories",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(256) NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                slug VARCHAR(64) NOT NULL UNIQUE,
                is_published BOOLEAN NOT NULL DEFAULT 1,
                created_at TIMESTAMP NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_categories_slug ON categories(slug);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS categories (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                title VARCHAR(256) NOT NULL,
                description TEXT NOT NULL,
                slug VARCHAR(64) NOT NULL UNIQUE,
                is_published BOOLEAN NOT NULL DEFAULT TRUE,
                created_at DATETIME NOT NULL
            );
            CREATE INDEX idx_categories_slug ON categories(slug);
        "#,
    },
    Migration {
        version: 4,
        name: "create_locations",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS locations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name VARCHAR(256) NOT NULL,
                is_published BOOLEAN NOT NULL DEFAULT 1,
                created_at TIMESTAMP NOT NULL
            );
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS locations (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                name VARCHAR(256) NOT NULL,
                is_published BOOLEAN NOT NULL DEFAULT TRUE,
                created_at DATETIME NOT NULL
            );
        "#,
    },
    Migration {
        version: 5,
        name: "create_posts",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS posts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(256) NOT NULL,
                text TEXT NOT NULL,
                pub_date TIMESTAMP NOT NULL,
                author_id INTEGER NOT NULL,
                category_id INTEGER,
                location_id INTEGER,
                image VARCHAR(255),
                is_published BOOLEAN NOT NULL DEFAULT 1,
                created_at TIMESTAMP NOT NULL,
                FOREIGN KEY (author_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE SET NULL,
                FOREIGN KEY (location_id) REFERENCES locations(id) ON DELETE SET NULL
            );
            CREATE INDEX IF NOT EXISTS idx_posts_pub_date ON posts(pub_date);
            CREATE INDEX IF NOT EXISTS idx_posts_author_id ON posts(author_id);
            CREATE INDEX IF NOT EXISTS idx_posts_category_id ON posts(category_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS posts (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                title VARCHAR(256) NOT NULL,
                text TEXT NOT NULL,
                pub_date DATETIME NOT NULL,
                author_id BIGINT NOT NULL,
                category_id BIGINT,
                location_id BIGINT,
                image VARCHAR(255),
                is_published BOOLEAN NOT NULL DEFAULT TRUE,
                created_at DATETIME NOT NULL,
                FOREIGN KEY (author_id) REFERENCES users(id) ON DELETE CASCADE,
                FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE SET NULL,
                FOREIGN KEY (location_id) REFERENCES locations(id) ON DELETE SET NULL
            );
            CREATE INDEX idx_posts_pub_date ON posts(pub_date);
            CREATE INDEX idx_posts_author_id ON posts(author_id);
            CREATE INDEX idx_posts_category_id ON posts(category_id);
        "#,
    },
    Migration {
        version: 6,
        name: "create_comments",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS comments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                text TEXT NOT NULL,
                post_id INTEGER NOT NULL,
                author_id INTEGER NOT NULL,
                created_at TIMESTAMP NOT NULL,
                FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE,
                FOREIGN KEY (author_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_comments_post_id ON comments(post_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS comments (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                text TEXT NOT NULL,
                post_id BIGINT NOT NULL,
                author_id BIGINT NOT NULL,
                created_at DATETIME NOT NULL,
                FOREIGN KEY (post_id) REFERENCES posts(id) ON DELETE CASCADE,
                FOREIGN KEY (author_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_comments_post_id ON comments(post_id);
        "#,
    },
];

impl Migration {
    fn sql(&self, driver: DatabaseDriver) -> &'static str {
        match driver {
            DatabaseDriver::Sqlite => self.up_sqlite,
            DatabaseDriver::Mysql => self.up_mysql,
        }
    }

    /// Individual statements, without blank or comment-only fragments
    fn statements(&self, driver: DatabaseDriver) -> impl Iterator<Item = &'static str> {
        self.sql(driver)
            .split(';')
            .map(str::trim)
            .filter(|stmt| stmt.lines().any(|line| !line.trim().is_empty() && !line.trim().starts_with("--")))
    }
}

const SQLITE_TRACKING_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS _migrations (
        version INTEGER PRIMARY KEY,
        name VARCHAR(255) NOT NULL,
        applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
"#;

const MYSQL_TRACKING_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS _migrations (
        version INT PRIMARY KEY,
        name VARCHAR(255) NOT NULL,
        applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    )
"#;

const RECORD_MIGRATION: &str = "INSERT INTO _migrations (version, name) VALUES (?, ?)";

/// Migrations whose version is not in `applied`, in version order
fn pending(applied: &[i32]) -> impl Iterator<Item = &'static Migration> + '_ {
    MIGRATIONS.iter().filter(move |m| !applied.contains(&m.version))
}

/// Apply every migration not yet recorded in `_migrations`.
///
/// Returns the number of migrations applied.
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    let applied = match pool.driver() {
        DatabaseDriver::Sqlite => migrate_sqlite(pool.sqlite()?).await?,
        DatabaseDriver::Mysql => migrate_mysql(pool.mysql()?).await?,
    };

    if applied > 0 {
        tracing::info!("Applied {} migration(s)", applied);
    } else {
        tracing::debug!("No pending migrations");
    }
    Ok(applied)
}

async fn migrate_sqlite(pool: &SqlitePool) -> Result<usize> {
    sqlx::query(SQLITE_TRACKING_TABLE)
        .execute(pool)
        .await
        .context("Failed to create migrations table")?;

    let applied: Vec<i32> = sqlx::query_scalar("SELECT version FROM _migrations")
        .fetch_all(pool)
        .await
        .context("Failed to read applied migrations")?;

    let mut count = 0;
    for migration in pending(&applied) {
        tracing::info!("Applying migration {}: {}", migration.version, migration.name);

        // SQLite DDL is transactional, so a failed migration leaves no trace
        let mut tx = pool.begin().await?;
        for statement in migration.statements(DatabaseDriver::Sqlite) {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .with_context(|| format!("Migration {} failed", migration.name))?;
        }
        sqlx::query(RECORD_MIGRATION)
            .bind(migration.version)
            .bind(migration.name)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        count += 1;
    }
    Ok(count)
}

async fn migrate_mysql(pool: &MySqlPool) -> Result<usize> {
    sqlx::query(MYSQL_TRACKING_TABLE)
        .execute(pool)
        .await
        .context("Failed to create migrations table")?;

    let applied: Vec<i32> = sqlx::query_scalar("SELECT version FROM _migrations")
        .fetch_all(pool)
        .await
        .context("Failed to read applied migrations")?;

    let mut count = 0;
    for migration in pending(&applied) {
        tracing::info!("Applying migration {}: {}", migration.version, migration.name);

        for statement in migration.statements(DatabaseDriver::Mysql) {
            sqlx::query(statement)
                .execute(pool)
                .await
                .with_context(|| format!("Migration {} failed", migration.name))?;
        }
        sqlx::query(RECORD_MIGRATION)
            .bind(migration.version)
            .bind(migration.name)
            .execute(pool)
            .await?;
        count += 1;
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use chrono::Utc;
    use sqlx::Row;

    async fn migrated_pool() -> DynDatabasePool {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        run_migrations(&pool).await.expect("Failed to run migrations");
        pool
    }

    async fn insert_user(pool: &SqlitePool, username: &str) -> sqlx::Result<i64> {
        let result = sqlx::query(
            "INSERT INTO users (username, password_hash, date_joined) VALUES (?, ?, ?)",
        )
        .bind(username)
        .bind("hash123")
        .bind(Utc::now())
        .execute(pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    #[tokio::test]
    async fn test_run_migrations() {
        let pool = create_test_pool().await.expect("Failed to create test pool");

        let applied = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(applied, MIGRATIONS.len());

        // Second run applies nothing
        let applied = run_migrations(&pool).await.expect("Failed to run migrations");
        assert_eq!(applied, 0);
    }

    #[tokio::test]
    async fn test_applied_versions_are_recorded() {
        let pool = migrated_pool().await;
        let versions: Vec<i32> = sqlx::query_scalar("SELECT version FROM _migrations ORDER BY version")
            .fetch_all(pool.sqlite().unwrap())
            .await
            .unwrap();
        let expected: Vec<i32> = MIGRATIONS.iter().map(|m| m.version).collect();
        assert_eq!(versions, expected);
        assert_eq!(pending(&versions).count(), 0);
    }

    #[tokio::test]
    async fn test_users_defaults_to_empty_names() {
        let pool = migrated_pool().await;
        let sqlite_pool = pool.sqlite().unwrap();

        let id = insert_user(sqlite_pool, "testuser").await.expect("Failed to insert user");
        let row = sqlx::query("SELECT first_name, last_name, email FROM users WHERE id = ?")
            .bind(id)
            .fetch_one(sqlite_pool)
            .await
            .expect("Failed to read user");

        let first_name: String = row.get("first_name");
        let email: String = row.get("email");
        assert_eq!(first_name, "");
        assert_eq!(email, "");
    }

    #[tokio::test]
    async fn test_unique_username() {
        let pool = migrated_pool().await;
        let sqlite_pool = pool.sqlite().unwrap();

        insert_user(sqlite_pool, "testuser").await.expect("Failed to insert user");
        assert!(insert_user(sqlite_pool, "testuser").await.is_err());
    }

    #[tokio::test]
    async fn test_session_requires_existing_user() {
        let pool = migrated_pool().await;
        let sqlite_pool = pool.sqlite().unwrap();

        let result = sqlx::query(
            "INSERT INTO sessions (id, user_id, expires_at, created_at) VALUES (?, ?, datetime('now', '+1 day'), datetime('now'))",
        )
        .bind("session123")
        .bind(999i64)
        .execute(sqlite_pool)
        .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_post_relations_on_delete() {
        let pool = migrated_pool().await;
        let sqlite_pool = pool.sqlite().unwrap();
        let now = Utc::now();

        let author_id = insert_user(sqlite_pool, "author").await.expect("Failed to insert user");
        let category_id = sqlx::query(
            "INSERT INTO categories (title, slug, created_at) VALUES ('Travel', 'travel', ?)",
        )
        .bind(now)
        .execute(sqlite_pool)
        .await
        .expect("Failed to insert category")
        .last_insert_rowid();

        let post_id = sqlx::query(
            "INSERT INTO posts (title, text, pub_date, author_id, category_id, created_at) VALUES ('t', 'x', ?, ?, ?, ?)",
        )
        .bind(now)
        .bind(author_id)
        .bind(category_id)
        .bind(now)
        .execute(sqlite_pool)
        .await
        .expect("Failed to insert post")
        .last_insert_rowid();

        sqlx::query("INSERT INTO comments (text, post_id, author_id, created_at) VALUES ('c', ?, ?, ?)")
            .bind(post_id)
            .bind(author_id)
            .bind(now)
            .execute(sqlite_pool)
            .await
            .expect("Failed to insert comment");

        // Deleting the category detaches the post
        sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(category_id)
            .execute(sqlite_pool)
            .await
            .expect("Failed to delete category");
        let row = sqlx::query("SELECT category_id, is_published FROM posts WHERE id = ?")
            .bind(post_id)
            .fetch_one(sqlite_pool)
            .await
            .expect("Post should survive");
        let category: Option<i64> = row.get("category_id");
        let is_published: bool = row.get("is_published");
        assert!(category.is_none());
        assert!(is_published);

        // Deleting the author removes posts and comments
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(author_id)
            .execute(sqlite_pool)
            .await
            .expect("Failed to delete user");
        let posts: i64 = sqlx::query("SELECT COUNT(*) AS count FROM posts")
            .fetch_one(sqlite_pool)
            .await
            .unwrap()
            .get("count");
        let comments: i64 = sqlx::query("SELECT COUNT(*) AS count FROM comments")
            .fetch_one(sqlite_pool)
            .await
            .unwrap()
            .get("count");
        assert_eq!(posts, 0);
        assert_eq!(comments, 0);
    }

    #[test]
    fn test_migration_versions_are_sequential() {
        for (index, migration) in MIGRATIONS.iter().enumerate() {
            assert_eq!(migration.version as usize, index + 1);
        }
    }

    #[test]
    fn test_pending_skips_applied_versions() {
        let versions: Vec<i32> = pending(&[1, 2, 4]).map(|m| m.version).collect();
        assert_eq!(versions, vec![3, 5, 6]);
        assert_eq!(pending(&[]).count(), MIGRATIONS.len());
    }

    #[test]
    fn test_statements_drop_blank_and_comment_fragments() {
        let migration = Migration {
            version: 99,
            name: "sample",
            up_sqlite: "-- leading note\nCREATE TABLE a (id INT);\n  ;\nCREATE TABLE b (id INT)",
            up_mysql: "",
        };
        let statements: Vec<_> = migration.statements(DatabaseDriver::Sqlite).collect();
        assert_eq!(statements, vec!["-- leading note\nCREATE TABLE a (id INT)", "CREATE TABLE b (id INT)"]);
        assert_eq!(migration.statements(DatabaseDriver::Mysql).count(), 0);
    }
}
