//! User service
//!
//! Implements business logic for accounts:
//! - Registration with username and password rules
//! - Login/logout backed by server-side sessions
//! - Session validation (expired sessions count as logged out)
//! - Profile updates

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{CreateUserInput, Session, UpdateProfileInput, User};
use crate::services::password::{hash_password, validate_password, verify_password};
use anyhow::Context;
use chrono::{Duration, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

/// Default session lifetime in days
pub const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 14;

/// Longest accepted username
pub const MAX_USERNAME_LENGTH: usize = 150;

static USERNAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\w.@+-]+$").unwrap_or_else(|e| panic!("username pattern: {}", e))
});

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Authentication failed (invalid credentials)
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Username already taken
    #[error("User already exists: {0}")]
    UserExists(String),

    /// User not found
    #[error("User not found")]
    NotFound,

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Check a username against the account naming rules.
///
/// Returns a message describing the first violated rule.
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("This field is required.".to_string());
    }
    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(format!(
            "Ensure this value has at most {} characters.",
            MAX_USERNAME_LENGTH
        ));
    }
    if !USERNAME_RE.is_match(username) {
        return Err(
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
                .to_string(),
        );
    }
    Ok(())
}

/// User service for managing users and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_expiration_days: i64,
}

impl UserService {
    /// Create a new user service with the default session lifetime
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
    ) -> Self {
        Self::with_session_expiration(user_repo, session_repo, DEFAULT_SESSION_EXPIRATION_DAYS)
    }

    /// Create a new user service with custom session expiration
    pub fn with_session_expiration(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_expiration_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_expiration_days,
        }
    }

    /// How long a new session stays valid
    pub fn session_lifetime(&self) -> Duration {
        Duration::days(self.session_expiration_days)
    }

    /// Register a new user
    ///
    /// # Errors
    ///
    /// - `ValidationError` if the username or password breaks the rules
    /// - `UserExists` if the username is already taken
    /// - `InternalError` for database errors
    pub async fn register(&self, input: RegisterInput) -> Result<User, UserServiceError> {
        validate_username(&input.username).map_err(UserServiceError::ValidationError)?;

        let problems = validate_password(&input.password, &input.username);
        if !problems.is_empty() {
            return Err(UserServiceError::ValidationError(problems.join(" ")));
        }

        if self
            .user_repo
            .get_by_username(&input.username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(input.username));
        }

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;

        let user = self
            .user_repo
            .create(&CreateUserInput::new(input.username, password_hash))
            .await
            .context("Failed to create user")?;

        tracing::info!(user_id = user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Login with credentials and open a new session
    ///
    /// Unknown usernames and wrong passwords fail the same way.
    pub async fn login(&self, input: LoginInput) -> Result<Session, UserServiceError> {
        let invalid =
            || UserServiceError::AuthenticationError("Invalid username or password".to_string());

        let user = self
            .user_repo
            .get_by_username(&input.username)
            .await
            .context("Failed to get user by username")?
            .ok_or_else(invalid)?;

        let password_valid = verify_password(&input.password, &user.password_hash)
            .context("Failed to verify password")?;
        if !password_valid {
            tracing::debug!(username = %input.username, "Rejected login with wrong password");
            return Err(invalid());
        }

        let session = Session::start(user.id, self.session_lifetime());
        self.session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        tracing::info!(user_id = user.id, "User logged in");
        Ok(session)
    }

    /// Logout (invalidate session)
    ///
    /// Unknown tokens are ignored.
    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;

        Ok(())
    }

    /// Resolve a session token to its user.
    ///
    /// Returns `None` if the session doesn't exist or has expired; expired
    /// sessions are deleted on the way.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_token(token)
            .await
            .context("Failed to get session")?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            if let Err(e) = self.session_repo.delete(token).await {
                tracing::warn!("Failed to delete expired session: {:#}", e);
            }
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;

        Ok(user)
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        let user = self
            .user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")?;

        Ok(user)
    }

    /// Get user by username
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, UserServiceError> {
        let user = self
            .user_repo
            .get_by_username(username)
            .await
            .context("Failed to get user by username")?;

        Ok(user)
    }

    /// Replace a user's profile fields.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the user does not exist
    /// - `ValidationError` if the new username breaks the rules
    /// - `UserExists` if the new username belongs to someone else
    pub async fn update_profile(
        &self,
        user_id: i64,
        input: UpdateProfileInput,
    ) -> Result<User, UserServiceError> {
        let current = self
            .get_by_id(user_id)
            .await?
            .ok_or(UserServiceError::NotFound)?;

        validate_username(&input.username).map_err(UserServiceError::ValidationError)?;

        if input.username != current.username {
            let taken = self
                .user_repo
                .get_by_username(&input.username)
                .await
                .context("Failed to check username")?
                .is_some_and(|other| other.id != user_id);
            if taken {
                return Err(UserServiceError::UserExists(input.username));
            }
        }

        self.user_repo
            .update_profile(user_id, &input)
            .await
            .context("Failed to update profile")?;

        Ok(User {
            username: input.username,
            first_name: input.first_name,
            last_name: input.last_name,
            email: input.email,
            ..current
        })
    }

    /// Delete all expired sessions
    ///
    /// Returns the number of sessions deleted.
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        let count = self
            .session_repo
            .delete_expired(Utc::now())
            .await
            .context("Failed to delete expired sessions")?;

        Ok(count)
    }
}

/// Input for user registration
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub username: String,
    pub password: String,
}

impl RegisterInput {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Input for user login
#[derive(Debug, Clone)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

impl LoginInput {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxSessionRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations, DynDatabasePool};

    async fn setup_test_service() -> (DynDatabasePool, UserService) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let session_repo = SqlxSessionRepository::boxed(pool.clone());
        (pool, UserService::new(user_repo, session_repo))
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("leo.tolstoy+blog@ya-ru_1").is_ok());
        assert!(validate_username("Лев").is_ok());
        assert!(validate_username("").is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("semi;colon").is_err());
        assert!(validate_username(&"a".repeat(150)).is_ok());
        assert!(validate_username(&"a".repeat(151)).is_err());
    }

    #[tokio::test]
    async fn test_register_user() {
        let (_pool, service) = setup_test_service().await;

        let user = service
            .register(RegisterInput::new("leo", "war-and-peace"))
            .await
            .expect("Failed to register");

        assert_eq!(user.username, "leo");
        assert!(user.password_hash.starts_with("$argon2id$"));
        assert_ne!(user.password_hash, "war-and-peace");
    }

    #[tokio::test]
    async fn test_register_duplicate_username_fails() {
        let (_pool, service) = setup_test_service().await;
        service
            .register(RegisterInput::new("leo", "war-and-peace"))
            .await
            .unwrap();

        let result = service.register(RegisterInput::new("leo", "anna-karenina")).await;
        assert!(matches!(result, Err(UserServiceError::UserExists(_))));
    }

    #[tokio::test]
    async fn test_register_rejects_bad_input() {
        let (_pool, service) = setup_test_service().await;

        let bad_name = service.register(RegisterInput::new("no spaces", "war-and-peace")).await;
        assert!(matches!(bad_name, Err(UserServiceError::ValidationError(_))));

        let short = service.register(RegisterInput::new("leo", "short")).await;
        assert!(matches!(short, Err(UserServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_login_roundtrip() {
        let (_pool, service) = setup_test_service().await;
        let registered = service
            .register(RegisterInput::new("leo", "war-and-peace"))
            .await
            .unwrap();

        let session = service
            .login(LoginInput::new("leo", "war-and-peace"))
            .await
            .expect("Login should succeed");
        let user = service
            .validate_session(&session.id)
            .await
            .unwrap()
            .expect("Session should resolve to a user");

        assert_eq!(user.id, registered.id);
        assert_eq!(session.expires_at - session.created_at, Duration::days(14));
    }

    #[tokio::test]
    async fn test_login_wrong_password_fails() {
        let (_pool, service) = setup_test_service().await;
        service
            .register(RegisterInput::new("leo", "war-and-peace"))
            .await
            .unwrap();

        let result = service.login(LoginInput::new("leo", "anna-karenina")).await;
        assert!(matches!(result, Err(UserServiceError::AuthenticationError(_))));
    }

    #[tokio::test]
    async fn test_login_unknown_user_fails() {
        let (_pool, service) = setup_test_service().await;
        let result = service.login(LoginInput::new("ghost", "war-and-peace")).await;
        assert!(matches!(result, Err(UserServiceError::AuthenticationError(_))));
    }

    #[tokio::test]
    async fn test_expired_session_is_anonymous_and_removed() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let session_repo = SqlxSessionRepository::boxed(pool.clone());
        let service = UserService::with_session_expiration(
            SqlxUserRepository::boxed(pool.clone()),
            session_repo.clone(),
            -1,
        );
        service
            .register(RegisterInput::new("leo", "war-and-peace"))
            .await
            .unwrap();
        let session = service
            .login(LoginInput::new("leo", "war-and-peace"))
            .await
            .unwrap();

        assert!(service.validate_session(&session.id).await.unwrap().is_none());
        assert!(session_repo.get_by_token(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_logout_invalidates_session() {
        let (_pool, service) = setup_test_service().await;
        service
            .register(RegisterInput::new("leo", "war-and-peace"))
            .await
            .unwrap();
        let session = service
            .login(LoginInput::new("leo", "war-and-peace"))
            .await
            .unwrap();

        service.logout(&session.id).await.expect("Logout should succeed");
        assert!(service.validate_session(&session.id).await.unwrap().is_none());

        // Logging out twice is harmless
        service.logout(&session.id).await.expect("Logout should succeed");
    }

    #[tokio::test]
    async fn test_update_profile() {
        let (_pool, service) = setup_test_service().await;
        let user = service
            .register(RegisterInput::new("leo", "war-and-peace"))
            .await
            .unwrap();

        let updated = service
            .update_profile(
                user.id,
                UpdateProfileInput {
                    username: "lev".to_string(),
                    first_name: "Lev".to_string(),
                    last_name: "Tolstoy".to_string(),
                    email: "lev@example.com".to_string(),
                },
            )
            .await
            .expect("Failed to update profile");

        assert_eq!(updated.username, "lev");
        let stored = service.get_by_username("lev").await.unwrap().unwrap();
        assert_eq!(stored.last_name, "Tolstoy");
        assert!(service.get_by_username("leo").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_profile_rejects_taken_username() {
        let (_pool, service) = setup_test_service().await;
        let leo = service
            .register(RegisterInput::new("leo", "war-and-peace"))
            .await
            .unwrap();
        service
            .register(RegisterInput::new("anna", "war-and-peace"))
            .await
            .unwrap();

        let result = service
            .update_profile(
                leo.id,
                UpdateProfileInput {
                    username: "anna".to_string(),
                    ..UpdateProfileInput::default()
                },
            )
            .await;
        assert!(matches!(result, Err(UserServiceError::UserExists(_))));

        // Keeping one's own username is fine
        let result = service
            .update_profile(
                leo.id,
                UpdateProfileInput {
                    username: "leo".to_string(),
                    ..UpdateProfileInput::default()
                },
            )
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_cleanup_expired_sessions() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let service = UserService::with_session_expiration(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool.clone()),
            -1,
        );
        service
            .register(RegisterInput::new("leo", "war-and-peace"))
            .await
            .unwrap();
        service.login(LoginInput::new("leo", "war-and-peace")).await.unwrap();
        service.login(LoginInput::new("leo", "war-and-peace")).await.unwrap();

        assert_eq!(service.cleanup_expired_sessions().await.unwrap(), 2);
    }
}
