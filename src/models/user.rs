//! User model
//!
//! A registered account. Users author posts and comments; the username is
//! also the public profile address.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User entity representing a registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Username (unique)
    pub username: String,
    /// First name (may be empty)
    pub first_name: String,
    /// Last name (may be empty)
    pub last_name: String,
    /// Email address (may be empty)
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Registration timestamp
    pub date_joined: DateTime<Utc>,
}

impl User {
    /// "First Last", or the username when neither name is set
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

/// Input for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUserInput {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Already hashed with `services::password::hash_password`
    pub password_hash: String,
}

impl CreateUserInput {
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            password_hash: password_hash.into(),
        }
    }
}

/// Editable profile fields
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UpdateProfileInput {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}
