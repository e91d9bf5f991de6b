//! Profile form
//!
//! Username rules are shared with registration; uniqueness among other
//! users is checked by `UserService::update_profile`.

use super::{max_length, FormErrors};
use crate::models::{UpdateProfileInput, User};
use crate::services::user::{validate_username, MAX_USERNAME_LENGTH};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Message for a username that belongs to someone else
pub const USERNAME_TAKEN: &str = "A user with that username already exists.";

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap_or_else(|e| panic!("email pattern: {}", e))
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileForm {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl ProfileForm {
    pub fn from_user(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
        }
    }

    pub fn validate(&self) -> Result<UpdateProfileInput, FormErrors> {
        let mut errors = FormErrors::new();

        let username = self.username.trim();
        if let Err(message) = validate_username(username) {
            errors.add("username", message);
        }
        let first_name = self.first_name.trim();
        max_length(&mut errors, "first_name", first_name, MAX_USERNAME_LENGTH);
        let last_name = self.last_name.trim();
        max_length(&mut errors, "last_name", last_name, MAX_USERNAME_LENGTH);

        let email = self.email.trim();
        if !email.is_empty() && !EMAIL_RE.is_match(email) {
            errors.add("email", "Enter a valid email address.");
        }

        errors.into_result(UpdateProfileInput {
            username: username.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
        })
    }
}
