//! Registration and login forms

use super::{required, FormErrors, REQUIRED};
use crate::services::password::validate_password;
use crate::services::user::{validate_username, LoginInput, RegisterInput};
use serde::{Deserialize, Serialize};

/// Registration form; passwords are never echoed back
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationForm {
    pub username: String,
    #[serde(skip_serializing)]
    pub password1: String,
    #[serde(skip_serializing)]
    pub password2: String,
}

impl RegistrationForm {
    pub fn validate(&self) -> Result<RegisterInput, FormErrors> {
        let mut errors = FormErrors::new();

        let username = self.username.trim();
        if let Err(message) = validate_username(username) {
            errors.add("username", message);
        }

        if self.password1.is_empty() {
            errors.add("password1", REQUIRED);
        }
        if self.password2.is_empty() {
            errors.add("password2", REQUIRED);
        } else if !self.password1.is_empty() {
            if self.password1 != self.password2 {
                errors.add("password2", "The two password fields didn't match.");
            } else {
                for problem in validate_password(&self.password2, username) {
                    errors.add("password2", problem);
                }
            }
        }

        errors.into_result(RegisterInput::new(username, self.password1.clone()))
    }
}

/// Login form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub next: Option<String>,
}

impl LoginForm {
    pub fn validate(&self) -> Result<LoginInput, FormErrors> {
        let mut errors = FormErrors::new();
        let username = required(&mut errors, "username", &self.username);
        if self.password.is_empty() {
            errors.add("password", REQUIRED);
        }
        errors.into_result(LoginInput::new(username, self.password.clone()))
    }

    /// Where to go after a successful login
    pub fn redirect_target(&self) -> &str {
        match self.next.as_deref() {
            Some(next) if is_safe_redirect(next) => next,
            _ => "/",
        }
    }

    /// Message shown for bad credentials
    pub fn invalid_credentials() -> FormErrors {
        let mut errors = FormErrors::new();
        errors.add_non_field(
            "Please enter a correct username and password. Note that both fields may be case-sensitive.",
        );
        errors
    }
}

/// A redirect target must be a path on this site.
pub fn is_safe_redirect(target: &str) -> bool {
    target.starts_with('/')
        && !target.starts_with("//")
        && !target.starts_with("/\\")
        && !target.chars().any(|c| c.is_control())
}
