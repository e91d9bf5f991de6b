//! Form layer
//!
//! Each form is a plain struct holding the submitted strings exactly as
//! typed, so an invalid submission can be rendered back unchanged. Its
//! `validate` method turns it into a typed input or a [`FormErrors`] map.
//!
//! Checks that need the database (username taken, category exists) run in
//! the services; handlers fold those failures back into [`FormErrors`].

pub mod auth;
pub mod comment;
pub mod post;
pub mod profile;

pub use auth::{is_safe_redirect, LoginForm, RegistrationForm};
pub use comment::CommentForm;
pub use post::{parse_pub_date, PostFields, PostForm};
pub use profile::ProfileForm;

use serde::Serialize;
use std::collections::BTreeMap;

/// Message for a missing required field
pub const REQUIRED: &str = "This field is required.";

/// Key for errors that belong to the form as a whole
pub const NON_FIELD_ERRORS: &str = "__all__";

/// Validation messages keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message against `field`
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    /// Record a message against the whole form
    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.add(NON_FIELD_ERRORS, message);
    }

    /// Shorthand for a form with one error
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages recorded against `field`
    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    /// Append every message from `other`
    pub fn merge(&mut self, other: FormErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    /// `Ok(value)` when nothing was recorded
    pub fn into_result<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

/// Trim a required field, recording an error when it is blank.
fn required<'a>(errors: &mut FormErrors, field: &str, value: &'a str) -> &'a str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.add(field, REQUIRED);
    }
    trimmed
}

/// Record an error when `value` is longer than `max` characters.
fn max_length(errors: &mut FormErrors, field: &str, value: &str, max: usize) {
    let len = value.chars().count();
    if len > max {
        errors.add(
            field,
            format!(
                "Ensure this value has at most {} characters (it has {}).",
                max, len
            ),
        );
    }
}
