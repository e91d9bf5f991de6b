//! Comment form
//!
//! Only the text is accepted; the author and post come from the request.

use super::{required, FormErrors};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentForm {
    pub text: String,
}

impl CommentForm {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// The comment text, trimmed
    pub fn validate(&self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::new();
        let text = required(&mut errors, "text", &self.text).to_string();
        errors.into_result(text)
    }
}
