//! Post form
//!
//! Fields: title, text, pub_date, category, location and an optional image.
//! The image itself travels beside the form (it is a multipart upload);
//! `image_clear` asks for the current image to be dropped on edit.

use super::{max_length, required, FormErrors, REQUIRED};
use crate::models::{PostInput, PostWithMeta};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Longest accepted title
pub const MAX_TITLE_LENGTH: usize = 256;

const CHOICE_INVALID: &str = "Select a valid choice. That choice is not one of the available choices.";

/// Accepted `pub_date` layouts besides a bare date
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Submitted post fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostForm {
    pub title: String,
    pub text: String,
    pub pub_date: String,
    pub category: String,
    pub location: String,
    pub image_clear: bool,
}

/// Validated post fields, before the image is attached
#[derive(Debug, Clone, PartialEq)]
pub struct PostFields {
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub category_id: i64,
    pub location_id: Option<i64>,
    pub image_clear: bool,
}

impl PostFields {
    pub fn into_input(self, image: Option<String>) -> PostInput {
        PostInput {
            title: self.title,
            text: self.text,
            pub_date: self.pub_date,
            category_id: self.category_id,
            location_id: self.location_id,
            image,
        }
    }
}

impl PostForm {
    /// Prefill the form from a stored post
    pub fn from_post(post: &PostWithMeta) -> Self {
        Self {
            title: post.post.title.clone(),
            text: post.post.text.clone(),
            pub_date: post.post.pub_date.format("%Y-%m-%dT%H:%M").to_string(),
            category: post.post.category_id.map(|id| id.to_string()).unwrap_or_default(),
            location: post.post.location_id.map(|id| id.to_string()).unwrap_or_default(),
            image_clear: false,
        }
    }

    /// Message shown when the chosen category does not exist
    pub fn unknown_category() -> FormErrors {
        FormErrors::single("category", CHOICE_INVALID)
    }

    /// Message shown when the chosen location does not exist
    pub fn unknown_location() -> FormErrors {
        FormErrors::single("location", CHOICE_INVALID)
    }

    pub fn validate(&self) -> Result<PostFields, FormErrors> {
        let mut errors = FormErrors::new();

        let title = required(&mut errors, "title", &self.title);
        max_length(&mut errors, "title", title, MAX_TITLE_LENGTH);
        let text = required(&mut errors, "text", &self.text);

        let pub_date = match self.pub_date.trim() {
            "" => {
                errors.add("pub_date", REQUIRED);
                None
            }
            raw => {
                let parsed = parse_pub_date(raw);
                if parsed.is_none() {
                    errors.add("pub_date", "Enter a valid date/time.");
                }
                parsed
            }
        };

        let category_id = match self.category.trim() {
            "" => {
                errors.add("category", REQUIRED);
                None
            }
            raw => {
                let parsed = raw.parse::<i64>().ok();
                if parsed.is_none() {
                    errors.add("category", CHOICE_INVALID);
                }
                parsed
            }
        };

        let location_id = match self.location.trim() {
            "" => None,
            raw => {
                let parsed = raw.parse::<i64>().ok();
                if parsed.is_none() {
                    errors.add("location", CHOICE_INVALID);
                }
                parsed
            }
        };

        match (pub_date, category_id) {
            (Some(pub_date), Some(category_id)) if errors.is_empty() => Ok(PostFields {
                title: title.to_string(),
                text: text.to_string(),
                pub_date,
                category_id,
                location_id,
                image_clear: self.image_clear,
            }),
            _ => Err(errors),
        }
    }
}

/// Parse a publication date as typed into the form, interpreted as UTC.
///
/// A bare date means midnight.
pub fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}
