//! Visibility and ownership checks
//!
//! Every read of a single post goes through [`Visibility::check`] and every
//! mutation of a post, comment or profile goes through [`Ownership::check`].
//! Nothing here is cached; callers evaluate the checks on each request with
//! the request's own `now`.

use crate::models::{PostWithMeta, User};
use chrono::{DateTime, Utc};

/// Outcome of the visibility check for one viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

impl Visibility {
    /// A post is visible to everyone when it is published, its category is
    /// published and its publication date has passed. The author sees it
    /// regardless.
    pub fn check(post: &PostWithMeta, viewer: Option<&User>, now: DateTime<Utc>) -> Self {
        if post.is_publicly_visible(now) {
            return Visibility::Visible;
        }
        match Ownership::check(post.post.author_id, viewer) {
            Ownership::Owner => Visibility::Visible,
            Ownership::NotOwner => Visibility::Hidden,
        }
    }

    pub fn is_visible(self) -> bool {
        self == Visibility::Visible
    }
}

/// Outcome of the ownership check for one actor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Owner,
    NotOwner,
}

impl Ownership {
    /// Anonymous viewers never own anything.
    pub fn check(author_id: i64, viewer: Option<&User>) -> Self {
        match viewer {
            Some(user) if user.id == author_id => Ownership::Owner,
            _ => Ownership::NotOwner,
        }
    }

    pub fn is_owner(self) -> bool {
        self == Ownership::Owner
    }
}
