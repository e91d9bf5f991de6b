//! Page lookup for listings
//!
//! The `?page=` query value is resolved leniently: a missing or
//! non-numeric value is page 1, and any number outside `1..=num_pages`
//! (zero and negatives included) is the last page.

use crate::models::{num_pages, ListParams};
use std::num::IntErrorKind;

/// Fixed page size for every post listing
pub const POSTS_PER_PAGE: u32 = 10;

/// Resolves raw page requests against a known total
#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    per_page: u32,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(POSTS_PER_PAGE)
    }
}

impl Paginator {
    pub fn new(per_page: u32) -> Self {
        Self {
            per_page: per_page.max(1),
        }
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Turn the raw query value into the page to fetch for `total` items.
    pub fn resolve(&self, raw: Option<&str>, total: i64) -> ListParams {
        let last = num_pages(total, self.per_page);
        let page = match raw.map(|s| s.trim().parse::<i64>()) {
            Some(Ok(n)) if (1..=i64::from(last)).contains(&n) => n as u32,
            Some(Ok(_)) => last,
            // Numbers too large to parse are out of range all the same
            Some(Err(e)) if matches!(e.kind(), IntErrorKind::PosOverflow | IntErrorKind::NegOverflow) => last,
            _ => 1,
        };
        ListParams::new(page, self.per_page)
    }
}
