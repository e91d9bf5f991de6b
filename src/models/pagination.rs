//! Pagination types shared by listings

use serde::Serialize;

/// Resolved page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListParams {
    /// Page number (1-indexed)
    pub page: u32,
    /// Items per page
    pub per_page: u32,
}

impl ListParams {
    pub fn new(page: u32, per_page: u32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    /// Row offset for SQL queries
    pub fn offset(&self) -> i64 {
        ((self.page - 1) as i64) * (self.per_page as i64)
    }

    /// Row limit for SQL queries
    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

/// One page of a listing, as handed to templates
#[derive(Debug, Clone, Serialize)]
pub struct PagedResult<T> {
    /// Items in the current page
    pub items: Vec<T>,
    /// Total number of items across all pages
    pub total: i64,
    /// Current page number (1-indexed)
    pub page: u32,
    /// Number of items per page
    pub per_page: u32,
    /// Number of pages, never less than one
    pub num_pages: u32,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, params: &ListParams) -> Self {
        let num_pages = num_pages(total, params.per_page);
        Self {
            items,
            total,
            page: params.page,
            per_page: params.per_page,
            num_pages,
            has_next: params.page < num_pages,
            has_previous: params.page > 1,
        }
    }
}

/// Number of pages needed for `total` items; an empty listing still has one page
pub fn num_pages(total: i64, per_page: u32) -> u32 {
    let per_page = per_page.max(1) as i64;
    let total = total.max(0);
    ((total + per_page - 1) / per_page).max(1) as u32
}
