//! Blogicum - a multi-user blog
//!
//! Users publish posts filed under categories and locations, comment on
//! each other's posts and browse paginated listings. Server-rendered HTML
//! only.

pub mod config;
pub mod db;
pub mod forms;
pub mod models;
pub mod services;
pub mod theme;
pub mod web;
