//! Location service

use crate::db::repositories::LocationRepository;
use crate::models::{CreateLocationInput, Location};
use anyhow::{Context, Result};
use std::sync::Arc;

/// Location service
pub struct LocationService {
    repo: Arc<dyn LocationRepository>,
}

impl LocationService {
    pub fn new(repo: Arc<dyn LocationRepository>) -> Self {
        Self { repo }
    }

    pub async fn create(&self, input: CreateLocationInput) -> Result<Location> {
        anyhow::ensure!(!input.name.trim().is_empty(), "Location name cannot be empty");
        self.repo.create(&input).await.context("Failed to create location")
    }

    /// All locations, ordered by name
    pub async fn list(&self) -> Result<Vec<Location>> {
        self.repo.list().await.context("Failed to list locations")
    }
}
