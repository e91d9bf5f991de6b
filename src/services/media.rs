//! Media storage for post images
//!
//! Uploaded files are checked against the configured MIME types and size
//! limit, then written under `{media.path}/posts_images/` with a random name.
//! Posts store the path relative to the media root; it is served under
//! `/media/`.

use crate::config::MediaConfig;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// Subdirectory of the media root holding post images
pub const POST_IMAGES_DIR: &str = "posts_images";

/// URL prefix the media root is served under
pub const MEDIA_URL: &str = "/media/";

/// Error types for media operations
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    /// MIME type not in the allowed list
    #[error("Invalid file type: {0}")]
    InvalidType(String),

    /// Upload larger than the configured limit
    #[error("File too large. Maximum size: {max} bytes")]
    TooLarge { max: u64 },

    /// Filesystem failure
    #[error("Failed to store file: {0}")]
    Io(#[from] std::io::Error),
}

/// Writes and removes uploaded images below the media root
#[derive(Debug, Clone)]
pub struct MediaStore {
    config: MediaConfig,
}

impl MediaStore {
    pub fn new(config: MediaConfig) -> Self {
        Self { config }
    }

    pub fn root(&self) -> &Path {
        &self.config.path
    }

    /// Largest accepted upload in bytes
    pub fn max_file_size(&self) -> u64 {
        self.config.max_file_size
    }

    /// Check an upload before anything is written.
    pub fn validate(&self, content_type: &str, size: usize) -> Result<(), MediaError> {
        if !self.config.is_type_allowed(content_type) {
            return Err(MediaError::InvalidType(content_type.to_string()));
        }
        if size as u64 > self.config.max_file_size {
            return Err(MediaError::TooLarge {
                max: self.config.max_file_size,
            });
        }
        Ok(())
    }

    /// Store an image and return its path relative to the media root.
    pub async fn save_post_image(&self, content_type: &str, data: &[u8]) -> Result<String, MediaError> {
        self.validate(content_type, data.len())?;

        let dir = self.config.path.join(POST_IMAGES_DIR);
        fs::create_dir_all(&dir).await?;

        let name = format!("{}.{}", Uuid::new_v4(), self.config.get_extension(content_type));
        fs::write(dir.join(&name), data).await?;

        let relative = format!("{}/{}", POST_IMAGES_DIR, name);
        tracing::debug!(path = %relative, size = data.len(), "Stored post image");
        Ok(relative)
    }

    /// Remove a stored file. Missing files and paths escaping the media
    /// root are ignored.
    pub async fn remove(&self, relative: &str) {
        let Some(path) = self.resolve(relative) else {
            tracing::warn!(path = %relative, "Refusing to remove path outside media root");
            return;
        };
        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %path.display(), "Failed to remove media file: {}", e),
        }
    }

    /// Public URL of a stored file
    pub fn url(&self, relative: &str) -> String {
        format!("{}{}", MEDIA_URL, relative)
    }

    fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let rel = Path::new(relative);
        rel.components()
            .all(|c| matches!(c, Component::Normal(_)))
            .then(|| self.config.path.join(rel))
    }
}
