//! Filesystem storage for uploaded map images.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use agrimap_core::{defaults, ImageStore, Result};

/// [`ImageStore`] writing uploads under a base directory.
///
/// Callers are expected to pass an already-sanitized filename; this store
/// only joins it onto the base directory and writes the bytes.
pub struct FilesystemImageStore {
    base_dir: PathBuf,
}

impl FilesystemImageStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Create from `AGRIMAP_UPLOAD_DIR`, falling back to the default
    /// upload directory.
    pub fn from_env() -> Self {
        let dir = std::env::var(defaults::ENV_UPLOAD_DIR)
            .unwrap_or_else(|_| defaults::UPLOAD_DIR.to_string());
        Self::new(dir)
    }
}

#[async_trait]
impl ImageStore for FilesystemImageStore {
    async fn save(&self, filename: &str, data: &[u8]) -> Result<String> {
        tokio::fs::create_dir_all(&self.base_dir).await?;

        let path = self.base_dir.join(filename);
        tokio::fs::write(&path, data).await?;

        debug!(path = %path.display(), bytes = data.len(), "Stored map image");
        Ok(path.to_string_lossy().into_owned())
    }
}
