//! Filesystem-backed object store for single-process deployments.
//!
//! Stands in for the external blob service: objects land under
//! `<base_dir>/<bucket>/<object>`.

use std::path::PathBuf;

use async_trait::async_trait;

use compass_core::{ObjectStore, Result};

pub struct FsObjectStore {
    base_dir: PathBuf,
}

impl FsObjectStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Create from `COMPASS_BLOB_DIR` (default `./blob-store`).
    pub fn from_env() -> Self {
        let base_dir =
            std::env::var("COMPASS_BLOB_DIR").unwrap_or_else(|_| "./blob-store".to_string());
        Self::new(base_dir)
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put(&self, local_path: &str, bucket: &str, object: &str) -> Result<()> {
        let bucket_dir = self.base_dir.join(bucket);
        tokio::fs::create_dir_all(&bucket_dir).await?;
        tokio::fs::copy(local_path, bucket_dir.join(object)).await?;
        Ok(())
    }
}
