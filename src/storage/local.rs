//! Local filesystem storage implementation.
//!
//! Checkpoints are written atomically (write to temp, then rename) so an
//! interrupted run can never leave a half-written state file behind. A state
//! file that fails to parse is treated as absent rather than fatal: the
//! watcher restarts from an empty checkpoint instead of wedging.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::Checkpoint;
use crate::storage::CheckpointStore;

/// Local filesystem storage backend.
#[derive(Clone)]
pub struct LocalStorage {
    root_dir: PathBuf,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// State file key for a handle.
    fn state_key(handle: &str) -> String {
        format!("state-{handle}.json")
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        self.ensure_dir(&path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read JSON data.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl CheckpointStore for LocalStorage {
    async fn load(&self, handle: &str) -> Result<Checkpoint> {
        let key = Self::state_key(handle);
        match self.read_json::<Checkpoint>(&key).await {
            Ok(Some(checkpoint)) => Ok(checkpoint),
            Ok(None) => Ok(Checkpoint::default()),
            Err(AppError::Json(error)) => {
                log::warn!("State file {key} is unreadable ({error}), starting over");
                Ok(Checkpoint::default())
            }
            Err(error) => Err(error),
        }
    }

    async fn save(&self, handle: &str, checkpoint: &Checkpoint) -> Result<()> {
        self.write_json(&Self::state_key(handle), checkpoint).await
    }
}
