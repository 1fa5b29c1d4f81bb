//! Storage abstractions for checkpoint persistence.
//!
//! Each watched handle owns one small JSON state file next to the
//! configuration:
//!
//! ```text
//! {root}/
//! ├── watch.toml            # Watcher configuration
//! ├── state-somebody.json   # Checkpoint for @somebody
//! └── state-other.json      # Checkpoint for @other
//! ```

pub mod local;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Checkpoint;

pub use local::LocalStorage;

/// Trait for checkpoint storage backends.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Load the checkpoint for a handle. Absent and unreadable state both
    /// default to the empty checkpoint.
    async fn load(&self, handle: &str) -> Result<Checkpoint>;

    /// Persist the checkpoint for a handle.
    async fn save(&self, handle: &str, checkpoint: &Checkpoint) -> Result<()>;
}
