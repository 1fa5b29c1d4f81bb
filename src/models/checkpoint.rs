// src/models/checkpoint.rs

//! Persisted checkpoint record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The last-delivered marker for one watched handle.
///
/// Serialized as `{"lastId": ..., "updatedAt": ...}` for compatibility with
/// state files written by earlier deployments of the watcher.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Checkpoint {
    /// Id of the newest post that has been delivered
    #[serde(rename = "lastId")]
    pub last_id: Option<String>,

    /// When the checkpoint was last advanced
    #[serde(rename = "updatedAt")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Checkpoint {
    /// Build a checkpoint pointing at the given post id, stamped now.
    pub fn advance(last_id: impl Into<String>) -> Self {
        Self {
            last_id: Some(last_id.into()),
            updated_at: Some(Utc::now()),
        }
    }

    /// True when no post has ever been delivered for this handle.
    pub fn is_empty(&self) -> bool {
        self.last_id.is_none()
    }
}
