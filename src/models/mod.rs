// src/models/mod.rs

//! Domain models for the watcher application.

mod checkpoint;
mod config;
mod post;

// Re-export all public types
pub use checkpoint::Checkpoint;
pub use config::{
    Config, ENV_HANDLES, ENV_MIRRORS, ENV_WEBHOOK, FetchConfig, NotifyConfig, WatchConfig,
    is_valid_handle, split_list,
};
pub use post::Post;
