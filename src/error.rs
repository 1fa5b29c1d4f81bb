// src/error.rs

//! Unified error handling for the watcher application.

use thiserror::Error;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Every mirror and the render-proxy fallback came up empty
    #[error("no recent posts found for @{handle} ({mirrors_tried} mirrors tried)")]
    PostsNotFound { handle: String, mirrors_tried: usize },

    /// Webhook delivery was rejected by the receiving end
    #[error("webhook delivery failed with status {status}: {body}")]
    Delivery { status: u16, body: String },

    /// One or more handles failed during a multi-handle run
    #[error("{failed} of {total} watched handles failed")]
    RunFailures { failed: usize, total: usize },
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a not-found error for an exhausted handle.
    pub fn posts_not_found(handle: impl Into<String>, mirrors_tried: usize) -> Self {
        Self::PostsNotFound {
            handle: handle.into(),
            mirrors_tried,
        }
    }

    /// Create a delivery error from a webhook response.
    pub fn delivery(status: u16, body: impl Into<String>) -> Self {
        Self::Delivery {
            status,
            body: body.into(),
        }
    }
}
