//! Service layer for the watcher.
//!
//! - `extract`: post extraction from mirror profile HTML
//! - `fetch`: mirror failover and profile fetching
//! - `notify`: webhook delivery

pub mod extract;
mod fetch;
mod notify;

pub use fetch::{FetchOutcome, FetchSource, MirrorClient};
pub use notify::WebhookNotifier;
