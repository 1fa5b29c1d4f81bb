//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Environment variable holding the webhook URL (kept out of the config file).
pub const ENV_WEBHOOK: &str = "DISCORD_WEBHOOK";
/// Environment variable overriding the watched handles (comma-separated).
pub const ENV_HANDLES: &str = "WATCH_HANDLES";
/// Environment variable overriding the mirror list (comma-separated).
pub const ENV_MIRRORS: &str = "NITTER_LIST";

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// What to watch
    #[serde(default)]
    pub watch: WatchConfig,

    /// Mirror fetching behavior
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Webhook delivery settings
    #[serde(default)]
    pub notify: NotifyConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Apply overrides from the process environment.
    ///
    /// `DISCORD_WEBHOOK` and the comma-separated `WATCH_HANDLES` /
    /// `NITTER_LIST` beat whatever the config file says.
    pub fn apply_env_overrides(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    fn apply_env_from(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(webhook) = get(ENV_WEBHOOK) {
            self.notify.webhook_url = webhook.trim().to_string();
        }
        if let Some(handles) = get(ENV_HANDLES) {
            self.watch.handles = split_list(&handles);
        }
        if let Some(mirrors) = get(ENV_MIRRORS) {
            self.fetch.mirrors = split_list(&mirrors);
        }
    }

    /// Validate configuration values for basic sanity.
    ///
    /// Failing here is fatal before any network activity happens.
    pub fn validate(&self) -> Result<()> {
        if self.watch.handles.is_empty() {
            return Err(AppError::config(format!(
                "No handles to watch (set watch.handles or {ENV_HANDLES})"
            )));
        }
        for handle in &self.watch.handles {
            if !is_valid_handle(handle) {
                return Err(AppError::config(format!(
                    "Invalid handle '{handle}' (expected 1-15 chars of [A-Za-z0-9_])"
                )));
            }
        }
        if self.watch.max_items == 0 {
            return Err(AppError::config("watch.max_items must be > 0"));
        }
        if self.fetch.mirrors.is_empty() {
            return Err(AppError::config("fetch.mirrors must not be empty"));
        }
        for mirror in &self.fetch.mirrors {
            url::Url::parse(mirror)
                .map_err(|e| AppError::config(format!("Invalid mirror URL '{mirror}': {e}")))?;
        }
        if self.fetch.timeout_secs == 0 {
            return Err(AppError::config("fetch.timeout_secs must be > 0"));
        }
        if self.fetch.user_agent.trim().is_empty() {
            return Err(AppError::config("fetch.user_agent is empty"));
        }
        if !self.fetch.render_proxy.is_empty() {
            url::Url::parse(&self.fetch.render_proxy).map_err(|e| {
                AppError::config(format!(
                    "Invalid render proxy URL '{}': {e}",
                    self.fetch.render_proxy
                ))
            })?;
        }
        if self.notify.webhook_url.trim().is_empty() {
            return Err(AppError::config(format!(
                "No webhook URL (set notify.webhook_url or {ENV_WEBHOOK})"
            )));
        }
        Ok(())
    }
}

/// Which profiles to watch and how far back to look.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Handles to watch, without the leading `@`
    #[serde(default)]
    pub handles: Vec<String>,

    /// How many recent posts to inspect per run
    #[serde(default = "defaults::max_items")]
    pub max_items: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            handles: Vec::new(),
            max_items: defaults::max_items(),
        }
    }
}

/// Mirror selection and HTTP behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Mirror base URLs, tried left to right
    #[serde(default = "defaults::mirrors")]
    pub mirrors: Vec<String>,

    /// Request timeout in seconds (per mirror attempt)
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Text-render proxy tried once after every mirror failed.
    /// An empty string disables the fallback.
    #[serde(default = "defaults::render_proxy")]
    pub render_proxy: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            mirrors: defaults::mirrors(),
            timeout_secs: defaults::timeout(),
            user_agent: defaults::user_agent(),
            render_proxy: defaults::render_proxy(),
        }
    }
}

/// Webhook delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Webhook target URL. Usually supplied via DISCORD_WEBHOOK instead
    /// of being written into the config file.
    #[serde(default)]
    pub webhook_url: String,

    /// Message line sent with each post ({id}, {author}, {url})
    #[serde(default = "defaults::message_template")]
    pub message_template: String,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            message_template: defaults::message_template(),
        }
    }
}

/// Check a handle against the platform rules: 1-15 chars of [A-Za-z0-9_].
pub fn is_valid_handle(handle: &str) -> bool {
    !handle.is_empty()
        && handle.len() <= 15
        && handle
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Split a comma-separated list, trimming blanks.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

mod defaults {
    // Fetch defaults
    pub fn mirrors() -> Vec<String> {
        vec![
            "https://nitter.net".into(),
            "https://nitter.poast.org".into(),
            "https://n.opnxng.com".into(),
        ]
    }
    pub fn timeout() -> u64 {
        8
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120 Safari/537.36".into()
    }
    pub fn render_proxy() -> String {
        "https://r.jina.ai".into()
    }

    // Watch defaults
    pub fn max_items() -> usize {
        5
    }

    // Notify defaults
    pub fn message_template() -> String {
        "New post from @{author}: {url}".into()
    }
}
