//! Profile fetching with mirror failover.
//!
//! Mirrors are tried strictly in configured order. A mirror that errors,
//! answers non-2xx, or yields a page with no recognizable posts is logged
//! and skipped; it is not retried within the run. When every mirror is
//! exhausted, one pass through the render proxy gets a last chance before
//! the handle's run fails.

use std::sync::Arc;

use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::{Config, Post};
use crate::services::extract;
use crate::utils::{self, http};

/// Where a successful fetch came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchSource {
    /// A mirror served the profile page.
    Mirror(String),
    /// The render proxy served a text rendering of the profile.
    RenderProxy,
}

/// Result of one fetch pass for a handle.
#[derive(Debug)]
pub struct FetchOutcome {
    /// Recent posts, newest first, unique, capped at the window size.
    pub posts: Vec<Post>,
    pub source: FetchSource,
    /// Mirrors attempted, including a successful one.
    pub mirrors_tried: usize,
    /// Mirrors that failed before a source succeeded.
    pub mirrors_failed: usize,
}

/// Fetches recent posts for watched handles through mirror instances.
pub struct MirrorClient {
    config: Arc<Config>,
    client: Client,
}

impl MirrorClient {
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let client = http::create_async_client(&config.fetch)?;
        Ok(Self { config, client })
    }

    /// Fetch the recent-post window for a handle.
    ///
    /// The first source that yields at least one post wins. Returns
    /// [`AppError::PostsNotFound`] when every mirror and the render proxy
    /// come up empty.
    pub async fn fetch_recent(&self, handle: &str) -> Result<FetchOutcome> {
        let max_items = self.config.watch.max_items;
        let mut failed = 0usize;

        for base in &self.config.fetch.mirrors {
            match self.try_mirror(base, handle, max_items).await {
                Ok(posts) if !posts.is_empty() => {
                    return Ok(FetchOutcome {
                        posts,
                        source: FetchSource::Mirror(base.clone()),
                        mirrors_tried: failed + 1,
                        mirrors_failed: failed,
                    });
                }
                Ok(_) => {
                    failed += 1;
                    log::warn!("Mirror {base} had no recognizable posts for @{handle}");
                }
                Err(error) => {
                    failed += 1;
                    log::warn!("Mirror {base} failed for @{handle}: {error}");
                }
            }
        }

        if let Some(posts) = self.try_render_proxy(handle, max_items).await {
            if !posts.is_empty() {
                return Ok(FetchOutcome {
                    posts,
                    source: FetchSource::RenderProxy,
                    mirrors_tried: failed,
                    mirrors_failed: failed,
                });
            }
        }

        Err(AppError::posts_not_found(handle, failed))
    }

    async fn try_mirror(&self, base: &str, handle: &str, max_items: usize) -> Result<Vec<Post>> {
        let url = utils::profile_url(base, handle)?;
        let html = self.fetch_text(&url).await?;
        let posts = extract::extract_posts(handle, &html, max_items);

        log::debug!(
            "[{base}] title=\"{}\" len={} first_id={} href={}",
            extract::page_title(&html),
            html.len(),
            posts.first().map_or("-", |post| post.id.as_str()),
            posts.first().map_or("-", |post| post.url.as_str()),
        );

        Ok(posts)
    }

    /// Last resort. The proxy renders the primary mirror's profile page to
    /// text, so only the raw pattern scan applies. Proxy errors are absorbed
    /// into the overall not-found outcome.
    async fn try_render_proxy(&self, handle: &str, max_items: usize) -> Option<Vec<Post>> {
        let proxy = self.config.fetch.render_proxy.trim();
        if proxy.is_empty() {
            return None;
        }
        let primary = self.config.fetch.mirrors.first()?;
        let target = utils::profile_url(primary, handle).ok()?;
        let url = utils::render_proxy_url(proxy, &target);

        log::info!("All mirrors exhausted for @{handle}, trying render proxy");
        match self.fetch_text(&url).await {
            Ok(text) => Some(extract::scan_raw(handle, &text, max_items)),
            Err(error) => {
                log::warn!("Render proxy failed for @{handle}: {error}");
                None
            }
        }
    }

    async fn fetch_text(&self, url: &str) -> Result<String> {
        let text = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(text)
    }
}
