//! Utility functions and helpers.

pub mod http;

use url::Url;

use crate::error::{AppError, Result};

/// Build the profile page URL for a handle on a mirror.
///
/// The handle is appended as a single percent-encoded path segment.
pub fn profile_url(mirror_base: &str, handle: &str) -> Result<String> {
    let mut url = Url::parse(mirror_base)?;
    url.path_segments_mut()
        .map_err(|_| AppError::config(format!("Mirror URL cannot be a base: {mirror_base}")))?
        .pop_if_empty()
        .push(handle);
    Ok(url.to_string())
}

/// Build the render-proxy URL wrapping a target page.
///
/// Proxies of the r.jina.ai family take the full target URL as their path.
pub fn render_proxy_url(proxy_base: &str, target: &str) -> String {
    format!("{}/{}", proxy_base.trim_end_matches('/'), target)
}
