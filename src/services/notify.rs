//! Webhook delivery of discovered posts.

use std::sync::Arc;

use reqwest::Client;
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::{Config, Post};
use crate::utils::http;

/// A Discord-style rich embed.
#[derive(Debug, Serialize)]
struct Embed {
    title: String,
    url: String,
    description: String,
}

/// Webhook request body: one content line plus one embed per post.
#[derive(Debug, Serialize)]
struct WebhookPayload {
    content: String,
    embeds: Vec<Embed>,
}

/// Delivers posts to the configured webhook, one request per post.
pub struct WebhookNotifier {
    config: Arc<Config>,
    client: Client,
}

impl WebhookNotifier {
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let client = http::create_async_client(&config.fetch)?;
        Ok(Self { config, client })
    }

    /// Deliver a single post. Non-2xx responses become
    /// [`AppError::Delivery`] with the response body preserved.
    pub async fn notify(&self, post: &Post) -> Result<()> {
        let payload = WebhookPayload {
            content: post.format(&self.config.notify.message_template),
            embeds: vec![Embed {
                title: format!("New post from @{}", post.author),
                url: post.url.clone(),
                description: post.url.clone(),
            }],
        };

        let response = self
            .client
            .post(&self.config.notify.webhook_url)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::delivery(status.as_u16(), body));
        }

        Ok(())
    }

    /// Deliver posts in slice order, one request at a time, aborting on the
    /// first failure. Arrival order is part of the contract, and webhook
    /// endpoints rate-limit bursts.
    pub async fn notify_all(&self, posts: &[Post]) -> Result<usize> {
        let mut delivered = 0;
        for post in posts {
            self.notify(post).await?;
            delivered += 1;
            log::info!("Delivered post {} by @{}", post.id, post.author);
        }
        Ok(delivered)
    }
}
