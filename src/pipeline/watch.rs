//! One watch cycle per handle: load checkpoint, fetch, reconcile, deliver,
//! persist. The checkpoint only advances after the whole batch for a handle
//! has been delivered, so a failed run is retried in full on the next cycle.

use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::models::{Checkpoint, Config};
use crate::pipeline::reconcile::select_new;
use crate::services::{FetchSource, MirrorClient, WebhookNotifier};
use crate::storage::CheckpointStore;

/// Summary of one handle's cycle.
#[derive(Debug)]
pub struct WatchOutcome {
    pub handle: String,
    /// Posts in the fetched window.
    pub fetched: usize,
    /// Posts delivered this cycle.
    pub delivered: usize,
    /// Checkpoint id after the cycle.
    pub last_id: Option<String>,
}

/// Run one watch cycle for a single handle.
///
/// With `dry_run` set, fetching and reconciliation run normally but nothing
/// is delivered and the checkpoint is left untouched.
pub async fn run_watch(
    fetcher: &MirrorClient,
    notifier: &WebhookNotifier,
    storage: &dyn CheckpointStore,
    handle: &str,
    dry_run: bool,
) -> Result<WatchOutcome> {
    let checkpoint = storage.load(handle).await?;
    log::info!(
        "@{handle}: checkpoint {}",
        checkpoint.last_id.as_deref().unwrap_or("(none)")
    );

    let outcome = fetcher.fetch_recent(handle).await?;
    match &outcome.source {
        FetchSource::Mirror(base) => log::info!(
            "@{handle}: {} recent posts via {base} ({} of {} mirrors failed)",
            outcome.posts.len(),
            outcome.mirrors_failed,
            outcome.mirrors_tried,
        ),
        FetchSource::RenderProxy => log::info!(
            "@{handle}: {} recent posts via render proxy after {} mirrors failed",
            outcome.posts.len(),
            outcome.mirrors_failed,
        ),
    }

    let new_posts = select_new(&outcome.posts, checkpoint.last_id.as_deref());
    let Some(newest) = new_posts.last().map(|post| post.id.clone()) else {
        log::info!("@{handle}: nothing new");
        return Ok(WatchOutcome {
            handle: handle.to_string(),
            fetched: outcome.posts.len(),
            delivered: 0,
            last_id: checkpoint.last_id,
        });
    };

    if dry_run {
        for post in &new_posts {
            log::info!("@{handle}: would deliver {} ({})", post.id, post.url);
        }
        return Ok(WatchOutcome {
            handle: handle.to_string(),
            fetched: outcome.posts.len(),
            delivered: 0,
            last_id: checkpoint.last_id,
        });
    }

    let delivered = notifier.notify_all(&new_posts).await?;

    let next = Checkpoint::advance(newest);
    storage.save(handle, &next).await?;
    log::info!(
        "@{handle}: delivered {delivered} posts, checkpoint now {}",
        next.last_id.as_deref().unwrap_or("(none)")
    );

    Ok(WatchOutcome {
        handle: handle.to_string(),
        fetched: outcome.posts.len(),
        delivered,
        last_id: next.last_id,
    })
}

/// Run one watch cycle for every configured handle, in order.
///
/// Handles are independent: a failing handle is logged and counted while the
/// rest still run. The cycle as a whole errors if any handle failed.
pub async fn run_all(
    config: Arc<Config>,
    storage: &dyn CheckpointStore,
    dry_run: bool,
) -> Result<Vec<WatchOutcome>> {
    let fetcher = MirrorClient::new(Arc::clone(&config))?;
    let notifier = WebhookNotifier::new(Arc::clone(&config))?;

    let total = config.watch.handles.len();
    let mut outcomes = Vec::with_capacity(total);
    let mut failed = 0usize;

    for handle in &config.watch.handles {
        match run_watch(&fetcher, &notifier, storage, handle, dry_run).await {
            Ok(outcome) => outcomes.push(outcome),
            Err(error) => {
                failed += 1;
                log::error!("@{handle}: cycle failed: {error}");
            }
        }
    }

    if failed > 0 {
        return Err(AppError::RunFailures { failed, total });
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalStorage;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const HANDLE: &str = "somebody";

    fn profile_html(ids: &[&str]) -> String {
        let rows: String = ids
            .iter()
            .map(|id| format!(r#"<a class="tweet-link" href="/{HANDLE}/status/{id}#m"></a>"#))
            .collect();
        format!("<html><body><div class=\"timeline\">{rows}</div></body></html>")
    }

    fn test_config(server: &MockServer) -> Arc<Config> {
        let mut config = Config::default();
        config.watch.handles = vec![HANDLE.to_string()];
        config.fetch.mirrors = vec![format!("{}/m1", server.uri())];
        config.fetch.render_proxy = String::new();
        config.notify.webhook_url = format!("{}/hook", server.uri());
        Arc::new(config)
    }

    async fn mount_mirror(server: &MockServer, ids: &[&str]) {
        Mock::given(method("GET"))
            .and(path(format!("/m1/{HANDLE}")))
            .respond_with(ResponseTemplate::new(200).set_body_string(profile_html(ids)))
            .mount(server)
            .await;
    }

    fn services(config: &Arc<Config>) -> (MirrorClient, WebhookNotifier) {
        (
            MirrorClient::new(Arc::clone(config)).unwrap(),
            WebhookNotifier::new(Arc::clone(config)).unwrap(),
        )
    }

    async fn seed_checkpoint(storage: &LocalStorage, id: &str) {
        let checkpoint = Checkpoint {
            last_id: Some(id.to_string()),
            updated_at: None,
        };
        storage.save(HANDLE, &checkpoint).await.unwrap();
    }

    fn delivered_ids(requests: &[wiremock::Request]) -> Vec<String> {
        requests
            .iter()
            .filter(|request| request.url.path() == "/hook")
            .map(|request| {
                let payload: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
                payload["embeds"][0]["url"]
                    .as_str()
                    .unwrap()
                    .rsplit('/')
                    .next()
                    .unwrap()
                    .to_string()
            })
            .collect()
    }

    #[tokio::test]
    async fn test_catch_up_delivers_oldest_first_and_advances_checkpoint() {
        let server = MockServer::start().await;
        mount_mirror(&server, &["103", "102", "101", "100"]).await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(204))
            .expect(3)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        seed_checkpoint(&storage, "100").await;

        let config = test_config(&server);
        let (fetcher, notifier) = services(&config);
        let outcome = run_watch(&fetcher, &notifier, &storage, HANDLE, false)
            .await
            .unwrap();

        assert_eq!(outcome.fetched, 4);
        assert_eq!(outcome.delivered, 3);
        assert_eq!(outcome.last_id.as_deref(), Some("103"));

        let requests = server.received_requests().await.unwrap();
        assert_eq!(delivered_ids(&requests), vec!["101", "102", "103"]);

        let saved = storage.load(HANDLE).await.unwrap();
        assert_eq!(saved.last_id.as_deref(), Some("103"));
        assert!(saved.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_nothing_new_leaves_checkpoint_untouched() {
        let server = MockServer::start().await;
        mount_mirror(&server, &["103", "102", "101"]).await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        seed_checkpoint(&storage, "103").await;
        let before = std::fs::read(dir.path().join("state-somebody.json")).unwrap();

        let config = test_config(&server);
        let (fetcher, notifier) = services(&config);
        let outcome = run_watch(&fetcher, &notifier, &storage, HANDLE, false)
            .await
            .unwrap();

        assert_eq!(outcome.delivered, 0);
        assert_eq!(outcome.last_id.as_deref(), Some("103"));

        let after = std::fs::read(dir.path().join("state-somebody.json")).unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_first_run_delivers_only_the_newest() {
        let server = MockServer::start().await;
        mount_mirror(&server, &["103", "102", "101"]).await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());

        let config = test_config(&server);
        let (fetcher, notifier) = services(&config);
        let outcome = run_watch(&fetcher, &notifier, &storage, HANDLE, false)
            .await
            .unwrap();

        assert_eq!(outcome.delivered, 1);
        assert_eq!(outcome.last_id.as_deref(), Some("103"));

        let requests = server.received_requests().await.unwrap();
        assert_eq!(delivered_ids(&requests), vec!["103"]);
    }

    #[tokio::test]
    async fn test_delivery_failure_keeps_old_checkpoint() {
        let server = MockServer::start().await;
        mount_mirror(&server, &["103", "102", "101", "100"]).await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        seed_checkpoint(&storage, "100").await;

        let config = test_config(&server);
        let (fetcher, notifier) = services(&config);
        let error = run_watch(&fetcher, &notifier, &storage, HANDLE, false)
            .await
            .unwrap_err();

        assert!(matches!(error, AppError::Delivery { .. }));
        let saved = storage.load(HANDLE).await.unwrap();
        assert_eq!(saved.last_id.as_deref(), Some("100"));
    }

    #[tokio::test]
    async fn test_fetch_failure_writes_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/m1/{HANDLE}")))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());

        let config = test_config(&server);
        let (fetcher, notifier) = services(&config);
        let error = run_watch(&fetcher, &notifier, &storage, HANDLE, false)
            .await
            .unwrap_err();

        assert!(matches!(error, AppError::PostsNotFound { .. }));
        assert!(!dir.path().join("state-somebody.json").exists());
    }

    #[tokio::test]
    async fn test_dry_run_delivers_nothing_and_writes_nothing() {
        let server = MockServer::start().await;
        mount_mirror(&server, &["103", "102", "101"]).await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());
        seed_checkpoint(&storage, "101").await;

        let config = test_config(&server);
        let (fetcher, notifier) = services(&config);
        let outcome = run_watch(&fetcher, &notifier, &storage, HANDLE, true)
            .await
            .unwrap();

        assert_eq!(outcome.delivered, 0);
        assert_eq!(outcome.last_id.as_deref(), Some("101"));

        let saved = storage.load(HANDLE).await.unwrap();
        assert_eq!(saved.last_id.as_deref(), Some("101"));
    }

    #[tokio::test]
    async fn test_run_all_continues_past_failing_handle() {
        let server = MockServer::start().await;
        // First handle's mirror path serves errors, second one works.
        Mock::given(method("GET"))
            .and(path("/m1/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/m1/healthy"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<a class="tweet-link" href="/healthy/status/7#m"></a>"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());

        let mut config = Config::default();
        config.watch.handles = vec!["broken".to_string(), "healthy".to_string()];
        config.fetch.mirrors = vec![format!("{}/m1", server.uri())];
        config.fetch.render_proxy = String::new();
        config.notify.webhook_url = format!("{}/hook", server.uri());

        let error = run_all(Arc::new(config), &storage, false).await.unwrap_err();
        match error {
            AppError::RunFailures { failed, total } => {
                assert_eq!(failed, 1);
                assert_eq!(total, 2);
            }
            other => panic!("expected RunFailures, got {other:?}"),
        }

        // The healthy handle still advanced its own checkpoint.
        let saved = storage.load("healthy").await.unwrap();
        assert_eq!(saved.last_id.as_deref(), Some("7"));
        assert!(!dir.path().join("state-broken.json").exists());
    }
}
