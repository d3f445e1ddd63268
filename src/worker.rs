//! Cache Worker
//!
//! Single dispatcher that owns the store, the stats context and the sync
//! manager, and exposes the four entry points the hosting application uses.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};
use url::Url;

use crate::cache::{CacheStats, CacheStore, NamespaceNames, SharedStore};
use crate::config::Config;
use crate::control::ControlChannel;
use crate::error::{CacheError, Result};
use crate::lifecycle::{LifecycleManager, LifecycleState};
use crate::models::{
    ControlMessage, ControlReply, InterceptedRequest, InterceptedResponse, ResponseSource,
};
use crate::network::{FetchMode, Fetcher, HttpFetcher};
use crate::strategy::{strategy_for, Classifier, StrategyExecutor};
use crate::sync::{ActionQueue, FileActionQueue, MemoryActionQueue, QueuedAction, SyncManager};
use crate::tasks::RevalidatePool;

/// Events the hosting application drives the cache layer with.
#[async_trait]
pub trait WorkerEvents: Send + Sync {
    /// Provision and precache. Fatal on failure.
    async fn on_install(&self) -> Result<()>;

    /// Retire old namespaces and start intercepting.
    async fn on_activate(&self) -> Result<Vec<String>>;

    /// Handle one outgoing request.
    async fn intercept(&self, request: InterceptedRequest) -> Result<InterceptedResponse>;

    /// Handle one control message; `None` means no reply.
    async fn on_message(&self, message: ControlMessage) -> Option<ControlReply>;
}

pub struct CacheWorker {
    store: SharedStore,
    stats: Arc<CacheStats>,
    fetcher: Arc<dyn Fetcher>,
    names: NamespaceNames,
    upstream: Url,
    classifier: Classifier,
    executor: StrategyExecutor,
    lifecycle: LifecycleManager,
    sync: SyncManager,
    control: ControlChannel,
}

impl CacheWorker {
    /// Wires every component around one store and one stats context.
    pub fn new(
        config: &Config,
        fetcher: Arc<dyn Fetcher>,
        queue: Arc<dyn ActionQueue>,
    ) -> Result<Self> {
        let upstream = Url::parse(&config.upstream_url).map_err(|e| {
            CacheError::InvalidRequest(format!("Bad upstream url {}: {}", config.upstream_url, e))
        })?;
        let manifest = resolve_all(&upstream, &config.static_manifest)?;
        let critical = resolve_all(&upstream, &config.critical_endpoints)?;

        let store = CacheStore::new().shared();
        let stats = Arc::new(CacheStats::new());
        let names = NamespaceNames::new(config.product.clone(), config.version.clone());

        let executor = StrategyExecutor::new(
            Arc::clone(&store),
            Arc::clone(&fetcher),
            Arc::clone(&stats),
            names.clone(),
            RevalidatePool::new(config.revalidate_concurrency),
        );
        let lifecycle = LifecycleManager::new(
            Arc::clone(&store),
            Arc::clone(&fetcher),
            Arc::clone(&stats),
            names.clone(),
            manifest,
        );
        let sync = SyncManager::new(
            Arc::clone(&store),
            Arc::clone(&fetcher),
            Arc::clone(&stats),
            names.clone(),
            critical,
            queue,
            config.replay_max_attempts,
        );
        let control = ControlChannel::new(
            Arc::clone(&store),
            Arc::clone(&stats),
            sync.clone(),
            names.clone(),
        );

        Ok(Self {
            store,
            stats,
            fetcher,
            names,
            upstream,
            classifier: Classifier::new(config.static_manifest.clone()),
            executor,
            lifecycle,
            sync,
            control,
        })
    }

    /// Builds the worker with the reqwest client and the configured queue.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(config.request_timeout())?);
        let queue: Arc<dyn ActionQueue> = match &config.action_queue_path {
            Some(path) => Arc::new(FileActionQueue::open(path).await?),
            None => Arc::new(MemoryActionQueue::new()),
        };
        Self::new(config, fetcher, queue)
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn stats(&self) -> &Arc<CacheStats> {
        &self.stats
    }

    pub fn fetcher(&self) -> &Arc<dyn Fetcher> {
        &self.fetcher
    }

    pub fn names(&self) -> &NamespaceNames {
        &self.names
    }

    pub fn upstream(&self) -> &Url {
        &self.upstream
    }

    pub fn sync(&self) -> &SyncManager {
        &self.sync
    }

    pub fn control(&self) -> &ControlChannel {
        &self.control
    }

    pub fn lifecycle_state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Forwards a request untouched. Failed mutations are queued for replay.
    async fn pass_through(&self, request: InterceptedRequest) -> Result<InterceptedResponse> {
        self.stats.record_network_call();
        match self.fetcher.fetch(&request, FetchMode::Default).await {
            Ok(response) => Ok(InterceptedResponse::new(
                response,
                ResponseSource::Passthrough,
            )),
            Err(err) => {
                self.stats.record_error();
                if err.is_transient() && request.is_http() && !request.is_get() {
                    self.queue_for_replay(&request).await;
                }
                Err(err)
            }
        }
    }

    async fn queue_for_replay(&self, request: &InterceptedRequest) {
        let Some(action) = QueuedAction::from_request(request) else {
            warn!("Not queueing {} {}: body is not text", request.method, request.url);
            return;
        };
        let id = action.id.clone();
        match self.sync.queue().enqueue(action).await {
            Ok(true) => debug!("Queued {} {} as {}", request.method, request.url, id),
            Ok(false) => debug!("Action {} already queued", id),
            Err(e) => {
                warn!("Could not queue {}: {}", id, e);
                self.stats.record_error();
            }
        }
    }
}

#[async_trait]
impl WorkerEvents for CacheWorker {
    async fn on_install(&self) -> Result<()> {
        self.lifecycle.install().await
    }

    async fn on_activate(&self) -> Result<Vec<String>> {
        self.lifecycle.activate().await
    }

    async fn intercept(&self, request: InterceptedRequest) -> Result<InterceptedResponse> {
        if !request.is_http() || !request.is_get() || !self.lifecycle.is_active() {
            return self.pass_through(request).await;
        }

        let class = self
            .classifier
            .classify(request.url.path(), request.destination);
        let config = strategy_for(class);
        debug!("{} {} classified as {}", request.method, request.url, class);

        self.executor.execute(&request, config).await
    }

    async fn on_message(&self, message: ControlMessage) -> Option<ControlReply> {
        self.control.handle(message).await
    }
}

fn resolve_all(base: &Url, paths: &[String]) -> Result<Vec<Url>> {
    paths
        .iter()
        .map(|path| {
            base.join(path).map_err(|e| {
                CacheError::InvalidRequest(format!("Cannot resolve {} against {}: {}", path, base, e))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::mock::MockFetcher;
    use crate::sync::SyncTag;

    const UPSTREAM: &str = "https://app.test";

    fn config() -> Config {
        Config {
            upstream_url: UPSTREAM.to_string(),
            static_manifest: vec!["/".to_string(), "/index.html".to_string()],
            critical_endpoints: vec!["/api/config".to_string()],
            ..Config::default()
        }
    }

    fn worker(fetcher: Arc<MockFetcher>) -> (CacheWorker, Arc<MemoryActionQueue>) {
        let queue = Arc::new(MemoryActionQueue::new());
        let worker = CacheWorker::new(&config(), fetcher, queue.clone()).unwrap();
        (worker, queue)
    }

    async fn activated(fetcher: &Arc<MockFetcher>) -> (CacheWorker, Arc<MemoryActionQueue>) {
        fetcher.respond("https://app.test/", 200, "root");
        fetcher.respond("https://app.test/index.html", 200, "index");
        let (worker, queue) = worker(fetcher.clone());
        worker.on_install().await.unwrap();
        worker.on_activate().await.unwrap();
        (worker, queue)
    }

    fn get(url: &str) -> InterceptedRequest {
        InterceptedRequest::get(Url::parse(url).unwrap())
    }

    #[tokio::test]
    async fn test_static_asset_served_from_precache() {
        let fetcher = MockFetcher::new();
        let (worker, _) = activated(&fetcher).await;

        let reply = worker.intercept(get("https://app.test/index.html")).await.unwrap();

        assert_eq!(reply.source, ResponseSource::Cache);
        assert_eq!(reply.response.body, "index");
        assert_eq!(fetcher.calls_to("https://app.test/index.html"), 1);
    }

    #[tokio::test]
    async fn test_requests_before_activation_pass_through() {
        let fetcher = MockFetcher::new();
        fetcher.respond("https://app.test/api/items", 200, "items");
        let (worker, _) = worker(fetcher);

        let reply = worker.intercept(get("https://app.test/api/items")).await.unwrap();

        assert_eq!(reply.source, ResponseSource::Passthrough);
        assert!(worker.store().read().await.is_empty());
    }

    #[tokio::test]
    async fn test_non_http_request_bypasses_cache_after_activation() {
        let fetcher = MockFetcher::new();
        let (worker, queue) = activated(&fetcher).await;
        fetcher.respond("ftp://app.test/api/readme.txt", 200, "text");

        let reply = worker
            .intercept(get("ftp://app.test/api/readme.txt"))
            .await
            .unwrap();

        assert_eq!(reply.source, ResponseSource::Passthrough);
        assert_eq!(reply.response.body, "text");
        let store = worker.store().read().await;
        assert_eq!(store.namespace_names(), vec!["relay-v1-static"]);
        assert_eq!(store.len("relay-v1-static"), 2);
        let snap = worker.stats().snapshot();
        assert_eq!(snap.hits + snap.misses, 0);
        drop(store);

        fetcher.fail("ftp://app.test/api/readme.txt");
        let request = InterceptedRequest::new("PUT", Url::parse("ftp://app.test/api/readme.txt").unwrap());
        assert!(worker.intercept(request).await.is_err());
        assert!(queue.pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_api_request_is_network_first() {
        let fetcher = MockFetcher::new();
        let (worker, _) = activated(&fetcher).await;
        fetcher.respond("https://app.test/api/items", 200, "items");

        let reply = worker.intercept(get("https://app.test/api/items")).await.unwrap();
        assert_eq!(reply.source, ResponseSource::Network);

        fetcher.fail("https://app.test/api/items");
        let reply = worker.intercept(get("https://app.test/api/items")).await.unwrap();
        assert_eq!(reply.source, ResponseSource::StaleCache);
        assert_eq!(reply.response.body, "items");
    }

    #[tokio::test]
    async fn test_images_land_in_dynamic_namespace() {
        let fetcher = MockFetcher::new();
        let (worker, _) = activated(&fetcher).await;
        fetcher.respond("https://app.test/images/logo.png", 200, "png");

        worker
            .intercept(get("https://app.test/images/logo.png"))
            .await
            .unwrap();

        assert_eq!(worker.store().read().await.len("relay-v1-dynamic"), 1);
    }

    #[tokio::test]
    async fn test_non_get_bypasses_cache() {
        let fetcher = MockFetcher::new();
        let (worker, _) = activated(&fetcher).await;
        fetcher.respond("https://app.test/api/todos", 201, "created");

        let request = InterceptedRequest::new("POST", Url::parse("https://app.test/api/todos").unwrap())
            .with_body("{}");
        let reply = worker.intercept(request).await.unwrap();

        assert_eq!(reply.source, ResponseSource::Passthrough);
        assert_eq!(worker.store().read().await.len("relay-v1-api"), 0);
    }

    #[tokio::test]
    async fn test_failed_mutation_queued_then_replayed() {
        let fetcher = MockFetcher::new();
        let (worker, queue) = activated(&fetcher).await;
        fetcher.fail("https://app.test/api/todos");

        let request = InterceptedRequest::new("POST", Url::parse("https://app.test/api/todos").unwrap())
            .with_header("Idempotency-Key", "todo-1")
            .with_body(r#"{"title":"milk"}"#);
        assert!(worker.intercept(request.clone()).await.is_err());
        assert!(worker.intercept(request).await.is_err());
        assert_eq!(queue.pending().await.unwrap().len(), 1);

        fetcher.respond("https://app.test/api/todos", 201, "");
        let report = worker.sync().run(SyncTag::UserActions).await;

        assert_eq!(report.succeeded, 1);
        assert!(queue.pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_on_message_delegates_to_control() {
        let fetcher = MockFetcher::new();
        let (worker, _) = activated(&fetcher).await;

        let reply = worker.on_message(ControlMessage::GetStats).await;
        assert!(matches!(reply, Some(ControlReply::Stats(_))));

        let reply = worker
            .on_message(ControlMessage::Unknown("PING".to_string()))
            .await;
        assert!(reply.is_none());
    }

    #[test]
    fn test_bad_upstream_rejected() {
        let cfg = Config {
            upstream_url: "not a url".to_string(),
            ..Config::default()
        };
        let result = CacheWorker::new(
            &cfg,
            MockFetcher::new(),
            Arc::new(MemoryActionQueue::new()),
        );
        assert!(result.is_err());
    }
}
