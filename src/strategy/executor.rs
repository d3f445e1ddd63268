//! Cache-first, network-first and stale-while-revalidate executors.
//!
//! Every executor records exactly one hit or miss per request: a hit when
//! the reply body came from the store, a miss otherwise. Transient upstream
//! failures absorbed by a cache fallback are not counted as errors.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::{StrategyConfig, StrategyKind};
use crate::cache::{CacheEntry, CacheStats, NamespaceNames, SharedStore};
use crate::error::{CacheError, Result};
use crate::models::{HttpResponse, InterceptedRequest, InterceptedResponse, ResponseSource};
use crate::network::{FetchMode, Fetcher};
use crate::tasks::RevalidatePool;

/// Stores a 2xx response under `key` with a fresh timestamp, then evicts
/// the namespace back within `max_entries`.
///
/// Storage failures are logged and counted; they never fail the caller.
pub(crate) async fn write_through(
    store: &SharedStore,
    stats: &CacheStats,
    namespace: &str,
    key: String,
    response: &HttpResponse,
    max_entries: usize,
) -> bool {
    if !response.is_success() {
        debug!("Not caching {} (status {})", key, response.status);
        return false;
    }

    let entry = CacheEntry::new(key, response.clone());
    let result = store
        .write()
        .await
        .put_bounded(namespace, entry, max_entries);
    match result {
        Ok(evicted) => {
            if evicted > 0 {
                debug!("Evicted {} entries from {}", evicted, namespace);
            }
            true
        }
        Err(e) => {
            warn!("Failed to store response in {}: {}", namespace, e);
            stats.record_error();
            false
        }
    }
}

/// Runs the strategy selected for a request against the store and upstream.
#[derive(Clone)]
pub struct StrategyExecutor {
    store: SharedStore,
    fetcher: Arc<dyn Fetcher>,
    stats: Arc<CacheStats>,
    names: NamespaceNames,
    pool: RevalidatePool,
}

impl StrategyExecutor {
    pub fn new(
        store: SharedStore,
        fetcher: Arc<dyn Fetcher>,
        stats: Arc<CacheStats>,
        names: NamespaceNames,
        pool: RevalidatePool,
    ) -> Self {
        Self {
            store,
            fetcher,
            stats,
            names,
            pool,
        }
    }

    pub async fn execute(
        &self,
        request: &InterceptedRequest,
        config: &StrategyConfig,
    ) -> Result<InterceptedResponse> {
        let namespace = self.names.name(config.partition);
        match config.kind {
            StrategyKind::CacheFirst => self.cache_first(request, config, &namespace).await,
            StrategyKind::NetworkFirst => self.network_first(request, config, &namespace).await,
            StrategyKind::StaleWhileRevalidate => {
                self.stale_while_revalidate(request, config, &namespace)
                    .await
            }
        }
    }

    // == Cache First ==
    async fn cache_first(
        &self,
        request: &InterceptedRequest,
        config: &StrategyConfig,
        namespace: &str,
    ) -> Result<InterceptedResponse> {
        let key = request.cache_key();
        let cached = self.lookup(namespace, &key).await;

        if let Some(entry) = &cached {
            if entry.is_fresh(config.max_age) {
                self.stats.record_hit();
                return Ok(InterceptedResponse::new(
                    entry.to_response(),
                    ResponseSource::Cache,
                ));
            }
        }

        match self.fetch(request).await {
            Ok(response) => {
                self.stats.record_miss();
                self.store_response(namespace, key, &response, config).await;
                Ok(InterceptedResponse::new(response, ResponseSource::Network))
            }
            Err(err) => self.fall_back(cached, err, &key),
        }
    }

    // == Network First ==
    async fn network_first(
        &self,
        request: &InterceptedRequest,
        config: &StrategyConfig,
        namespace: &str,
    ) -> Result<InterceptedResponse> {
        let key = request.cache_key();
        let outcome = match config.network_timeout {
            Some(limit) => self.fetch_within(request, limit).await,
            None => self.fetch(request).await,
        };

        match outcome {
            Ok(response) => {
                self.stats.record_miss();
                self.store_response(namespace, key, &response, config).await;
                Ok(InterceptedResponse::new(response, ResponseSource::Network))
            }
            Err(err) => {
                let cached = self.lookup(namespace, &key).await;
                self.fall_back(cached, err, &key)
            }
        }
    }

    // == Stale While Revalidate ==
    async fn stale_while_revalidate(
        &self,
        request: &InterceptedRequest,
        config: &StrategyConfig,
        namespace: &str,
    ) -> Result<InterceptedResponse> {
        let key = request.cache_key();

        if let Some(entry) = self.lookup(namespace, &key).await {
            self.stats.record_hit();
            self.revalidate(request.clone(), namespace.to_string(), config.max_entries);
            return Ok(InterceptedResponse::new(
                entry.to_response(),
                ResponseSource::Cache,
            ));
        }

        self.stats.record_miss();
        match self.fetch(request).await {
            Ok(response) => {
                self.store_response(namespace, key, &response, config).await;
                Ok(InterceptedResponse::new(response, ResponseSource::Network))
            }
            Err(err) => {
                self.stats.record_error();
                Err(err)
            }
        }
    }

    /// Detached refresh of an entry that was just served.
    ///
    /// Failures leave the existing entry untouched and are not reported.
    fn revalidate(&self, request: InterceptedRequest, namespace: String, max_entries: usize) {
        let store = Arc::clone(&self.store);
        let fetcher = Arc::clone(&self.fetcher);
        let stats = Arc::clone(&self.stats);
        let url = request.url.clone();

        let spawned = self.pool.spawn(async move {
            stats.record_network_call();
            match fetcher.fetch(&request, FetchMode::Default).await {
                Ok(response) => {
                    write_through(
                        &store,
                        &stats,
                        &namespace,
                        request.cache_key(),
                        &response,
                        max_entries,
                    )
                    .await;
                }
                Err(e) => debug!("Revalidation of {} failed: {}", request.url, e),
            }
        });
        if !spawned {
            debug!("Revalidation pool saturated, skipping {}", url);
        }
    }

    async fn lookup(&self, namespace: &str, key: &str) -> Option<CacheEntry> {
        self.store.read().await.get(namespace, key)
    }

    async fn fetch(&self, request: &InterceptedRequest) -> Result<HttpResponse> {
        self.stats.record_network_call();
        self.fetcher.fetch(request, FetchMode::Default).await
    }

    /// Races the upstream call against `limit`.
    ///
    /// The call runs on its own task so a late answer is simply dropped
    /// when the timer wins; it is never written to the store.
    async fn fetch_within(
        &self,
        request: &InterceptedRequest,
        limit: Duration,
    ) -> Result<HttpResponse> {
        self.stats.record_network_call();
        let fetcher = Arc::clone(&self.fetcher);
        let request = request.clone();
        let call = tokio::spawn(async move { fetcher.fetch(&request, FetchMode::Default).await });

        match tokio::time::timeout(limit, call).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(CacheError::Network(format!(
                "Upstream task failed: {}",
                join_err
            ))),
            Err(_) => Err(CacheError::Timeout(limit)),
        }
    }

    async fn store_response(
        &self,
        namespace: &str,
        key: String,
        response: &HttpResponse,
        config: &StrategyConfig,
    ) {
        write_through(
            &self.store,
            &self.stats,
            namespace,
            key,
            response,
            config.max_entries,
        )
        .await;
    }

    /// Serves whatever the store holds after an upstream failure.
    fn fall_back(
        &self,
        cached: Option<CacheEntry>,
        err: CacheError,
        key: &str,
    ) -> Result<InterceptedResponse> {
        match cached {
            Some(entry) if err.is_transient() => {
                debug!("Upstream failed for {} ({}), serving cached copy", key, err);
                self.stats.record_hit();
                Ok(InterceptedResponse::new(
                    entry.to_response(),
                    ResponseSource::StaleCache,
                ))
            }
            _ => {
                warn!("No cached fallback for {}: {}", key, err);
                self.stats.record_miss();
                self.stats.record_error();
                Err(err)
            }
        }
    }
}
