//! Lifecycle Manager
//!
//! `installing → installed → activating → active`
//!
//! Install precaches the static manifest into the static namespace in one
//! all-or-nothing write. Activation retires every product namespace from an
//! older version. Interception only starts once the state is `Active`.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tracing::{info, warn};
use url::Url;

use crate::cache::{CacheEntry, CacheStats, NamespaceNames, Partition, SharedStore};
use crate::error::{CacheError, Result};
use crate::models::InterceptedRequest;
use crate::network::{FetchMode, Fetcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Installing = 0,
    Installed = 1,
    Activating = 2,
    Active = 3,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleState::Installing => write!(f, "installing"),
            LifecycleState::Installed => write!(f, "installed"),
            LifecycleState::Activating => write!(f, "activating"),
            LifecycleState::Active => write!(f, "active"),
        }
    }
}

/// Atomic wrapper for LifecycleState.
#[derive(Debug)]
struct AtomicLifecycleState(AtomicU8);

impl AtomicLifecycleState {
    fn new(state: LifecycleState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    fn load(&self) -> LifecycleState {
        match self.0.load(Ordering::SeqCst) {
            0 => LifecycleState::Installing,
            1 => LifecycleState::Installed,
            2 => LifecycleState::Activating,
            _ => LifecycleState::Active,
        }
    }

    fn store(&self, state: LifecycleState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }
}

pub struct LifecycleManager {
    store: SharedStore,
    fetcher: Arc<dyn Fetcher>,
    stats: Arc<CacheStats>,
    names: NamespaceNames,
    manifest: Vec<Url>,
    state: AtomicLifecycleState,
}

impl LifecycleManager {
    pub fn new(
        store: SharedStore,
        fetcher: Arc<dyn Fetcher>,
        stats: Arc<CacheStats>,
        names: NamespaceNames,
        manifest: Vec<Url>,
    ) -> Self {
        Self {
            store,
            fetcher,
            stats,
            names,
            manifest,
            state: AtomicLifecycleState::new(LifecycleState::Installing),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state.load()
    }

    pub fn is_active(&self) -> bool {
        self.state() == LifecycleState::Active
    }

    // == Install ==
    /// Fetches every manifest asset, bypassing upstream caches, and stores
    /// them all at once. Any failure leaves the state at `Installing`.
    pub async fn install(&self) -> Result<()> {
        let state = self.state();
        if state != LifecycleState::Installing {
            return Err(CacheError::Provisioning(format!(
                "install called while {}",
                state
            )));
        }

        let namespace = self.names.name(Partition::Static);
        let mut entries = Vec::with_capacity(self.manifest.len());

        for url in &self.manifest {
            let request = InterceptedRequest::get(url.clone());
            self.stats.record_network_call();

            let response = self
                .fetcher
                .fetch(&request, FetchMode::Reload)
                .await
                .map_err(|e| self.provisioning_failed(url, e.to_string()))?;
            if !response.is_success() {
                return Err(self.provisioning_failed(url, format!("status {}", response.status)));
            }
            entries.push(CacheEntry::new(request.cache_key(), response));
        }

        {
            let mut store = self.store.write().await;
            store.open(&namespace);
            store
                .put_all(&namespace, entries)
                .map_err(|e| CacheError::Provisioning(e.to_string()))?;
        }

        self.state.store(LifecycleState::Installed);
        info!(
            "Installed {}: precached {} assets",
            namespace,
            self.manifest.len()
        );
        Ok(())
    }

    fn provisioning_failed(&self, url: &Url, reason: String) -> CacheError {
        warn!("Precache of {} failed: {}", url, reason);
        self.stats.record_error();
        CacheError::Provisioning(format!("{}: {}", url, reason))
    }

    // == Activate ==
    /// Deletes every product namespace that is not a current-version one.
    ///
    /// Returns the retired namespace names. Running it again against an
    /// already-clean store deletes nothing.
    pub async fn activate(&self) -> Result<Vec<String>> {
        let state = self.state();
        if !matches!(state, LifecycleState::Installed | LifecycleState::Active) {
            return Err(CacheError::Provisioning(format!(
                "activation blocked while {}",
                state
            )));
        }
        // From Active, interception carries on through the retirement pass
        if state == LifecycleState::Installed {
            self.state.store(LifecycleState::Activating);
        }

        let retired: Vec<String> = {
            let mut store = self.store.write().await;
            let retired: Vec<String> = store
                .namespace_names()
                .into_iter()
                .filter(|name| self.names.is_retired(name))
                .collect();
            for name in &retired {
                store.delete_namespace(name);
            }
            retired
        };

        for name in &retired {
            info!("Retired namespace {}", name);
        }
        self.state.store(LifecycleState::Active);
        info!("Cache layer active (version {})", self.names.version());
        Ok(retired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStore;
    use crate::models::HttpResponse;
    use crate::network::mock::MockFetcher;

    const ROOT: &str = "https://app.test/";
    const INDEX: &str = "https://app.test/index.html";

    fn manager(fetcher: Arc<MockFetcher>, store: SharedStore) -> LifecycleManager {
        LifecycleManager::new(
            store,
            fetcher,
            Arc::new(CacheStats::new()),
            NamespaceNames::new("relay", "v2"),
            vec![Url::parse(ROOT).unwrap(), Url::parse(INDEX).unwrap()],
        )
    }

    #[tokio::test]
    async fn test_install_precaches_manifest() {
        let fetcher = MockFetcher::new();
        fetcher.respond(ROOT, 200, "<html>");
        fetcher.respond(INDEX, 200, "<html>");
        let store = CacheStore::new().shared();
        let lifecycle = manager(fetcher.clone(), store.clone());

        lifecycle.install().await.unwrap();

        assert_eq!(lifecycle.state(), LifecycleState::Installed);
        assert_eq!(store.read().await.len("relay-v2-static"), 2);
        assert_eq!(fetcher.modes_for(ROOT), vec![FetchMode::Reload]);
    }

    #[tokio::test]
    async fn test_install_failure_blocks_activation() {
        let fetcher = MockFetcher::new();
        fetcher.respond(ROOT, 200, "<html>");
        fetcher.respond(INDEX, 404, "missing");
        let store = CacheStore::new().shared();
        let lifecycle = manager(fetcher, store.clone());

        let err = lifecycle.install().await.unwrap_err();
        assert!(matches!(err, CacheError::Provisioning(_)));
        assert_eq!(lifecycle.state(), LifecycleState::Installing);
        // Nothing half-written
        assert!(!store.read().await.has_namespace("relay-v2-static"));

        assert!(matches!(
            lifecycle.activate().await,
            Err(CacheError::Provisioning(_))
        ));
        assert!(!lifecycle.is_active());
    }

    #[tokio::test]
    async fn test_activate_retires_old_versions_only() {
        let fetcher = MockFetcher::new();
        fetcher.respond(ROOT, 200, "a");
        fetcher.respond(INDEX, 200, "b");
        let store = CacheStore::new().shared();
        {
            let mut guard = store.write().await;
            let old = CacheEntry::new("GET https://app.test/x", HttpResponse::new(200, "x"));
            guard.put("relay-v1-static", old.clone()).unwrap();
            guard.put("relay-v1-api", old.clone()).unwrap();
            guard.put("relay-v2-api", old.clone()).unwrap();
            guard.put("someone-else", old).unwrap();
        }
        let lifecycle = manager(fetcher, store.clone());
        lifecycle.install().await.unwrap();

        let retired = lifecycle.activate().await.unwrap();

        assert_eq!(retired, vec!["relay-v1-api", "relay-v1-static"]);
        assert!(lifecycle.is_active());
        assert_eq!(
            store.read().await.namespace_names(),
            vec!["relay-v2-api", "relay-v2-static", "someone-else"]
        );
    }

    #[tokio::test]
    async fn test_reactivation_deletes_nothing() {
        let fetcher = MockFetcher::new();
        fetcher.respond(ROOT, 200, "a");
        fetcher.respond(INDEX, 200, "b");
        let store = CacheStore::new().shared();
        let lifecycle = manager(fetcher, store.clone());
        lifecycle.install().await.unwrap();
        lifecycle.activate().await.unwrap();

        let retired = lifecycle.activate().await.unwrap();

        assert!(retired.is_empty());
        assert_eq!(store.read().await.namespace_names(), vec!["relay-v2-static"]);
    }

    #[tokio::test]
    async fn test_reactivation_stays_active_throughout() {
        let fetcher = MockFetcher::new();
        fetcher.respond(ROOT, 200, "a");
        fetcher.respond(INDEX, 200, "b");
        let store = CacheStore::new().shared();
        let lifecycle = Arc::new(manager(fetcher, store.clone()));
        lifecycle.install().await.unwrap();
        lifecycle.activate().await.unwrap();

        // Hold the store so the retirement pass blocks mid-activation
        let guard = store.write().await;
        let pending = {
            let lifecycle = Arc::clone(&lifecycle);
            tokio::spawn(async move { lifecycle.activate().await })
        };
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(lifecycle.state(), LifecycleState::Active);

        drop(guard);
        assert!(pending.await.unwrap().unwrap().is_empty());
        assert!(lifecycle.is_active());
    }

    #[tokio::test]
    async fn test_install_twice_rejected() {
        let fetcher = MockFetcher::new();
        fetcher.respond(ROOT, 200, "a");
        fetcher.respond(INDEX, 200, "b");
        let lifecycle = manager(fetcher, CacheStore::new().shared());
        lifecycle.install().await.unwrap();

        assert!(lifecycle.install().await.is_err());
        assert_eq!(lifecycle.state(), LifecycleState::Installed);
    }
}
