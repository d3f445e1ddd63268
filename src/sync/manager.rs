//! Sync Manager
//!
//! Runs tag-triggered background work: the critical-data refresh and the
//! replay of queued user actions. Per-item failures are logged and counted
//! but never abort the rest of the batch.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use super::ActionQueue;
use crate::cache::{CacheStats, NamespaceNames, SharedStore};
use crate::error::{CacheError, Result};
use crate::models::InterceptedRequest;
use crate::network::{FetchMode, Fetcher};
use crate::strategy::{strategy_for, write_through, Classification};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncTag {
    /// Refetch every critical endpoint
    CriticalData,
    /// Replay queued user actions
    UserActions,
}

impl SyncTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncTag::CriticalData => "critical-data-sync",
            SyncTag::UserActions => "user-action-sync",
        }
    }
}

impl fmt::Display for SyncTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncTag {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "critical-data-sync" => Ok(SyncTag::CriticalData),
            "user-action-sync" => Ok(SyncTag::UserActions),
            other => Err(CacheError::Protocol(format!("Unknown sync tag: {}", other))),
        }
    }
}

/// Outcome of one sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub tag: SyncTag,
    pub succeeded: usize,
    pub failed: usize,
}

impl SyncReport {
    fn new(tag: SyncTag) -> Self {
        Self {
            tag,
            succeeded: 0,
            failed: 0,
        }
    }
}

/// Executes sync tasks against the shared store.
#[derive(Clone)]
pub struct SyncManager {
    store: SharedStore,
    fetcher: Arc<dyn Fetcher>,
    stats: Arc<CacheStats>,
    names: NamespaceNames,
    critical_urls: Arc<Vec<Url>>,
    queue: Arc<dyn ActionQueue>,
    max_attempts: u32,
    /// Held for the whole of a critical-data run
    critical_run: Arc<Mutex<()>>,
    /// Held for the whole of a replay run
    replay_run: Arc<Mutex<()>>,
}

impl SyncManager {
    pub fn new(
        store: SharedStore,
        fetcher: Arc<dyn Fetcher>,
        stats: Arc<CacheStats>,
        names: NamespaceNames,
        critical_urls: Vec<Url>,
        queue: Arc<dyn ActionQueue>,
        max_attempts: u32,
    ) -> Self {
        Self {
            store,
            fetcher,
            stats,
            names,
            critical_urls: Arc::new(critical_urls),
            queue,
            max_attempts: max_attempts.max(1),
            critical_run: Arc::new(Mutex::new(())),
            replay_run: Arc::new(Mutex::new(())),
        }
    }

    pub fn queue(&self) -> &Arc<dyn ActionQueue> {
        &self.queue
    }

    /// Schedules one run of `tag` and returns as soon as it is scheduled.
    ///
    /// Each call is one registration and yields exactly one run.
    pub fn register(&self, tag: SyncTag) -> JoinHandle<SyncReport> {
        debug!("Registered sync {}", tag);
        let manager = self.clone();
        tokio::spawn(async move { manager.run(tag).await })
    }

    /// Runs `tag` to completion on the current task.
    ///
    /// Runs of the same tag never overlap: a run registered while another
    /// is in flight waits for it, then works from the queue as it left it.
    pub async fn run(&self, tag: SyncTag) -> SyncReport {
        let lock = match tag {
            SyncTag::CriticalData => &self.critical_run,
            SyncTag::UserActions => &self.replay_run,
        };
        let _running = lock.lock().await;

        let report = match tag {
            SyncTag::CriticalData => self.sync_critical().await,
            SyncTag::UserActions => self.replay_actions().await,
        };
        self.stats.record_sync();
        info!(
            "Sync {} finished: {} succeeded, {} failed",
            tag, report.succeeded, report.failed
        );
        report
    }

    // == Critical Data ==
    async fn sync_critical(&self) -> SyncReport {
        let mut report = SyncReport::new(SyncTag::CriticalData);
        let config = strategy_for(Classification::Critical);
        let namespace = self.names.name(config.partition);

        for url in self.critical_urls.iter() {
            let request = InterceptedRequest::get(url.clone());
            self.stats.record_network_call();

            let stored = match self.fetcher.fetch(&request, FetchMode::Reload).await {
                Ok(response) if response.is_success() => {
                    write_through(
                        &self.store,
                        &self.stats,
                        &namespace,
                        request.cache_key(),
                        &response,
                        config.max_entries,
                    )
                    .await
                }
                Ok(response) => {
                    warn!("Critical sync of {} got status {}", url, response.status);
                    self.stats.record_error();
                    false
                }
                Err(e) => {
                    warn!("Critical sync of {} failed: {}", url, e);
                    self.stats.record_error();
                    false
                }
            };

            if stored {
                report.succeeded += 1;
            } else {
                report.failed += 1;
            }
        }
        report
    }

    // == User Actions ==
    async fn replay_actions(&self) -> SyncReport {
        let mut report = SyncReport::new(SyncTag::UserActions);
        let pending = match self.queue.pending().await {
            Ok(pending) => pending,
            Err(e) => {
                warn!("Could not read action queue: {}", e);
                self.stats.record_error();
                return report;
            }
        };

        for action in pending {
            let outcome = match action.to_request() {
                Ok(request) => {
                    self.stats.record_network_call();
                    self.fetcher.fetch(&request, FetchMode::Default).await
                }
                Err(e) => Err(e),
            };

            match outcome {
                Ok(response) if response.is_success() => {
                    if let Err(e) = self.queue.remove(&action.id).await {
                        warn!("Replayed action {} but could not dequeue it: {}", action.id, e);
                        self.stats.record_error();
                    }
                    report.succeeded += 1;
                }
                failed => {
                    let reason = match failed {
                        Ok(response) => format!("status {}", response.status),
                        Err(e) => e.to_string(),
                    };
                    warn!("Replay of action {} failed: {}", action.id, reason);
                    self.stats.record_error();
                    report.failed += 1;
                    self.note_failure(&action.id).await;
                }
            }
        }
        report
    }

    /// Counts a failed replay and drops the action once it hits the ceiling.
    async fn note_failure(&self, id: &str) {
        match self.queue.record_failure(id).await {
            Ok(attempts) if attempts >= self.max_attempts => {
                warn!("Dropping action {} after {} failed replays", id, attempts);
                if let Err(e) = self.queue.remove(id).await {
                    warn!("Could not drop action {}: {}", id, e);
                    self.stats.record_error();
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!("Could not record failure of action {}: {}", id, e);
                self.stats.record_error();
            }
        }
    }
}
