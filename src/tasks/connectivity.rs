//! Connectivity Monitor Task
//!
//! Probes upstream at a fixed interval. When upstream becomes reachable
//! again after being unreachable, both sync tags are registered.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::models::InterceptedRequest;
use crate::network::{FetchMode, Fetcher};
use crate::sync::{SyncManager, SyncTag};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityState {
    Online,
    Offline,
    /// Before the first probe
    Unknown,
}

impl fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectivityState::Online => write!(f, "online"),
            ConnectivityState::Offline => write!(f, "offline"),
            ConnectivityState::Unknown => write!(f, "unknown"),
        }
    }
}

/// Tracks probe results and detects reconnection.
#[derive(Debug)]
pub struct ConnectivityMonitor {
    state: ConnectivityState,
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectivityMonitor {
    pub fn new() -> Self {
        Self {
            state: ConnectivityState::Unknown,
        }
    }

    pub fn state(&self) -> ConnectivityState {
        self.state
    }

    /// Feeds one probe result. Returns true on an offline → online transition.
    pub fn observe(&mut self, reachable: bool) -> bool {
        let previous = self.state;
        self.state = if reachable {
            ConnectivityState::Online
        } else {
            ConnectivityState::Offline
        };
        previous == ConnectivityState::Offline && self.state == ConnectivityState::Online
    }
}

/// Spawns the probe loop.
///
/// Any upstream answer counts as reachable; only transport failures and
/// timeouts count as offline.
pub fn spawn_connectivity_monitor(
    fetcher: Arc<dyn Fetcher>,
    probe_url: Url,
    sync: SyncManager,
    interval_secs: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting connectivity monitor for {} every {} seconds",
            probe_url, interval_secs
        );
        let probe = InterceptedRequest::get(probe_url);
        let mut monitor = ConnectivityMonitor::new();

        loop {
            let reachable = fetcher.fetch(&probe, FetchMode::Reload).await.is_ok();
            let previous = monitor.state();
            let reconnected = monitor.observe(reachable);

            if previous != monitor.state() {
                info!("Upstream connectivity: {} -> {}", previous, monitor.state());
            } else {
                debug!("Upstream connectivity: {}", monitor.state());
            }
            if reconnected {
                warn!("Upstream reachable again, registering background sync");
                sync.register(SyncTag::CriticalData);
                sync.register(SyncTag::UserActions);
            }

            tokio::time::sleep(interval).await;
        }
    })
}
