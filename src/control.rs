//! Control Channel
//!
//! Request/reply protocol used by the hosting application to read stats,
//! clear the cache and force a critical-data sync.

use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::{CacheStats, NamespaceNames, SharedStore};
use crate::models::{ControlMessage, ControlReply, StatsSnapshot};
use crate::sync::{SyncManager, SyncTag};

#[derive(Clone)]
pub struct ControlChannel {
    store: SharedStore,
    stats: Arc<CacheStats>,
    sync: SyncManager,
    names: NamespaceNames,
}

impl ControlChannel {
    pub fn new(
        store: SharedStore,
        stats: Arc<CacheStats>,
        sync: SyncManager,
        names: NamespaceNames,
    ) -> Self {
        Self {
            store,
            stats,
            sync,
            names,
        }
    }

    /// Answers one message. Unknown kinds are logged and get no reply.
    pub async fn handle(&self, message: ControlMessage) -> Option<ControlReply> {
        match message {
            ControlMessage::GetStats => Some(ControlReply::Stats(self.stats_snapshot().await)),
            ControlMessage::ClearCache => Some(ControlReply::ack(self.clear().await)),
            ControlMessage::ForceSync => {
                // Replies on registration; the sync itself finishes later
                self.sync.register(SyncTag::CriticalData);
                Some(ControlReply::ack(true))
            }
            ControlMessage::Unknown(kind) => {
                warn!("Ignoring unknown control message {:?}", kind);
                self.stats.record_error();
                None
            }
        }
    }

    pub async fn stats_snapshot(&self) -> StatsSnapshot {
        let counters = self.stats.snapshot();
        let (namespaces, entries) = {
            let store = self.store.read().await;
            let owned = store
                .namespace_names()
                .into_iter()
                .filter(|name| self.names.is_owned(name))
                .count();
            (owned, store.total_entries(|name| self.names.is_owned(name)))
        };

        StatsSnapshot {
            hits: counters.hits,
            misses: counters.misses,
            network_calls: counters.network_calls,
            syncs: counters.syncs,
            errors: counters.errors,
            uptime: counters.uptime_ms(),
            hit_rate: counters.hit_rate(),
            namespace_version: self.names.version().to_string(),
            namespaces,
            entries,
        }
    }

    /// Deletes every product namespace, then resets the counters.
    async fn clear(&self) -> bool {
        let deleted = {
            let mut store = self.store.write().await;
            let owned: Vec<String> = store
                .namespace_names()
                .into_iter()
                .filter(|name| self.names.is_owned(name))
                .collect();
            for name in &owned {
                store.delete_namespace(name);
            }
            owned.len()
        };
        self.stats.reset();
        info!("Cache cleared: {} namespaces deleted", deleted);
        true
    }
}
