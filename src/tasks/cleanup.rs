//! Eviction Sweep Task
//!
//! Background task that periodically trims every current namespace back to
//! its partition capacity.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{NamespaceNames, Partition, SharedStore};
use crate::strategy::partition_capacity;

/// Runs one sweep and returns the number of evicted entries.
///
/// Each namespace is enumerated and trimmed under its own write lock, so
/// request handling interleaves freely between namespaces.
pub async fn sweep(store: &SharedStore, names: &NamespaceNames) -> usize {
    let mut removed = 0;
    for partition in Partition::ALL {
        let namespace = names.name(partition);
        let capacity = partition_capacity(partition);
        removed += store.write().await.trim(&namespace, capacity);
    }
    removed
}

/// Spawns a background task that sweeps the store every `cleanup_interval_secs`.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let store = CacheStore::new().shared();
/// let handle = spawn_cleanup_task(store.clone(), names, 6 * 60 * 60);
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_cleanup_task(
    store: SharedStore,
    names: NamespaceNames,
    cleanup_interval_secs: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(cleanup_interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting eviction sweep with interval of {} seconds",
            cleanup_interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = sweep(&store, &names).await;
            if removed > 0 {
                info!("Eviction sweep: removed {} entries", removed);
            } else {
                debug!("Eviction sweep: all namespaces within bounds");
            }
        }
    })
}
