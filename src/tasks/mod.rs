//! Background Tasks Module
//!
//! Contains tasks that run independently of request handling.
//!
//! # Tasks
//! - Cleanup: trims current namespaces back to their capacity at a fixed interval
//! - Connectivity: probes upstream and fires the sync tags on reconnection
//! - Revalidation pool: bounded home for detached stale-while-revalidate refreshes

mod cleanup;
mod connectivity;
mod revalidate;

pub use cleanup::{spawn_cleanup_task, sweep};
pub use connectivity::{spawn_connectivity_monitor, ConnectivityMonitor, ConnectivityState};
pub use revalidate::RevalidatePool;
