//! Cache Module
//!
//! Versioned namespaces of timestamped responses with FIFO eviction,
//! plus the shared stats counters.

pub mod entry;
mod namespace;
mod order;
mod stats;
mod store;


// Re-export public types
pub use entry::{current_timestamp_ms, CacheEntry, WRITTEN_AT_HEADER};
pub use namespace::{NamespaceNames, Partition};
pub use order::InsertionOrder;
pub use stats::{CacheStats, CountersSnapshot};
pub use store::{CacheStore, SharedStore};

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 4096;

/// Maximum allowed body size in bytes
pub const MAX_BODY_SIZE: usize = 16 * 1024 * 1024; // 16 MB
