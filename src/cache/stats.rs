//! Cache Statistics Module
//!
//! Process-wide counters for hits, misses, upstream calls, syncs and errors.
//! One instance is created by the worker and injected into every component.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use crate::cache::entry::current_timestamp_ms;

#[derive(Debug)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    network_calls: AtomicU64,
    syncs: AtomicU64,
    errors: AtomicU64,
    started_at: u64,
}

impl Counters {
    fn fresh() -> Self {
        Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            network_calls: AtomicU64::new(0),
            syncs: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            started_at: current_timestamp_ms(),
        }
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountersSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub network_calls: u64,
    pub syncs: u64,
    pub errors: u64,
    pub started_at: u64,
}

impl CountersSnapshot {
    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Milliseconds since start or last reset.
    pub fn uptime_ms(&self) -> u64 {
        current_timestamp_ms().saturating_sub(self.started_at)
    }
}

// == Cache Stats ==
/// Shared counters, incremented with atomics.
///
/// `reset` swaps the whole counter set at once so a snapshot never mixes
/// values from before and after a clear.
#[derive(Debug)]
pub struct CacheStats {
    current: RwLock<Arc<Counters>>,
}

impl Default for CacheStats {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(Counters::fresh())),
        }
    }

    fn counters(&self) -> Arc<Counters> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    pub fn record_hit(&self) {
        self.counters().hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.counters().misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_network_call(&self) {
        self.counters().network_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sync(&self) {
        self.counters().syncs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.counters().errors.fetch_add(1, Ordering::Relaxed);
    }

    // == Snapshot ==
    pub fn snapshot(&self) -> CountersSnapshot {
        let c = self.counters();
        CountersSnapshot {
            hits: c.hits.load(Ordering::Relaxed),
            misses: c.misses.load(Ordering::Relaxed),
            network_calls: c.network_calls.load(Ordering::Relaxed),
            syncs: c.syncs.load(Ordering::Relaxed),
            errors: c.errors.load(Ordering::Relaxed),
            started_at: c.started_at,
        }
    }

    // == Reset ==
    /// Zeroes every counter and restarts the uptime clock.
    pub fn reset(&self) {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = Arc::new(Counters::fresh());
    }
}
