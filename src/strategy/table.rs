//! Fixed strategy table, one configuration per classification.

use std::time::Duration;

use super::Classification;
use crate::cache::Partition;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    CacheFirst,
    NetworkFirst,
    StaleWhileRevalidate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyConfig {
    pub kind: StrategyKind,
    /// Age below which a cached entry is served without asking upstream
    pub max_age: Duration,
    /// Entry bound of the target namespace after a write
    pub max_entries: usize,
    /// Upstream race window; None waits for the client's own ceiling
    pub network_timeout: Option<Duration>,
    /// Namespace partition entries are written to
    pub partition: Partition,
}

const HOUR: u64 = 60 * 60;

const STATIC: StrategyConfig = StrategyConfig {
    kind: StrategyKind::CacheFirst,
    max_age: Duration::from_secs(24 * HOUR),
    max_entries: 100,
    network_timeout: None,
    partition: Partition::Static,
};

const CRITICAL: StrategyConfig = StrategyConfig {
    kind: StrategyKind::NetworkFirst,
    max_age: Duration::from_secs(5 * 60),
    max_entries: 50,
    network_timeout: Some(Duration::from_secs(1)),
    partition: Partition::Api,
};

const API: StrategyConfig = StrategyConfig {
    kind: StrategyKind::NetworkFirst,
    max_age: Duration::from_secs(5 * 60),
    max_entries: 50,
    network_timeout: Some(Duration::from_secs(3)),
    partition: Partition::Api,
};

const IMAGES: StrategyConfig = StrategyConfig {
    kind: StrategyKind::StaleWhileRevalidate,
    max_age: Duration::from_secs(7 * 24 * HOUR),
    max_entries: 60,
    network_timeout: None,
    partition: Partition::Dynamic,
};

const TABLE: [(Classification, StrategyConfig); 4] = [
    (Classification::Static, STATIC),
    (Classification::Critical, CRITICAL),
    (Classification::Api, API),
    (Classification::Images, IMAGES),
];

pub fn strategy_for(class: Classification) -> &'static StrategyConfig {
    match class {
        Classification::Static => &TABLE[0].1,
        Classification::Critical => &TABLE[1].1,
        Classification::Api => &TABLE[2].1,
        Classification::Images => &TABLE[3].1,
    }
}

/// Largest entry bound among the classes writing to `partition`.
pub fn partition_capacity(partition: Partition) -> usize {
    TABLE
        .iter()
        .filter(|(_, cfg)| cfg.partition == partition)
        .map(|(_, cfg)| cfg.max_entries)
        .max()
        .unwrap_or(0)
}
