//! Cache Store Module
//!
//! Named partitions of timestamped entries with FIFO eviction.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::cache::{CacheEntry, InsertionOrder, MAX_BODY_SIZE, MAX_KEY_LENGTH};
use crate::error::{CacheError, Result};

/// Store handle shared by executors, lifecycle, sync and control.
pub type SharedStore = Arc<RwLock<CacheStore>>;

// == Namespace ==
/// Entries of one namespace plus their write order.
#[derive(Debug, Default)]
struct Namespace {
    entries: HashMap<String, CacheEntry>,
    order: InsertionOrder,
}

impl Namespace {
    fn insert(&mut self, entry: CacheEntry) {
        self.order.record_write(&entry.key);
        self.entries.insert(entry.key.clone(), entry);
    }

    fn trim(&mut self, max_entries: usize) -> usize {
        let mut removed = 0;
        while self.entries.len() > max_entries {
            match self.order.pop_oldest() {
                Some(key) => {
                    self.entries.remove(&key);
                    removed += 1;
                }
                None => break,
            }
        }
        removed
    }
}

// == Cache Store ==
/// All namespaces known to the cache layer.
#[derive(Debug, Default)]
pub struct CacheStore {
    namespaces: HashMap<String, Namespace>,
}

impl CacheStore {
    // == Constructor ==
    /// Creates an empty store with no namespaces.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps the store for sharing across tasks.
    pub fn shared(self) -> SharedStore {
        Arc::new(RwLock::new(self))
    }

    // == Namespaces ==
    /// Creates the namespace if it does not exist yet.
    pub fn open(&mut self, namespace: &str) {
        self.namespaces.entry(namespace.to_string()).or_default();
    }

    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.namespaces.contains_key(namespace)
    }

    /// Names of every namespace, sorted.
    pub fn namespace_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.namespaces.keys().cloned().collect();
        names.sort();
        names
    }

    /// Drops a namespace and every entry it owns.
    pub fn delete_namespace(&mut self, namespace: &str) -> bool {
        self.namespaces.remove(namespace).is_some()
    }

    // == Get ==
    /// Returns a copy of the entry, fresh or not.
    pub fn get(&self, namespace: &str, key: &str) -> Option<CacheEntry> {
        self.namespaces
            .get(namespace)
            .and_then(|ns| ns.entries.get(key))
            .cloned()
    }

    // == Put ==
    /// Stores an entry, creating the namespace on first write.
    ///
    /// Overwriting a key replaces the entry and makes it the newest write.
    pub fn put(&mut self, namespace: &str, entry: CacheEntry) -> Result<()> {
        validate(&entry)?;
        self.namespaces
            .entry(namespace.to_string())
            .or_default()
            .insert(entry);
        Ok(())
    }

    /// Stores an entry then evicts oldest writes beyond `max_entries`.
    ///
    /// Returns the number of evicted entries.
    pub fn put_bounded(
        &mut self,
        namespace: &str,
        entry: CacheEntry,
        max_entries: usize,
    ) -> Result<usize> {
        self.put(namespace, entry)?;
        Ok(self.trim(namespace, max_entries))
    }

    /// Stores every entry or none of them.
    pub fn put_all(&mut self, namespace: &str, entries: Vec<CacheEntry>) -> Result<()> {
        for entry in &entries {
            validate(entry)?;
        }
        let ns = self.namespaces.entry(namespace.to_string()).or_default();
        for entry in entries {
            ns.insert(entry);
        }
        Ok(())
    }

    // == Delete ==
    /// Removes an entry, returning whether it existed.
    pub fn delete(&mut self, namespace: &str, key: &str) -> bool {
        match self.namespaces.get_mut(namespace) {
            Some(ns) => {
                ns.order.remove(key);
                ns.entries.remove(key).is_some()
            }
            None => false,
        }
    }

    // == Enumerate ==
    /// Keys of a namespace from oldest to newest write.
    pub fn keys(&self, namespace: &str) -> Vec<String> {
        self.namespaces
            .get(namespace)
            .map(|ns| ns.order.iter().cloned().collect())
            .unwrap_or_default()
    }

    // == Trim ==
    /// Evicts oldest writes until the namespace holds at most `max_entries`.
    pub fn trim(&mut self, namespace: &str, max_entries: usize) -> usize {
        self.namespaces
            .get_mut(namespace)
            .map(|ns| ns.trim(max_entries))
            .unwrap_or(0)
    }

    // == Length ==
    /// Number of entries in a namespace.
    pub fn len(&self, namespace: &str) -> usize {
        self.namespaces
            .get(namespace)
            .map(|ns| ns.entries.len())
            .unwrap_or(0)
    }

    /// Number of entries across namespaces accepted by `filter`.
    pub fn total_entries<F>(&self, filter: F) -> usize
    where
        F: Fn(&str) -> bool,
    {
        self.namespaces
            .iter()
            .filter(|(name, _)| filter(name))
            .map(|(_, ns)| ns.entries.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }
}

fn validate(entry: &CacheEntry) -> Result<()> {
    if entry.key.is_empty() || entry.key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::Storage(format!(
            "Key must be 1..={} bytes",
            MAX_KEY_LENGTH
        )));
    }
    if entry.body.len() > MAX_BODY_SIZE {
        return Err(CacheError::Storage(format!(
            "Body of {} exceeds maximum size of {} bytes",
            entry.key, MAX_BODY_SIZE
        )));
    }
    Ok(())
}
