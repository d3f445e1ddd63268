//! Write Order Module
//!
//! Tracks insertion order of keys inside a namespace for FIFO eviction.

use std::collections::VecDeque;

// == Insertion Order ==
/// Keeps keys ordered by their most recent write.
///
/// - Front = oldest write
/// - Back = newest write
///
/// Reads never reorder keys; an overwrite counts as a fresh insertion.
#[derive(Debug, Default, Clone)]
pub struct InsertionOrder {
    order: VecDeque<String>,
}

impl InsertionOrder {
    // == Constructor ==
    /// Creates a new empty tracker.
    pub fn new() -> Self {
        Self {
            order: VecDeque::new(),
        }
    }

    // == Record Write ==
    /// Marks a key as the newest write (moves to back).
    pub fn record_write(&mut self, key: &str) {
        self.remove(key);
        self.order.push_back(key.to_string());
    }

    // == Remove ==
    /// Removes a key from the tracker.
    pub fn remove(&mut self, key: &str) {
        self.order.retain(|k| k != key);
    }

    // == Pop Oldest ==
    /// Returns and removes the oldest written key.
    ///
    /// Returns None if tracker is empty.
    pub fn pop_oldest(&mut self) -> Option<String> {
        self.order.pop_front()
    }

    // == Peek Oldest ==
    /// Returns the oldest written key without removing it.
    #[cfg(test)]
    pub fn peek_oldest(&self) -> Option<&String> {
        self.order.front()
    }

    /// Keys from oldest to newest write.
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[cfg(test)]
    pub fn contains(&self, key: &str) -> bool {
        self.order.iter().any(|k| k == key)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_new() {
        let order = InsertionOrder::new();
        assert!(order.is_empty());
        assert_eq!(order.len(), 0);
    }

    #[test]
    fn test_first_write_is_oldest() {
        let mut order = InsertionOrder::new();

        order.record_write("key1");
        order.record_write("key2");
        order.record_write("key3");

        assert_eq!(order.len(), 3);
        assert_eq!(order.peek_oldest(), Some(&"key1".to_string()));
    }

    #[test]
    fn test_overwrite_moves_to_back() {
        let mut order = InsertionOrder::new();

        order.record_write("key1");
        order.record_write("key2");
        order.record_write("key3");

        // Rewriting key1 makes it the newest
        order.record_write("key1");

        assert_eq!(order.len(), 3);
        assert_eq!(order.peek_oldest(), Some(&"key2".to_string()));
    }

    #[test]
    fn test_pop_oldest_in_write_order() {
        let mut order = InsertionOrder::new();

        order.record_write("a");
        order.record_write("b");
        order.record_write("c");

        assert_eq!(order.pop_oldest(), Some("a".to_string()));
        assert_eq!(order.pop_oldest(), Some("b".to_string()));
        assert_eq!(order.len(), 1);
    }

    #[test]
    fn test_pop_empty() {
        let mut order = InsertionOrder::new();
        assert_eq!(order.pop_oldest(), None);
    }

    #[test]
    fn test_remove() {
        let mut order = InsertionOrder::new();

        order.record_write("key1");
        order.record_write("key2");
        order.record_write("key3");
        order.remove("key2");
        order.remove("missing");

        assert_eq!(order.len(), 2);
        assert!(!order.contains("key2"));
        let keys: Vec<_> = order.iter().cloned().collect();
        assert_eq!(keys, vec!["key1", "key3"]);
    }

    #[test]
    fn test_repeated_writes_keep_single_slot() {
        let mut order = InsertionOrder::new();

        order.record_write("key1");
        order.record_write("key1");
        order.record_write("key1");

        assert_eq!(order.len(), 1);
        assert_eq!(order.pop_oldest(), Some("key1".to_string()));
        assert!(order.is_empty());
    }
}
