//! In-memory store for testing.

use crate::error::StorageResult;
use crate::store::LocalStore;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// An in-memory local store.
///
/// This store keeps all values in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral sessions that don't need persistence
///
/// Reads are counted so tests can assert how much of the store a sync
/// operation touched.
///
/// # Example
///
/// ```rust
/// use listkeep_storage::{InMemoryStore, LocalStore};
///
/// let store = InMemoryStore::new();
/// store.set_bytes("items_L1", b"[]").unwrap();
/// assert!(store.contains_key("items_L1").unwrap());
/// assert_eq!(store.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
    reads: AtomicUsize,
}

impl InMemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `entries`.
    #[must_use]
    pub fn with_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<u8>)>,
        K: Into<String>,
    {
        Self {
            entries: RwLock::new(entries.into_iter().map(|(k, v)| (k.into(), v)).collect()),
            reads: AtomicUsize::new(0),
        }
    }

    /// Returns the number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns how many `get_bytes` calls this store has served.
    #[must_use]
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl LocalStore for InMemoryStore {
    fn get_bytes(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.entries.read().get(key).cloned())
    }

    fn set_bytes(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        self.entries.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove_key(&self, key: &str) -> StorageResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.entries.read().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_new_is_empty() {
        let store = InMemoryStore::new();
        assert!(store.is_empty());
        assert!(store.keys().unwrap().is_empty());
    }

    #[test]
    fn memory_set_then_get() {
        let store = InMemoryStore::new();
        store.set_bytes("lists_a@b.com", b"[1]").unwrap();
        assert_eq!(store.get_bytes("lists_a@b.com").unwrap(), Some(b"[1]".to_vec()));
        assert_eq!(store.get_bytes("missing").unwrap(), None);
    }

    #[test]
    fn memory_set_replaces_value() {
        let store = InMemoryStore::new();
        store.set_bytes("k", b"one").unwrap();
        store.set_bytes("k", b"two").unwrap();
        assert_eq!(store.get_bytes("k").unwrap(), Some(b"two".to_vec()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn memory_remove_missing_is_ok() {
        let store = InMemoryStore::new();
        assert!(store.remove_key("nothing").is_ok());
    }

    #[test]
    fn memory_keys_are_sorted() {
        let store = InMemoryStore::new();
        store.set_bytes("items_b", b"").unwrap();
        store.set_bytes("items_a", b"").unwrap();
        store.set_bytes("profile", b"").unwrap();
        assert_eq!(store.keys().unwrap(), vec!["items_a", "items_b", "profile"]);
    }

    #[test]
    fn memory_counts_reads() {
        let store = InMemoryStore::with_entries([("a", vec![1])]);
        store.get_bytes("a").unwrap();
        store.get_bytes("b").unwrap();
        assert_eq!(store.read_count(), 2);
    }

    #[test]
    fn memory_clear() {
        let store = InMemoryStore::with_entries([("a", vec![1]), ("b", vec![2])]);
        store.clear();
        assert!(store.is_empty());
    }
}
