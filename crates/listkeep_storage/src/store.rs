//! Local store trait definition.

use crate::error::StorageResult;

/// The local key-value store the application keeps its state in.
///
/// Stores are **opaque byte maps**. The application and the sync layer
/// agree on key names and value encodings; the store only persists bytes.
///
/// # Invariants
///
/// - `get_bytes` returns exactly the bytes last passed to `set_bytes`
///   for that key, or `None` if the key was never set or was removed
/// - `remove_key` on a missing key is not an error
/// - Stores must be `Send + Sync` and take `&self`, so one instance can be
///   shared behind an `Arc`
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - For testing
/// - [`super::FileStore`] - For persistent storage
pub trait LocalStore: Send + Sync {
    /// Returns the bytes stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be read.
    fn get_bytes(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not representable or the write fails.
    fn set_bytes(&self, key: &str, value: &[u8]) -> StorageResult<()>;

    /// Removes `key` and its value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be modified.
    fn remove_key(&self, key: &str) -> StorageResult<()>;

    /// Returns every key currently stored, in ascending order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing medium cannot be enumerated.
    fn keys(&self) -> StorageResult<Vec<String>>;

    /// Returns true if `key` holds a value.
    fn contains_key(&self, key: &str) -> StorageResult<bool> {
        Ok(self.get_bytes(key)?.is_some())
    }
}

impl<S: LocalStore + ?Sized> LocalStore for std::sync::Arc<S> {
    fn get_bytes(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        (**self).get_bytes(key)
    }

    fn set_bytes(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        (**self).set_bytes(key, value)
    }

    fn remove_key(&self, key: &str) -> StorageResult<()> {
        (**self).remove_key(key)
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        (**self).keys()
    }
}
