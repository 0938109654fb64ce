//! The ambient key-value store seam.

use listkeep_storage::StorageResult;
use tokio::sync::broadcast;

/// Why the store reported an external change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeReason {
    /// Another device pushed new values.
    ServerChange,
    /// The first download after the device joined.
    InitialSync,
    /// The store exceeded its total budget.
    QuotaViolation,
    /// The signed-in account changed.
    AccountChange,
}

/// Keys changed outside this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreChange {
    /// Why the change happened.
    pub reason: ChangeReason,
    /// Keys whose values changed.
    pub keys: Vec<String>,
}

impl StoreChange {
    /// Creates a change event.
    pub fn new(reason: ChangeReason, keys: Vec<String>) -> Self {
        Self { reason, keys }
    }
}

/// A replicated key-value store shared by a user's devices.
///
/// Writes are local until [`KvStore::synchronize`] pushes them. Values are
/// opaque bytes; the store enforces no size limit itself, callers do.
pub trait KvStore: Send + Sync {
    /// Account identity on this device, or `None` when signed out.
    fn identity(&self) -> Option<String>;

    /// Reads a value.
    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Writes a value.
    fn set(&self, key: &str, value: &[u8]) -> StorageResult<()>;

    /// Removes a value.
    fn remove(&self, key: &str) -> StorageResult<()>;

    /// Keys visible on this device.
    fn keys(&self) -> StorageResult<Vec<String>>;

    /// Pushes pending writes. Returns false if the store refused.
    fn synchronize(&self) -> bool;

    /// Subscribes to changes made by other devices.
    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;
}
