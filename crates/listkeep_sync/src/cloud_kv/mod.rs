//! Cloud key-value backend.
//!
//! Each user's backup is one value under `appData_<sanitized id>` in a
//! replicated store shared by the user's devices. Values are limited to
//! 1,000,000 bytes per key; larger payloads are rejected before any write.
//! Every mutation is followed by a `synchronize` call.
//!
//! Changes pushed by other devices arrive as [`StoreChange`] events and are
//! re-published per key as [`DataChanged`].

mod directory;
mod memory;
mod store;

pub use directory::DirectoryKvStore;
pub use memory::{KvCloud, MemoryKvStore};
pub use store::{ChangeReason, KvStore, StoreChange};

use crate::config::CloudKvConfig;
use crate::engine::SyncEngine;
use crate::error::{SyncError, SyncResult};
use crate::remote::{SnapshotRemote, WriteOutcome};
use async_trait::async_trait;
use listkeep_codec::naming::{backup_key, items_key};
use listkeep_codec::{Decode, Encode, EntityId, Item, Snapshot, User};
use listkeep_storage::LocalStore;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const DATA_CHANGED_CAPACITY: usize = 64;

/// Sync engine writing to a cloud key-value store.
pub type CloudKvBackend<K, S> = SyncEngine<CloudKvRemote<K>, S>;

/// A key whose value was changed by another device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataChanged {
    /// The changed key.
    pub key: String,
}

/// Bytes used in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageUsage {
    /// Bytes held across all visible keys.
    pub used_bytes: usize,
    /// Total bytes the store allows.
    pub budget_bytes: usize,
    /// Number of visible keys.
    pub keys: usize,
}

impl StorageUsage {
    /// Bytes still available.
    pub fn remaining_bytes(&self) -> usize {
        self.budget_bytes.saturating_sub(self.used_bytes)
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for listkeep_codec::Snapshot {}
    impl Sealed for Vec<listkeep_codec::Item> {}
}

/// Records that may be stored directly in the cloud store.
///
/// Implemented for [`Snapshot`] and item lists only.
pub trait KvRecord: sealed::Sealed + Encode + Decode + Send + Sync {}

impl KvRecord for Snapshot {}
impl KvRecord for Vec<Item> {}

/// A [`KvStore`] as a [`SnapshotRemote`].
pub struct CloudKvRemote<K: KvStore> {
    store: K,
    config: CloudKvConfig,
    changes: broadcast::Sender<DataChanged>,
}

impl<K: KvStore> CloudKvRemote<K> {
    /// Wraps `store`.
    pub fn new(store: K, config: CloudKvConfig) -> Self {
        let (changes, _) = broadcast::channel(DATA_CHANGED_CAPACITY);
        Self {
            store,
            config,
            changes,
        }
    }

    /// The wrapped store.
    pub fn store(&self) -> &K {
        &self.store
    }

    /// Active configuration.
    pub fn config(&self) -> &CloudKvConfig {
        &self.config
    }

    /// Returns true if the device is signed in to the store.
    pub fn is_available(&self) -> bool {
        self.store.identity().is_some()
    }

    fn key_for(&self, user: &User) -> String {
        backup_key(&self.config.key_prefix, user)
    }

    fn put(&self, key: &str, value: &[u8]) -> SyncResult<()> {
        self.store.set(key, value)?;
        if !self.store.synchronize() {
            return Err(SyncError::SyncFailed);
        }
        debug!(key, bytes = value.len(), "value synchronized");
        Ok(())
    }
}

#[async_trait]
impl<K: KvStore> SnapshotRemote for CloudKvRemote<K> {
    fn name(&self) -> &'static str {
        "cloud-kv"
    }

    fn ensure_ready(&self) -> SyncResult<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(SyncError::NotAvailable)
        }
    }

    fn max_payload_bytes(&self) -> Option<usize> {
        Some(self.config.max_value_bytes)
    }

    async fn write_snapshot(&self, user: &User, payload: &[u8]) -> SyncResult<WriteOutcome> {
        let key = self.key_for(user);
        let outcome = if self.store.get(&key)?.is_some() {
            WriteOutcome::Updated
        } else {
            WriteOutcome::Created
        };
        self.put(&key, payload)?;
        Ok(outcome)
    }

    async fn read_snapshot(&self, user: &User) -> SyncResult<Option<Vec<u8>>> {
        Ok(self.store.get(&self.key_for(user))?)
    }
}

impl<K, S> SyncEngine<CloudKvRemote<K>, S>
where
    K: KvStore,
    S: LocalStore,
{
    /// Creates a cloud key-value backend over `store`.
    pub fn cloud_kv(store: K, config: CloudKvConfig, local: Arc<S>) -> Self {
        SyncEngine::new(CloudKvRemote::new(store, config), local)
    }

    /// Returns true if the device is signed in to the store.
    pub fn is_available(&self) -> bool {
        self.remote().is_available()
    }

    /// Re-checks availability and, when available, pulls pending changes.
    pub fn refresh_availability(&self) -> bool {
        let available = self.remote().is_available();
        if available {
            let synced = self.remote().store().synchronize();
            debug!(synced, "cloud store available");
        } else {
            info!("cloud store not available on this device");
        }
        available
    }

    /// Subscribes to per-key change notifications.
    pub fn subscribe_changes(&self) -> broadcast::Receiver<DataChanged> {
        self.remote().changes.subscribe()
    }

    /// Re-publishes an external store change and marks the session synced.
    ///
    /// Events that name no keys are ignored.
    pub fn handle_store_change(&self, change: &StoreChange) {
        if change.keys.is_empty() {
            debug!(reason = ?change.reason, "ignoring store change without keys");
            return;
        }

        for key in &change.keys {
            let _ = self.remote().changes.send(DataChanged { key: key.clone() });
        }
        self.session().mark_external_change();
        info!(reason = ?change.reason, keys = change.keys.len(), "external store change");
    }

    /// Saves a record under `key`.
    pub async fn save_record<T: KvRecord>(&self, key: &str, record: &T) -> SyncResult<()> {
        self.exclusive("save record", async {
            self.remote().ensure_ready()?;
            let bytes = record.encode()?;
            self.check_quota(&bytes)?;
            self.remote().put(key, &bytes)
        })
        .await
    }

    /// Loads the record under `key`, if any.
    pub async fn load_record<T: KvRecord>(&self, key: &str) -> SyncResult<Option<T>> {
        self.exclusive("load record", async {
            self.remote().ensure_ready()?;
            match self.remote().store().get(key)? {
                Some(bytes) => Ok(Some(T::decode(&bytes).map_err(|e| SyncError::Decoding(e.to_string()))?)),
                None => Ok(None),
            }
        })
        .await
    }

    /// Removes the record under `key`.
    pub async fn delete_record(&self, key: &str) -> SyncResult<()> {
        self.exclusive("delete record", async {
            self.remote().ensure_ready()?;
            self.remote().store().remove(key)?;
            if !self.remote().store().synchronize() {
                return Err(SyncError::SyncFailed);
            }
            Ok(())
        })
        .await
    }

    /// Saves the items of one list under `items_<list id>`.
    pub async fn save_list_items(&self, list_id: &EntityId, items: &[Item]) -> SyncResult<()> {
        self.save_record(&items_key(list_id), &items.to_vec()).await
    }

    /// Loads the items of one list.
    pub async fn load_list_items(&self, list_id: &EntityId) -> SyncResult<Option<Vec<Item>>> {
        self.load_record(&items_key(list_id)).await
    }

    /// Bytes used across the keys visible on this device.
    ///
    /// A failure is published as the session status; success leaves the
    /// status and last sync date alone.
    pub fn storage_usage(&self) -> SyncResult<StorageUsage> {
        self.measure_usage().inspect_err(|e| {
            self.session().mark_failure(e);
            warn!(error = %e, "storage usage unavailable");
        })
    }

    fn measure_usage(&self) -> SyncResult<StorageUsage> {
        self.remote().ensure_ready()?;
        let store = self.remote().store();
        let keys = store.keys()?;
        let mut used_bytes = 0;
        for key in &keys {
            used_bytes += store.get(key)?.map_or(0, |v| v.len());
        }
        Ok(StorageUsage {
            used_bytes,
            budget_bytes: self.remote().config().total_budget_bytes,
            keys: keys.len(),
        })
    }
}

impl<K, S> SyncEngine<CloudKvRemote<K>, S>
where
    K: KvStore + 'static,
    S: LocalStore + 'static,
{
    /// Forwards store change events to [`Self::handle_store_change`].
    ///
    /// The task holds only a weak reference and ends once the backend is
    /// dropped or the store's channel closes.
    pub fn spawn_change_listener(self: &Arc<Self>) -> JoinHandle<()> {
        let mut events = self.remote().store().subscribe();
        let backend = Arc::downgrade(self);
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(change) => match backend.upgrade() {
                        Some(backend) => backend.handle_store_change(&change),
                        None => break,
                    },
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "store change listener lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!("store change listener stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::SyncStatus;
    use listkeep_storage::InMemoryStore;

    type Backend = CloudKvBackend<MemoryKvStore, InMemoryStore>;

    fn backend(identity: Option<&str>) -> Backend {
        CloudKvBackend::cloud_kv(
            MemoryKvStore::standalone(identity),
            CloudKvConfig::default(),
            Arc::new(InMemoryStore::new()),
        )
    }

    fn user() -> User {
        User::new("A", "B", "a.b@c.com", "pw")
    }

    #[tokio::test]
    async fn backup_writes_sanitized_key() {
        let backend = backend(Some("me"));
        let receipt = backend.backup(&user(), &[], &[]).await.unwrap();
        assert_eq!(receipt.outcome, WriteOutcome::Created);

        let cloud = backend.remote().store().cloud();
        assert_eq!(cloud.keys(), vec!["appData_a_b_c_com".to_string()]);

        let receipt = backend.backup(&user(), &[], &[]).await.unwrap();
        assert_eq!(receipt.outcome, WriteOutcome::Updated);
        assert_eq!(cloud.keys().len(), 1);
    }

    #[tokio::test]
    async fn unavailable_store_is_untouched() {
        let backend = backend(None);
        assert!(!backend.is_available());
        assert!(matches!(
            backend.backup(&user(), &[], &[]).await,
            Err(SyncError::NotAvailable)
        ));
        assert!(matches!(backend.restore(&user()).await, Err(SyncError::NotAvailable)));
        assert_eq!(backend.remote().store().call_count(), 0);
        assert!(backend.status().is_error());
    }

    #[tokio::test]
    async fn refused_synchronize_is_sync_failed() {
        let backend = backend(Some("me"));
        backend.remote().store().set_fail_sync(true);
        let err = backend.backup(&user(), &[], &[]).await.unwrap_err();
        assert!(matches!(err, SyncError::SyncFailed));
        assert_eq!(backend.status(), SyncStatus::Error(SyncError::SyncFailed.to_string()));
    }

    #[tokio::test]
    async fn list_items_roundtrip() {
        let backend = backend(Some("me"));
        let list = EntityId::from("L1");
        assert!(backend.load_list_items(&list).await.unwrap().is_none());

        let items = vec![Item::with_id("I1", "Milk", false)];
        backend.save_list_items(&list, &items).await.unwrap();
        assert_eq!(backend.load_list_items(&list).await.unwrap(), Some(items));
        assert!(backend.remote().store().cloud().value("items_L1").is_some());

        backend.delete_record("items_L1").await.unwrap();
        assert!(backend.load_list_items(&list).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn snapshot_records_are_quota_checked() {
        let backend = CloudKvBackend::cloud_kv(
            MemoryKvStore::standalone(Some("me")),
            CloudKvConfig::default().with_max_value_bytes(64),
            Arc::new(InMemoryStore::new()),
        );
        let snapshot = Snapshot::capture(user(), vec![], vec![], Default::default()).unwrap();
        let err = backend.save_record("snap", &snapshot).await.unwrap_err();
        assert!(matches!(err, SyncError::QuotaExceeded { limit: 64, .. }));
        assert_eq!(backend.remote().store().write_count(), 0);
    }

    #[tokio::test]
    async fn store_changes_are_republished() {
        let backend = backend(Some("me"));
        let mut changes = backend.subscribe_changes();

        backend.handle_store_change(&StoreChange::new(ChangeReason::ServerChange, vec![]));
        assert_eq!(backend.status(), SyncStatus::Idle);
        assert!(changes.try_recv().is_err());

        backend.handle_store_change(&StoreChange::new(
            ChangeReason::ServerChange,
            vec!["appData_x".into(), "items_L1".into()],
        ));
        assert_eq!(changes.try_recv().unwrap().key, "appData_x");
        assert_eq!(changes.try_recv().unwrap().key, "items_L1");
        assert_eq!(backend.status(), SyncStatus::Success);
        assert!(backend.last_sync_date().is_some());
    }

    #[tokio::test]
    async fn storage_usage_counts_visible_bytes() {
        let backend = backend(Some("me"));
        backend
            .save_list_items(&EntityId::from("L1"), &[Item::with_id("I1", "Milk", false)])
            .await
            .unwrap();
        let usage = backend.storage_usage().unwrap();
        assert_eq!(usage.keys, 1);
        assert!(usage.used_bytes > 0);
        assert_eq!(usage.remaining_bytes(), usage.budget_bytes - usage.used_bytes);
    }

    #[tokio::test]
    async fn unavailable_reads_publish_error() {
        let backend = backend(None);
        let err = backend.load_list_items(&EntityId::from("L1")).await.unwrap_err();
        assert!(matches!(err, SyncError::NotAvailable));
        assert_eq!(backend.status(), SyncStatus::Error(SyncError::NotAvailable.to_string()));
        assert_eq!(backend.remote().store().call_count(), 0);

        backend.session().reset();
        assert!(matches!(backend.storage_usage(), Err(SyncError::NotAvailable)));
        assert!(backend.status().is_error());
        assert_eq!(backend.remote().store().call_count(), 0);
    }

    #[tokio::test]
    async fn unreadable_record_publishes_decoding_error() {
        let backend = backend(Some("me"));
        backend.remote().store().set("items_L1", b"not items").unwrap();

        let err = backend.load_list_items(&EntityId::from("L1")).await.unwrap_err();
        assert!(matches!(err, SyncError::Decoding(_)));
        assert!(backend.status().is_error());
        assert!(backend.last_sync_date().is_none());
    }

    #[tokio::test]
    async fn usage_query_leaves_status_alone() {
        let backend = backend(Some("me"));
        backend.storage_usage().unwrap();
        assert_eq!(backend.status(), SyncStatus::Idle);
        assert!(backend.last_sync_date().is_none());
    }

    #[tokio::test]
    async fn listener_stops_when_backend_is_dropped() {
        let backend = Arc::new(backend(Some("me")));
        let listener = backend.spawn_change_listener();

        drop(backend);
        tokio::time::timeout(std::time::Duration::from_secs(1), listener)
            .await
            .expect("listener finishes")
            .unwrap();
    }

    #[tokio::test]
    async fn refresh_reports_availability() {
        assert!(backend(Some("me")).refresh_availability());
        assert!(!backend(None).refresh_availability());
    }
}
