//! In-memory replicated store: one shared cloud, many attached devices.

use super::store::{ChangeReason, KvStore, StoreChange};
use listkeep_storage::StorageResult;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::broadcast;
use tracing::debug;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug)]
struct Device {
    id: usize,
    cache: RwLock<BTreeMap<String, Vec<u8>>>,
    changes: broadcast::Sender<StoreChange>,
}

impl Device {
    fn receive(&self, reason: ChangeReason, updates: &BTreeMap<String, Option<Vec<u8>>>) {
        {
            let mut cache = self.cache.write();
            for (key, value) in updates {
                match value {
                    Some(value) => cache.insert(key.clone(), value.clone()),
                    None => cache.remove(key),
                };
            }
        }
        let _ = self
            .changes
            .send(StoreChange::new(reason, updates.keys().cloned().collect()));
    }
}

#[derive(Debug, Default)]
struct CloudInner {
    values: RwLock<BTreeMap<String, Vec<u8>>>,
    devices: Mutex<Vec<Weak<Device>>>,
    next_device: AtomicUsize,
}

/// The server side of the simulated store.
///
/// Cloning yields another handle to the same cloud.
#[derive(Debug, Clone, Default)]
pub struct KvCloud {
    inner: Arc<CloudInner>,
}

impl KvCloud {
    /// Creates an empty cloud.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a device signed in as `identity`.
    ///
    /// The device starts with a copy of the cloud's current values.
    pub fn attach(&self, identity: Option<&str>) -> MemoryKvStore {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        let device = Arc::new(Device {
            id: self.inner.next_device.fetch_add(1, Ordering::SeqCst),
            cache: RwLock::new(self.inner.values.read().clone()),
            changes,
        });
        self.inner.devices.lock().push(Arc::downgrade(&device));

        MemoryKvStore {
            cloud: self.clone(),
            device,
            identity: RwLock::new(identity.map(str::to_string)),
            pending: Mutex::new(BTreeMap::new()),
            fail_sync: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    /// Value currently held by the cloud.
    pub fn value(&self, key: &str) -> Option<Vec<u8>> {
        self.inner.values.read().get(key).cloned()
    }

    /// Keys currently held by the cloud.
    pub fn keys(&self) -> Vec<String> {
        self.inner.values.read().keys().cloned().collect()
    }

    /// Writes a value as another installation would, notifying every device.
    pub fn push_external(&self, key: &str, value: &[u8]) {
        let mut updates = BTreeMap::new();
        updates.insert(key.to_string(), Some(value.to_vec()));
        self.publish(None, ChangeReason::ServerChange, updates);
    }

    /// Sends a change event with no value updates to every device.
    pub fn notify_all(&self, reason: ChangeReason, keys: Vec<String>) {
        for device in self.live_devices(None) {
            let _ = device.changes.send(StoreChange::new(reason, keys.clone()));
        }
    }

    fn publish(
        &self,
        origin: Option<usize>,
        reason: ChangeReason,
        updates: BTreeMap<String, Option<Vec<u8>>>,
    ) {
        {
            let mut values = self.inner.values.write();
            for (key, value) in &updates {
                match value {
                    Some(value) => values.insert(key.clone(), value.clone()),
                    None => values.remove(key),
                };
            }
        }

        for device in self.live_devices(origin) {
            device.receive(reason, &updates);
        }
    }

    fn live_devices(&self, except: Option<usize>) -> Vec<Arc<Device>> {
        let mut devices = self.inner.devices.lock();
        devices.retain(|d| d.strong_count() > 0);
        devices
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|d| Some(d.id) != except)
            .collect()
    }
}

/// One device's view of a [`KvCloud`].
#[derive(Debug)]
pub struct MemoryKvStore {
    cloud: KvCloud,
    device: Arc<Device>,
    identity: RwLock<Option<String>>,
    pending: Mutex<BTreeMap<String, Option<Vec<u8>>>>,
    fail_sync: AtomicBool,
    calls: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryKvStore {
    /// A device attached to a private cloud.
    pub fn standalone(identity: Option<&str>) -> Self {
        KvCloud::new().attach(identity)
    }

    /// The cloud this device syncs with.
    pub fn cloud(&self) -> &KvCloud {
        &self.cloud
    }

    /// Signs the device in or out, announcing an account change.
    pub fn set_identity(&self, identity: Option<&str>) {
        *self.identity.write() = identity.map(str::to_string);
        let keys: Vec<String> = self.device.cache.read().keys().cloned().collect();
        let _ = self
            .device
            .changes
            .send(StoreChange::new(ChangeReason::AccountChange, keys));
    }

    /// Makes subsequent `synchronize` calls fail.
    pub fn set_fail_sync(&self, fail: bool) {
        self.fail_sync.store(fail, Ordering::SeqCst);
    }

    /// Number of reads, writes, removals and syncs so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of `set` calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of writes not yet pushed.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl KvStore for MemoryKvStore {
    fn identity(&self) -> Option<String> {
        self.identity.read().clone()
    }

    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        self.record_call();
        Ok(self.device.cache.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        self.record_call();
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.device
            .cache
            .write()
            .insert(key.to_string(), value.to_vec());
        self.pending
            .lock()
            .insert(key.to_string(), Some(value.to_vec()));
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.record_call();
        self.device.cache.write().remove(key);
        self.pending.lock().insert(key.to_string(), None);
        Ok(())
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        self.record_call();
        Ok(self.device.cache.read().keys().cloned().collect())
    }

    fn synchronize(&self) -> bool {
        self.record_call();
        if self.fail_sync.load(Ordering::SeqCst) || self.identity.read().is_none() {
            return false;
        }

        let updates = std::mem::take(&mut *self.pending.lock());
        if !updates.is_empty() {
            debug!(device = self.device.id, keys = updates.len(), "pushing pending values");
            self.cloud
                .publish(Some(self.device.id), ChangeReason::ServerChange, updates);
        }
        true
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.device.changes.subscribe()
    }
}
