//! Test fixtures and storage helpers.

use chrono::{DateTime, TimeZone, Utc};
use listkeep_codec::naming::items_key;
use listkeep_codec::{encode_items, encode_snapshot, EntityId, Item, ListRecord, Snapshot, User};
use listkeep_storage::{FileStore, InMemoryStore, LocalStore};
use std::collections::BTreeMap;
use std::sync::Arc;
use tempfile::TempDir;

/// The user from the reference backup scenario.
pub fn sample_user() -> User {
    User::new("A", "B", "a@b.com", "secret")
}

/// A fixed point in time, for deterministic records.
pub fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 7, 29, 12, 0, 0)
        .single()
        .expect("valid fixed time")
}

/// The `Groceries` list with id `L1`.
pub fn groceries() -> ListRecord {
    ListRecord::with_id("L1", "Groceries", fixed_time())
}

/// The items of [`groceries`]: a single unchecked `Milk`.
pub fn groceries_items() -> Vec<Item> {
    vec![Item::with_id("I1", "Milk", false)]
}

/// Writes `items` under the list's items key.
pub fn seed_items<S: LocalStore + ?Sized>(store: &S, list_id: &EntityId, items: &[Item]) {
    let bytes = encode_items(items).expect("items encode");
    store
        .set_bytes(&items_key(list_id), &bytes)
        .expect("seed items");
}

/// An in-memory store holding the reference scenario's items.
pub fn seeded_memory_store() -> Arc<InMemoryStore> {
    let store = Arc::new(InMemoryStore::new());
    seed_items(store.as_ref(), &groceries().id, &groceries_items());
    store
}

/// A file store in a temporary directory that is removed on drop.
pub struct TempFileStore {
    /// The store.
    pub store: Arc<FileStore>,
    _dir: TempDir,
}

impl TempFileStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let store = FileStore::open(dir.path()).expect("Failed to open file store");
        Self {
            store: Arc::new(store),
            _dir: dir,
        }
    }
}

impl Default for TempFileStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds items for `list` so that a snapshot of `user` holding only
/// `list` encodes to exactly `target` bytes.
///
/// The padding goes into a single item name. The snapshot timestamp is
/// always whole seconds, so the encoded length does not depend on when the
/// snapshot is captured.
///
/// Returns `None` if `target` is smaller than the unpadded encoding.
pub fn items_for_encoded_size(user: &User, list: &ListRecord, target: usize) -> Option<Vec<Item>> {
    let encoded_len = |name: String| {
        let items = vec![Item::with_id("PAD", name, false)];
        let mut map = BTreeMap::new();
        map.insert(list.id.to_string(), items.clone());
        let snapshot = Snapshot::with_timestamp(user.clone(), vec![list.clone()], vec![], map, fixed_time())
            .expect("valid snapshot");
        (encode_snapshot(&snapshot).expect("snapshot encodes").len(), items)
    };

    let (base, _) = encoded_len(String::new());
    let padding = target.checked_sub(base)?;
    let (len, items) = encoded_len("x".repeat(padding));
    debug_assert_eq!(len, target);
    Some(items)
}
