//! Typed view over the local key-value storage.

use crate::error::SyncResult;
use listkeep_codec::naming::{deleted_lists_key, items_key, lists_key, PROFILE_KEY};
use listkeep_codec::{Decode, Encode, EntityId, Item, ListRecord, Snapshot, User};
use listkeep_storage::LocalStore;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Reads and writes the app's records in a [`LocalStore`].
///
/// Cloning is cheap; clones share the store.
#[derive(Debug)]
pub struct LocalLibrary<S: LocalStore> {
    store: Arc<S>,
}

impl<S: LocalStore> Clone for LocalLibrary<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: LocalStore> LocalLibrary<S> {
    /// Wraps a shared store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Loads the stored profile, if one was saved.
    pub fn load_profile(&self) -> SyncResult<Option<User>> {
        self.load(PROFILE_KEY)
    }

    /// Saves the profile.
    pub fn save_profile(&self, user: &User) -> SyncResult<()> {
        self.save(PROFILE_KEY, user)
    }

    /// Loads a user's active lists. Missing means empty.
    pub fn load_lists(&self, user_id: &str) -> SyncResult<Vec<ListRecord>> {
        Ok(self.load(&lists_key(user_id))?.unwrap_or_default())
    }

    /// Saves a user's active lists.
    pub fn save_lists(&self, user_id: &str, lists: &[ListRecord]) -> SyncResult<()> {
        self.save(&lists_key(user_id), &lists.to_vec())
    }

    /// Loads a user's deleted lists. Missing means empty.
    pub fn load_deleted_lists(&self, user_id: &str) -> SyncResult<Vec<ListRecord>> {
        Ok(self.load(&deleted_lists_key(user_id))?.unwrap_or_default())
    }

    /// Saves a user's deleted lists.
    pub fn save_deleted_lists(&self, user_id: &str, lists: &[ListRecord]) -> SyncResult<()> {
        self.save(&deleted_lists_key(user_id), &lists.to_vec())
    }

    /// Loads the items of one list.
    pub fn load_items(&self, list_id: &EntityId) -> SyncResult<Option<Vec<Item>>> {
        self.load(&items_key(list_id))
    }

    /// Saves the items of one list.
    pub fn save_items(&self, list_id: &EntityId, items: &[Item]) -> SyncResult<()> {
        self.save(&items_key(list_id), &items.to_vec())
    }

    /// Removes the items of one list.
    pub fn remove_items(&self, list_id: &EntityId) -> SyncResult<()> {
        self.store.remove_key(&items_key(list_id))?;
        Ok(())
    }

    /// Collects the items of `lists`, keyed by list id.
    ///
    /// A list whose items are absent or cannot be decoded is left out of
    /// the map. Storage failures are returned.
    pub fn gather_items(&self, lists: &[ListRecord]) -> SyncResult<BTreeMap<String, Vec<Item>>> {
        let mut gathered = BTreeMap::new();

        for list in lists {
            let Some(bytes) = self.store.get_bytes(&items_key(&list.id))? else {
                debug!(list_id = %list.id, "no stored items for list");
                continue;
            };

            match Vec::<Item>::decode(&bytes) {
                Ok(items) => {
                    gathered.insert(list.id.to_string(), items);
                }
                Err(e) => {
                    warn!(list_id = %list.id, error = %e, "skipping undecodable items");
                }
            }
        }

        Ok(gathered)
    }

    /// Replaces the local state of `user_id` with the snapshot's contents.
    ///
    /// Lists and deleted lists are overwritten, every items key in the
    /// snapshot is written, and items of lists that were active locally but
    /// are not active in the snapshot are removed. The snapshot's own user
    /// is not consulted, so a backup written under another id still lands
    /// in the caller's profile.
    pub fn apply_snapshot(&self, user_id: &str, snapshot: &Snapshot) -> SyncResult<()> {
        let previous = self.load_lists(user_id).unwrap_or_else(|e| {
            warn!(error = %e, "ignoring undecodable local lists while restoring");
            Vec::new()
        });

        let incoming: HashSet<&EntityId> = snapshot.lists().iter().map(|l| &l.id).collect();
        for stale in previous.iter().filter(|l| !incoming.contains(&l.id)) {
            self.remove_items(&stale.id)?;
        }

        for list in snapshot.lists() {
            if let Some(items) = snapshot.items_for(&list.id) {
                self.save_items(&list.id, items)?;
            }
        }

        self.save_lists(user_id, snapshot.lists())?;
        self.save_deleted_lists(user_id, snapshot.deleted_lists())?;

        debug!(
            lists = snapshot.lists().len(),
            deleted = snapshot.deleted_lists().len(),
            items = snapshot.item_count(),
            "applied snapshot to local storage"
        );
        Ok(())
    }

    fn load<T: Decode>(&self, key: &str) -> SyncResult<Option<T>> {
        match self.store.get_bytes(key)? {
            Some(bytes) => Ok(Some(T::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn save<T: Encode>(&self, key: &str, value: &T) -> SyncResult<()> {
        let bytes = value.encode()?;
        self.store.set_bytes(key, &bytes)?;
        Ok(())
    }
}
