//! A key-value store kept in a shared directory.
//!
//! Stands in for the ambient cloud store between separate processes: every
//! process pointed at the same directory sees the same values. Writes land
//! immediately, so `synchronize` only checks that the directory is still
//! reachable. No change events are produced; other processes observe new
//! values on their next read.

use super::store::{KvStore, StoreChange};
use listkeep_storage::{FileStore, LocalStore, StorageResult};
use std::path::Path;
use tokio::sync::broadcast;

/// [`KvStore`] over a [`FileStore`] directory.
#[derive(Debug)]
pub struct DirectoryKvStore {
    files: FileStore,
    identity: Option<String>,
    changes: broadcast::Sender<StoreChange>,
}

impl DirectoryKvStore {
    /// Opens the store at `dir` for `identity`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(dir: &Path, identity: Option<String>) -> StorageResult<Self> {
        let (changes, _) = broadcast::channel(1);
        Ok(Self {
            files: FileStore::open(dir)?,
            identity,
            changes,
        })
    }

    /// The shared directory.
    pub fn path(&self) -> &Path {
        self.files.path()
    }
}

impl KvStore for DirectoryKvStore {
    fn identity(&self) -> Option<String> {
        self.identity.clone()
    }

    fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        self.files.get_bytes(key)
    }

    fn set(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        self.files.set_bytes(key, value)
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        self.files.remove_key(key)
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        self.files.keys()
    }

    fn synchronize(&self) -> bool {
        self.identity.is_some() && self.files.path().is_dir()
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }
}
