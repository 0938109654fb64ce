//! Directory-backed store for persistent storage.

use crate::error::{StorageError, StorageResult};
use crate::store::LocalStore;
use parking_lot::Mutex;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

const VALUE_EXTENSION: &str = "val";
const TEMP_EXTENSION: &str = "tmp";

/// A directory-backed local store.
///
/// Each key is persisted as its own file inside the store directory.
/// Data survives process restarts.
///
/// # Durability
///
/// Writes go to a temporary file which is synced and then renamed over the
/// previous value, so a crash never leaves a partially written value.
///
/// # Key Encoding
///
/// Keys may contain any character. Characters outside `[A-Za-z0-9_@-]`
/// are written as `%XX` escapes of their UTF-8 bytes in the file name.
///
/// # Example
///
/// ```no_run
/// use listkeep_storage::{FileStore, LocalStore};
/// use std::path::Path;
///
/// let store = FileStore::open(Path::new("listkeep-data")).unwrap();
/// store.set_bytes("profile", b"{}").unwrap();
/// ```
#[derive(Debug)]
pub struct FileStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Opens the store at `root`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(root: &Path) -> StorageResult<Self> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            write_lock: Mutex::new(()),
        })
    }

    /// Returns the store directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.root
    }

    fn value_path(&self, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self
            .root
            .join(format!("{}.{}", encode_key(key), VALUE_EXTENSION)))
    }
}

impl LocalStore for FileStore {
    fn get_bytes(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let path = self.value_path(key)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_bytes(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        let path = self.value_path(key)?;
        let temp = path.with_extension(TEMP_EXTENSION);

        let _guard = self.write_lock.lock();
        let mut file = File::create(&temp)?;
        file.write_all(value)?;
        file.sync_all()?;
        fs::rename(&temp, &path)?;

        debug!(key, bytes = value.len(), "stored value");
        Ok(())
    }

    fn remove_key(&self, key: &str) -> StorageResult<()> {
        let path = self.value_path(key)?;
        let _guard = self.write_lock.lock();
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn keys(&self) -> StorageResult<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(VALUE_EXTENSION) {
                continue;
            }
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .ok_or_else(|| StorageError::Corrupted(format!("unreadable file name {path:?}")))?;
            keys.push(decode_key(stem)?);
        }
        keys.sort();
        Ok(keys)
    }
}

fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_' | b'@' | b'-' => out.push(byte as char),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

fn decode_key(name: &str) -> StorageResult<String> {
    let corrupted = || StorageError::Corrupted(format!("bad key encoding {name:?}"));
    let raw = name.as_bytes();
    let mut bytes = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'%' {
            let hex = name.get(i + 1..i + 3).ok_or_else(corrupted)?;
            bytes.push(u8::from_str_radix(hex, 16).map_err(|_| corrupted())?);
            i += 3;
        } else {
            bytes.push(raw[i]);
            i += 1;
        }
    }
    String::from_utf8(bytes).map_err(|_| corrupted())
}
