//! CLI command implementations.

pub mod cloud;
pub mod gist;
pub mod inspect;
pub mod profile;

use listkeep_codec::{Snapshot, User};
use listkeep_storage::FileStore;
use listkeep_sync::{BackupReceipt, LocalLibrary};
use std::path::Path;
use std::sync::Arc;

/// Result type shared by the commands.
pub type CommandResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Opens the local data directory.
pub fn open_library(data_dir: &Path) -> CommandResult<LocalLibrary<FileStore>> {
    let store = FileStore::open(data_dir)?;
    Ok(LocalLibrary::new(Arc::new(store)))
}

/// Loads the stored profile, failing with a hint if there is none.
pub fn require_profile(library: &LocalLibrary<FileStore>) -> CommandResult<User> {
    library
        .load_profile()?
        .ok_or_else(|| "no profile stored; run `listkeep profile set` first".into())
}

pub(crate) fn print_receipt(backend: &str, receipt: &BackupReceipt) {
    println!(
        "{backend}: backup {} ({} bytes, captured {})",
        receipt.outcome,
        receipt.bytes,
        listkeep_codec::timestamp::format(&receipt.timestamp)
    );
}

/// Writes a restored snapshot into `user`'s local storage and reports what
/// changed.
pub(crate) fn apply_restored(
    backend: &str,
    library: &LocalLibrary<FileStore>,
    user: &User,
    snapshot: &Snapshot,
) -> CommandResult {
    library.apply_snapshot(&user.user_id, snapshot)?;
    println!(
        "{backend}: restored {} lists, {} deleted lists, {} items (captured {})",
        snapshot.lists().len(),
        snapshot.deleted_lists().len(),
        snapshot.item_count(),
        listkeep_codec::timestamp::format(&snapshot.timestamp())
    );
    Ok(())
}
