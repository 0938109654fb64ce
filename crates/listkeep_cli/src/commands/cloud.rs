//! Cloud key-value command implementation.

use super::{apply_restored, print_receipt, require_profile, CommandResult};
use listkeep_storage::FileStore;
use listkeep_sync::cloud_kv::DirectoryKvStore;
use listkeep_sync::{CloudKvBackend, CloudKvConfig, LocalLibrary};
use std::path::Path;

/// Backend over a shared directory.
pub type Backend = CloudKvBackend<DirectoryKvStore, FileStore>;

/// Opens the store in `cloud_dir` as `identity`.
pub fn open(
    library: &LocalLibrary<FileStore>,
    cloud_dir: &Path,
    identity: Option<String>,
) -> CommandResult<Backend> {
    let store = DirectoryKvStore::open(cloud_dir, identity)?;
    Ok(CloudKvBackend::cloud_kv(
        store,
        CloudKvConfig::default(),
        library.store().clone(),
    ))
}

/// Uploads the profile's lists.
pub async fn backup(backend: &Backend, library: &LocalLibrary<FileStore>) -> CommandResult {
    let user = require_profile(library)?;
    let lists = library.load_lists(&user.user_id)?;
    let deleted = library.load_deleted_lists(&user.user_id)?;

    let receipt = backend.backup(&user, &lists, &deleted).await?;
    print_receipt("cloud", &receipt);
    Ok(())
}

/// Downloads the profile's backup and replaces local lists with it.
pub async fn restore(backend: &Backend, library: &LocalLibrary<FileStore>) -> CommandResult {
    let user = require_profile(library)?;
    let snapshot = backend.restore(&user).await?;
    apply_restored("cloud", library, &user, &snapshot)
}

/// Prints availability and storage usage.
pub fn status(backend: &Backend) -> CommandResult {
    if !backend.refresh_availability() {
        println!("Cloud store: not available (no identity on this device)");
        return Ok(());
    }

    let usage = backend.storage_usage()?;
    println!("Cloud store: available at {}", backend.remote().store().path().display());
    println!(
        "Usage: {} of {} bytes across {} keys ({} bytes free)",
        usage.used_bytes,
        usage.budget_bytes,
        usage.keys,
        usage.remaining_bytes()
    );
    Ok(())
}
