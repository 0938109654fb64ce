//! Gist command implementation.

use super::{apply_restored, print_receipt, require_profile, CommandResult};
use listkeep_storage::FileStore;
use listkeep_sync::gist::ReqwestClient;
use listkeep_sync::{GistBackend, GistConfig, LocalLibrary};

type Backend = GistBackend<ReqwestClient, FileStore>;

/// Builds a backend from the environment and authenticates it with `token`.
async fn connect(library: &LocalLibrary<FileStore>, token: &str) -> CommandResult<Backend> {
    let config = GistConfig::from_env();
    let client = ReqwestClient::new(config.timeout)?;
    let backend = GistBackend::gist(client, config, library.store().clone());

    let identity = backend.authenticate(token).await?;
    tracing::debug!(login = %identity.login, "authenticated");
    Ok(backend)
}

/// Verifies the token and prints the account it belongs to.
pub async fn auth(library: &LocalLibrary<FileStore>, token: &str) -> CommandResult {
    let backend = connect(library, token).await?;
    if let Some(identity) = backend.remote().identity() {
        println!("Authenticated as {} (id {})", identity.login, identity.id);
    }
    Ok(())
}

/// Uploads the profile's lists.
pub async fn backup(library: &LocalLibrary<FileStore>, token: &str) -> CommandResult {
    let user = require_profile(library)?;
    let lists = library.load_lists(&user.user_id)?;
    let deleted = library.load_deleted_lists(&user.user_id)?;

    let backend = connect(library, token).await?;
    let receipt = backend.backup(&user, &lists, &deleted).await?;
    print_receipt("gist", &receipt);
    Ok(())
}

/// Downloads the profile's backup and replaces local lists with it.
pub async fn restore(library: &LocalLibrary<FileStore>, token: &str) -> CommandResult {
    let user = require_profile(library)?;
    let backend = connect(library, token).await?;
    let snapshot = backend.restore(&user).await?;
    apply_restored("gist", library, &user, &snapshot)
}
