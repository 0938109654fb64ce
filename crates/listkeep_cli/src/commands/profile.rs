//! Profile command implementation.

use super::{require_profile, CommandResult};
use listkeep_codec::User;
use listkeep_storage::FileStore;
use listkeep_sync::LocalLibrary;

/// Prints the stored profile. The credential is never shown.
pub fn show(library: &LocalLibrary<FileStore>) -> CommandResult {
    let user = require_profile(library)?;
    println!("Name:       {}", user.full_name());
    println!("User id:    {}", user.user_id);
    println!("Credential: {}", mask(&user.credential));
    Ok(())
}

/// Stores a profile, replacing any previous one.
pub fn set(
    library: &LocalLibrary<FileStore>,
    first: String,
    last: String,
    id: String,
    credential: String,
) -> CommandResult {
    if id.trim().is_empty() {
        return Err("user id must not be empty".into());
    }
    let user = User::new(first, last, id.trim(), credential);
    library.save_profile(&user)?;
    println!("Saved profile for {}", user.user_id);
    Ok(())
}

fn mask(credential: &str) -> String {
    if credential.is_empty() {
        "(none)".to_string()
    } else {
        "*".repeat(credential.chars().count().min(8))
    }
}
