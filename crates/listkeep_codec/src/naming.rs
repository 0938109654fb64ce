//! Names derived from a user: remote labels, file names and storage keys.

use crate::model::{EntityId, User};

/// Key under which the local profile record is stored.
pub const PROFILE_KEY: &str = "profile";

/// Replaces characters that remote file names and keys reject.
///
/// `@` and `.` both become `_`, so `"a.b@c.com"` maps to `"a_b_c_com"`.
pub fn sanitize_user_id(user_id: &str) -> String {
    user_id.replace(['@', '.'], "_")
}

/// Label that identifies a user's backup document among many.
///
/// Matched case-sensitively and exactly when looking for a prior backup.
pub fn backup_label(app_name: &str, user: &User) -> String {
    format!("{app_name} Backup - {} {}", user.first_name, user.last_name)
}

/// Prefix shared by every backup file name written by `app_name`.
pub fn backup_file_prefix(app_name: &str) -> String {
    format!("{}_backup", app_name.to_lowercase())
}

/// File name holding a user's snapshot inside a backup document.
pub fn backup_filename(app_name: &str, user: &User) -> String {
    format!(
        "{}_{}.json",
        backup_file_prefix(app_name),
        sanitize_user_id(&user.user_id)
    )
}

/// Direct key of a user's snapshot in a key-value store.
pub fn backup_key(prefix: &str, user: &User) -> String {
    format!("{prefix}{}", sanitize_user_id(&user.user_id))
}

/// Local key of a list's items.
pub fn items_key(list_id: &EntityId) -> String {
    format!("items_{list_id}")
}

/// Local key of a user's active lists.
pub fn lists_key(user_id: &str) -> String {
    format!("lists_{user_id}")
}

/// Local key of a user's deleted lists.
pub fn deleted_lists_key(user_id: &str) -> String {
    format!("deletedLists_{user_id}")
}
