//! Entity records captured by a snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque identifier of a list or an item.
///
/// Generated ids are upper-case hyphenated UUID v4 strings. Any other
/// string is accepted when read back from storage or a remote document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Generates a fresh random id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().hyphenated().to_string().to_uppercase())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// The profile of the person whose lists are backed up.
///
/// The credential is part of the record and therefore part of every
/// snapshot, in plaintext. `Debug` output redacts it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Unique user id (an email address in practice).
    pub user_id: String,
    /// Sign-in credential.
    #[serde(rename = "password")]
    pub credential: String,
}

impl User {
    /// Creates a user record.
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        user_id: impl Into<String>,
        credential: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            user_id: user_id.into(),
            credential: credential.into(),
        }
    }

    /// Returns `"<first> <last>"`.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("user_id", &self.user_id)
            .field("credential", &"<redacted>")
            .finish()
    }
}

/// A named list, active or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRecord {
    /// Stable unique token.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Creation time.
    #[serde(with = "crate::timestamp")]
    pub created_at: DateTime<Utc>,
}

impl ListRecord {
    /// Creates a list with a fresh id, created now.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(EntityId::generate(), name, Utc::now())
    }

    /// Creates a list with every field given.
    pub fn with_id(id: impl Into<EntityId>, name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            created_at,
        }
    }

    /// Returns the name with surrounding whitespace removed.
    pub fn display_name(&self) -> &str {
        self.name.trim()
    }
}

/// An entry inside a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Stable unique token.
    pub id: EntityId,
    /// Display name.
    pub name: String,
    /// Whether the entry has been checked off.
    #[serde(default)]
    pub purchased: bool,
}

impl Item {
    /// Creates an unchecked item with a fresh id.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(EntityId::generate(), name, false)
    }

    /// Creates an item with every field given.
    pub fn with_id(id: impl Into<EntityId>, name: impl Into<String>, purchased: bool) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            purchased,
        }
    }
}
