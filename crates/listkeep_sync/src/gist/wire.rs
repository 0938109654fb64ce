//! JSON shapes exchanged with the Gist API.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The authenticated account, as returned by `GET /user`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GistIdentity {
    /// Account login.
    pub login: String,
    /// Numeric account id.
    pub id: u64,
}

/// One file inside a document.
///
/// Listings omit `content`; a full fetch includes it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GistFile {
    /// File name, echoed by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    /// Raw file text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl GistFile {
    /// A file named `filename` carrying `content`.
    pub fn named(filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            filename: Some(filename.into()),
            content: Some(content.into()),
        }
    }
}

/// A document as returned by listing or fetching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GistDocument {
    /// Server-assigned id.
    pub id: String,
    /// Free-text label; `null` when never set.
    #[serde(default)]
    pub description: Option<String>,
    /// Visibility.
    #[serde(default)]
    pub public: bool,
    /// Files keyed by name.
    #[serde(default)]
    pub files: BTreeMap<String, GistFile>,
}

/// Body of a create or update request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GistWrite {
    /// Label to set.
    pub description: String,
    /// Visibility; backups are always private.
    pub public: bool,
    /// Files to write.
    pub files: BTreeMap<String, GistFile>,
}

impl GistWrite {
    /// A private document holding one file.
    pub fn private_file(
        description: impl Into<String>,
        filename: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let filename = filename.into();
        let mut files = BTreeMap::new();
        files.insert(filename.clone(), GistFile::named(filename, content));
        Self {
            description: description.into(),
            public: false,
            files,
        }
    }
}
