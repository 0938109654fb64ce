//! The backup snapshot and its document encoding.

use crate::error::{CodecError, CodecResult};
use crate::model::{EntityId, Item, ListRecord, User};
use crate::{Decode, Encode};
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Schema tag written into every snapshot.
pub const SNAPSHOT_VERSION: &str = "1.0.0";

/// A complete, immutable copy of one user's list state.
///
/// Built immediately before an upload, or decoded from a remote document
/// on restore. The encoded form is pretty-printed JSON with camelCase
/// field names and the `items` map in key order, so equal snapshots always
/// encode to equal bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    user: User,
    lists: Vec<ListRecord>,
    deleted_lists: Vec<ListRecord>,
    items: BTreeMap<String, Vec<Item>>,
    #[serde(with = "crate::timestamp")]
    timestamp: DateTime<Utc>,
    version: String,
}

impl Snapshot {
    /// Captures a snapshot stamped with the current time (whole seconds).
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::InvalidSnapshot`] if list ids repeat within
    /// `lists` or within `deleted_lists`, or if `items` is keyed by a list
    /// that is not in `lists`.
    pub fn capture(
        user: User,
        lists: Vec<ListRecord>,
        deleted_lists: Vec<ListRecord>,
        items: BTreeMap<String, Vec<Item>>,
    ) -> CodecResult<Self> {
        Self::with_timestamp(user, lists, deleted_lists, items, Utc::now().trunc_subsecs(0))
    }

    /// Captures a snapshot with an explicit timestamp.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Snapshot::capture`].
    pub fn with_timestamp(
        user: User,
        lists: Vec<ListRecord>,
        deleted_lists: Vec<ListRecord>,
        items: BTreeMap<String, Vec<Item>>,
        timestamp: DateTime<Utc>,
    ) -> CodecResult<Self> {
        ensure_unique("lists", &lists)?;
        ensure_unique("deletedLists", &deleted_lists)?;

        let active: HashSet<&str> = lists.iter().map(|l| l.id.as_str()).collect();
        if let Some(orphan) = items.keys().find(|k| !active.contains(k.as_str())) {
            return Err(CodecError::invalid_snapshot(format!(
                "items keyed by list {orphan} which is not an active list"
            )));
        }

        Ok(Self {
            user,
            lists,
            deleted_lists,
            items,
            timestamp,
            version: SNAPSHOT_VERSION.to_string(),
        })
    }

    /// The profile the snapshot belongs to.
    pub fn user(&self) -> &User {
        &self.user
    }

    /// Active lists, in their original order.
    pub fn lists(&self) -> &[ListRecord] {
        &self.lists
    }

    /// Deleted lists, in their original order.
    pub fn deleted_lists(&self) -> &[ListRecord] {
        &self.deleted_lists
    }

    /// Items of active lists, keyed by list id.
    pub fn items(&self) -> &BTreeMap<String, Vec<Item>> {
        &self.items
    }

    /// Items captured for one list, if its key was present.
    pub fn items_for(&self, list_id: &EntityId) -> Option<&[Item]> {
        self.items.get(list_id.as_str()).map(Vec::as_slice)
    }

    /// When the snapshot was captured.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Schema tag.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Total number of items across all lists.
    pub fn item_count(&self) -> usize {
        self.items.values().map(Vec::len).sum()
    }
}

fn ensure_unique(field: &str, lists: &[ListRecord]) -> CodecResult<()> {
    let mut seen = HashSet::with_capacity(lists.len());
    for list in lists {
        if !seen.insert(list.id.as_str()) {
            return Err(CodecError::invalid_snapshot(format!(
                "duplicate list id {} in {field}",
                list.id
            )));
        }
    }
    Ok(())
}

impl Encode for Snapshot {
    fn encode(&self) -> CodecResult<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| CodecError::encoding_failed(e.to_string()))
    }
}

impl Decode for Snapshot {
    fn decode(bytes: &[u8]) -> CodecResult<Self> {
        let snapshot: Snapshot =
            serde_json::from_slice(bytes).map_err(|e| CodecError::decoding_failed(e.to_string()))?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(CodecError::UnsupportedVersion {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION.to_string(),
            });
        }

        Ok(snapshot)
    }
}

/// Encodes a snapshot into its document bytes.
pub fn encode_snapshot(snapshot: &Snapshot) -> CodecResult<Vec<u8>> {
    snapshot.encode()
}

/// Decodes a snapshot document.
pub fn decode_snapshot(bytes: &[u8]) -> CodecResult<Snapshot> {
    Snapshot::decode(bytes)
}
