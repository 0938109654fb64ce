//! # ListKeep Codec
//!
//! Snapshot model and canonical backup encoding for ListKeep.
//!
//! This crate provides the document both sync backends upload and
//! download. The encoding guarantees:
//! - Identical snapshots produce identical bytes
//! - Dates are readable RFC 3339 UTC text on every platform
//! - Decoding is all-or-nothing
//!
//! ## Document Rules
//!
//! - Pretty-printed JSON, camelCase field names
//! - The `items` map is keyed by list id, in sorted order
//! - `version` is the fixed tag [`SNAPSHOT_VERSION`]; other versions are
//!   rejected on decode
//!
//! ## Usage
//!
//! ```
//! use listkeep_codec::{decode_snapshot, encode_snapshot, Snapshot, User};
//! use std::collections::BTreeMap;
//!
//! let user = User::new("A", "B", "a@b.com", "secret");
//! let snapshot = Snapshot::capture(user, vec![], vec![], BTreeMap::new()).unwrap();
//!
//! let bytes = encode_snapshot(&snapshot).unwrap();
//! assert_eq!(decode_snapshot(&bytes).unwrap(), snapshot);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod model;
pub mod naming;
mod records;
mod snapshot;
pub mod timestamp;

pub use error::{CodecError, CodecResult};
pub use model::{EntityId, Item, ListRecord, User};
pub use naming::sanitize_user_id;
pub use records::{decode_items, encode_items};
pub use snapshot::{decode_snapshot, encode_snapshot, Snapshot, SNAPSHOT_VERSION};

/// Trait for records that can be encoded to bytes.
///
/// Implemented only for the concrete record types that are stored or
/// uploaded: [`Snapshot`], [`User`], list sequences and item sequences.
pub trait Encode {
    /// Encode this value to bytes.
    fn encode(&self) -> CodecResult<Vec<u8>>;
}

/// Trait for records that can be decoded from bytes.
pub trait Decode: Sized {
    /// Decode a value from bytes.
    fn decode(bytes: &[u8]) -> CodecResult<Self>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn id_strategy() -> impl Strategy<Value = EntityId> {
        "[A-Z0-9]{1,8}".prop_map(|s| EntityId::from(s))
    }

    fn time_strategy() -> impl Strategy<Value = chrono::DateTime<Utc>> {
        (0i64..4_000_000_000, 0u32..1_000_000_000)
            .prop_map(|(secs, nanos)| Utc.timestamp_opt(secs, nanos).unwrap())
    }

    fn item_strategy() -> impl Strategy<Value = Item> {
        (id_strategy(), ".{0,12}", any::<bool>())
            .prop_map(|(id, name, done)| Item::with_id(id, name, done))
    }

    fn snapshot_strategy() -> impl Strategy<Value = Snapshot> {
        (
            prop::collection::btree_map("[A-Z0-9]{1,8}", time_strategy(), 1..5),
            prop::collection::btree_map("[a-z0-9]{1,8}", time_strategy(), 1..4),
            prop::collection::vec(prop::collection::vec(item_strategy(), 0..4), 1..5),
            (".{0,8}", ".{0,8}", "[a-z.@]{1,16}", ".{0,8}"),
            time_strategy(),
        )
            .prop_map(|(active, deleted, item_lists, (first, last, uid, cred), at)| {
                let lists: Vec<ListRecord> = active
                    .into_iter()
                    .map(|(id, created)| ListRecord::with_id(id, "list", created))
                    .collect();
                let deleted: Vec<ListRecord> = deleted
                    .into_iter()
                    .map(|(id, created)| ListRecord::with_id(id, "gone", created))
                    .collect();
                let items: BTreeMap<String, Vec<Item>> = lists
                    .iter()
                    .zip(item_lists)
                    .map(|(list, items)| (list.id.to_string(), items))
                    .collect();
                Snapshot::with_timestamp(User::new(first, last, uid, cred), lists, deleted, items, at)
                    .unwrap()
            })
    }

    proptest! {
        #[test]
        fn snapshot_roundtrip(snapshot in snapshot_strategy()) {
            let bytes = encode_snapshot(&snapshot).unwrap();
            prop_assert_eq!(decode_snapshot(&bytes).unwrap(), snapshot);
        }
    }
}
