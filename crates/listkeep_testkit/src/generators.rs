//! Property-based test generators using proptest.
//!
//! Strategies produce records that satisfy the snapshot invariants: list
//! ids are unique within each set and items are keyed by active lists only.

use chrono::{DateTime, TimeZone, Utc};
use listkeep_codec::{EntityId, Item, ListRecord, Snapshot, User};
use proptest::prelude::*;
use std::collections::BTreeMap;

/// Strategy for generating entity ids in the generated (UUID) shape.
pub fn entity_id_strategy() -> impl Strategy<Value = EntityId> {
    prop::string::string_regex("[0-9A-F]{8}-[0-9A-F]{4}-4[0-9A-F]{3}-[89AB][0-9A-F]{3}-[0-9A-F]{12}")
        .expect("Invalid regex")
        .prop_map(|s: String| EntityId::from(s))
}

/// Strategy for generating timestamps with sub-second precision.
pub fn timestamp_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..4_102_444_800, 0u32..1_000_000_000).prop_map(|(secs, nanos)| {
        Utc.timestamp_opt(secs, nanos)
            .single()
            .expect("timestamp in range")
    })
}

/// Strategy for generating display names, including unicode and blanks.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::string::string_regex("[A-Za-z][A-Za-z0-9 ]{0,23}").expect("Invalid regex"),
        ".{0,16}",
    ]
}

/// Strategy for generating items.
pub fn item_strategy() -> impl Strategy<Value = Item> {
    (entity_id_strategy(), name_strategy(), any::<bool>())
        .prop_map(|(id, name, purchased)| Item::with_id(id, name, purchased))
}

/// Strategy for generating a list record.
pub fn list_strategy() -> impl Strategy<Value = ListRecord> {
    (entity_id_strategy(), name_strategy(), timestamp_strategy())
        .prop_map(|(id, name, created_at)| ListRecord::with_id(id, name, created_at))
}

/// Strategy for generating lists with unique ids.
pub fn unique_lists_strategy(max: usize) -> impl Strategy<Value = Vec<ListRecord>> {
    prop::collection::vec(list_strategy(), 0..=max).prop_map(|lists| {
        let mut seen = std::collections::HashSet::new();
        lists
            .into_iter()
            .filter(|l| seen.insert(l.id.clone()))
            .collect()
    })
}

/// Strategy for generating user profiles.
pub fn user_strategy() -> impl Strategy<Value = User> {
    (
        name_strategy(),
        name_strategy(),
        prop::string::string_regex("[a-z][a-z0-9.]{0,11}@[a-z]{1,8}\\.[a-z]{2,3}").expect("Invalid regex"),
        ".{0,16}",
    )
        .prop_map(|(first, last, user_id, credential)| User::new(first, last, user_id, credential))
}

/// Strategy for generating valid snapshots.
///
/// Some active lists have no items key at all and some have an empty item
/// list, matching what gathering from local storage produces.
pub fn snapshot_strategy() -> impl Strategy<Value = Snapshot> {
    (
        user_strategy(),
        unique_lists_strategy(6),
        unique_lists_strategy(3),
        prop::collection::vec(
            prop::option::of(prop::collection::vec(item_strategy(), 0..5)),
            6,
        ),
        timestamp_strategy(),
    )
        .prop_map(|(user, lists, deleted, item_slots, timestamp)| {
            let items: BTreeMap<String, Vec<Item>> = lists
                .iter()
                .zip(item_slots)
                .filter_map(|(list, slot)| slot.map(|items| (list.id.to_string(), items)))
                .collect();
            Snapshot::with_timestamp(user, lists, deleted, items, timestamp)
                .expect("generated snapshot is valid")
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use listkeep_codec::{decode_snapshot, encode_snapshot};

    proptest! {
        #[test]
        fn generated_snapshots_roundtrip(snapshot in snapshot_strategy()) {
            let bytes = encode_snapshot(&snapshot).unwrap();
            prop_assert_eq!(decode_snapshot(&bytes).unwrap(), snapshot);
        }

        #[test]
        fn unique_lists_have_unique_ids(lists in unique_lists_strategy(8)) {
            let mut ids: Vec<_> = lists.iter().map(|l| l.id.clone()).collect();
            ids.sort();
            ids.dedup();
            prop_assert_eq!(ids.len(), lists.len());
        }
    }
}
