//! Inspect command implementation.

use super::{require_profile, CommandResult};
use listkeep_storage::FileStore;
use listkeep_sync::LocalLibrary;
use serde::Serialize;

/// Local state of the profile's user.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// User id the lists belong to.
    pub user_id: String,
    /// Active lists.
    pub lists: Vec<ListSummary>,
    /// Deleted lists.
    pub deleted_lists: Vec<ListSummary>,
    /// Total items across active lists.
    pub total_items: usize,
}

/// One list and its item counts.
#[derive(Debug, Serialize)]
pub struct ListSummary {
    /// List id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Number of stored items, if any are stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<usize>,
    /// Number of purchased items.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchased: Option<usize>,
}

/// Collects the inspection result.
pub fn collect(library: &LocalLibrary<FileStore>) -> CommandResult<InspectResult> {
    let user = require_profile(library)?;

    let summarize = |lists: Vec<listkeep_codec::ListRecord>| -> CommandResult<Vec<ListSummary>> {
        lists
            .into_iter()
            .map(|list| {
                let items = library.load_items(&list.id)?;
                Ok(ListSummary {
                    id: list.id.to_string(),
                    name: list.display_name().to_string(),
                    items: items.as_ref().map(Vec::len),
                    purchased: items
                        .as_ref()
                        .map(|items| items.iter().filter(|i| i.purchased).count()),
                })
            })
            .collect()
    };

    let lists = summarize(library.load_lists(&user.user_id)?)?;
    let deleted_lists = summarize(library.load_deleted_lists(&user.user_id)?)?;
    let total_items = lists.iter().filter_map(|l| l.items).sum();

    Ok(InspectResult {
        user_id: user.user_id,
        lists,
        deleted_lists,
        total_items,
    })
}

/// Runs the inspect command.
pub fn run(library: &LocalLibrary<FileStore>, format: &str) -> CommandResult {
    let result = collect(library)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        "text" => {
            println!("User: {}", result.user_id);
            println!("Lists ({}):", result.lists.len());
            for list in &result.lists {
                print_list(list);
            }
            println!("Deleted lists ({}):", result.deleted_lists.len());
            for list in &result.deleted_lists {
                print_list(list);
            }
            println!("Total items: {}", result.total_items);
        }
        other => return Err(format!("unknown format {other:?}; use text or json").into()),
    }
    Ok(())
}

fn print_list(list: &ListSummary) {
    match (list.items, list.purchased) {
        (Some(items), Some(purchased)) => {
            println!("  {} [{}] {items} items, {purchased} purchased", list.name, list.id)
        }
        _ => println!("  {} [{}] no stored items", list.name, list.id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::open_library;
    use listkeep_codec::{Item, ListRecord};
    use listkeep_testkit::{fixed_time, groceries, groceries_items, sample_user};
    use tempfile::tempdir;

    #[test]
    fn counts_items_per_list() {
        let dir = tempdir().unwrap();
        let library = open_library(dir.path()).unwrap();
        let user = sample_user();
        library.save_profile(&user).unwrap();

        let bare = ListRecord::with_id("L2", "Hardware", fixed_time());
        library
            .save_lists(&user.user_id, &[groceries(), bare])
            .unwrap();
        let mut items = groceries_items();
        items.push(Item::with_id("I2", "Eggs", true));
        library.save_items(&groceries().id, &items).unwrap();

        let result = collect(&library).unwrap();
        assert_eq!(result.lists[0].items, Some(2));
        assert_eq!(result.lists[0].purchased, Some(1));
        assert_eq!(result.lists[1].items, None);
        assert_eq!(result.total_items, 2);
        assert!(result.deleted_lists.is_empty());
    }

    #[test]
    fn unknown_format_fails() {
        let dir = tempdir().unwrap();
        let library = open_library(dir.path()).unwrap();
        library.save_profile(&sample_user()).unwrap();
        assert!(run(&library, "yaml").is_err());
    }
}
