//! # ListKeep Storage
//!
//! Local key-value storage for ListKeep.
//!
//! This crate provides the storage collaborator the sync layer reads from
//! and callers restore into. Stores are **opaque byte maps** keyed by
//! string - they do not interpret the values they hold.
//!
//! ## Design Principles
//!
//! - Stores are simple byte maps (get, set, remove)
//! - No knowledge of lists, items or snapshot formats
//! - Must be `Send + Sync` so one store can be shared between the
//!   application and several sync backends
//! - Keys are namespaced by entity kind and id (e.g. `items_<listId>`)
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - For testing and ephemeral state
//! - [`FileStore`] - One file per key inside a directory
//!
//! ## Example
//!
//! ```rust
//! use listkeep_storage::{InMemoryStore, LocalStore};
//!
//! let store = InMemoryStore::new();
//! store.set_bytes("profile", b"{}").unwrap();
//! assert_eq!(store.get_bytes("profile").unwrap(), Some(b"{}".to_vec()));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;
mod memory;
mod store;

pub use error::{StorageError, StorageResult};
pub use file::FileStore;
pub use memory::InMemoryStore;
pub use store::LocalStore;
