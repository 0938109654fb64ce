//! # ListKeep Sync
//!
//! Backup and restore of a user's lists to remote storage.
//!
//! This crate provides:
//! - The sync orchestrator ([`SyncEngine`]) shared by every backend
//! - A remote Gist backend over a pluggable HTTP client
//! - A cloud key-value backend over a pluggable replicated store
//! - A status model observers can subscribe to
//! - A typed view of local storage ([`LocalLibrary`])
//!
//! ## Architecture
//!
//! A backup is a pure snapshot upload:
//! 1. Gather the items of the active lists from local storage
//! 2. Capture and encode a snapshot
//! 3. Find the user's existing backup by its derived name
//! 4. Update it in place, or create it
//!
//! A restore finds the same backup, downloads and decodes it, and hands
//! the snapshot back. The engine never writes local storage; callers decide
//! what to do with a restored snapshot.
//!
//! ## Key Invariants
//!
//! - At most one backup document or key per user
//! - Operations on one backend run one at a time
//! - Precondition failures make no transport call
//! - Every failure leaves the backend in the `error` status
//! - Nothing is retried automatically

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod cloud_kv;
mod config;
mod engine;
mod error;
pub mod gist;
mod local;
mod remote;
mod status;

pub use cloud_kv::{CloudKvBackend, CloudKvRemote, DataChanged, KvRecord, KvStore, StorageUsage};
pub use config::{
    CloudKvConfig, GistConfig, DEFAULT_APP_NAME, DEFAULT_GIST_API, GIST_ACCEPT, KV_MAX_VALUE_BYTES,
    KV_TOTAL_BUDGET_BYTES,
};
pub use engine::{BackupReceipt, SyncBackend, SyncEngine};
pub use error::{SyncError, SyncResult};
pub use gist::{GistBackend, GistHttpClient, GistIdentity, GistRemote};
pub use local::LocalLibrary;
pub use remote::{SnapshotRemote, WriteOutcome};
pub use status::{FlightGuard, SessionStats, SyncSession, SyncStatus};
