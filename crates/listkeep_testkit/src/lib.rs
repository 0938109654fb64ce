//! # ListKeep Testkit
//!
//! Test utilities for ListKeep.
//!
//! This crate provides:
//! - Fixtures for the reference backup scenario
//! - Temporary file-backed stores
//! - Property-based generators for records and snapshots
//! - Payload sizing helpers for quota boundary tests
//!
//! ## Usage
//!
//! ```rust
//! use listkeep_testkit::prelude::*;
//!
//! let store = seeded_memory_store();
//! let user = sample_user();
//! assert_eq!(user.user_id, "a@b.com");
//! # let _ = store;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fixtures::*;
pub use generators::*;
