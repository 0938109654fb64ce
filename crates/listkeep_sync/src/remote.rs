//! The seam between the orchestrator and a storage location.

use crate::error::SyncResult;
use async_trait::async_trait;
use listkeep_codec::User;

/// How a backup landed on the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// No prior backup existed; a new one was created.
    Created,
    /// A prior backup was overwritten in place.
    Updated,
}

impl std::fmt::Display for WriteOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteOutcome::Created => f.write_str("created"),
            WriteOutcome::Updated => f.write_str("updated"),
        }
    }
}

/// A place that holds at most one snapshot document per user.
///
/// Implementations locate the user's document by a name derived from the
/// [`User`], never by remembered state, so a fresh instance finds backups
/// written by an earlier one.
#[async_trait]
pub trait SnapshotRemote: Send + Sync {
    /// Short name for logs and status displays.
    fn name(&self) -> &'static str;

    /// Checks that the remote can be used right now.
    ///
    /// Called before anything else in an operation; a failure here means no
    /// transport call is made.
    fn ensure_ready(&self) -> SyncResult<()>;

    /// Returns true if [`SnapshotRemote::ensure_ready`] would succeed.
    fn is_ready(&self) -> bool {
        self.ensure_ready().is_ok()
    }

    /// Largest payload the remote accepts, if it has a limit.
    fn max_payload_bytes(&self) -> Option<usize> {
        None
    }

    /// Stores `payload` as the user's backup, replacing any prior one.
    async fn write_snapshot(&self, user: &User, payload: &[u8]) -> SyncResult<WriteOutcome>;

    /// Fetches the user's backup, or `None` if there is none.
    async fn read_snapshot(&self, user: &User) -> SyncResult<Option<Vec<u8>>>;
}
