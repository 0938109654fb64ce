//! The sync orchestrator shared by every backend.

use crate::error::{SyncError, SyncResult};
use crate::local::LocalLibrary;
use crate::remote::{SnapshotRemote, WriteOutcome};
use crate::status::{SessionStats, SyncSession, SyncStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use listkeep_codec::{Decode, Encode, ListRecord, Snapshot, User};
use listkeep_storage::LocalStore;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

/// Result of a completed backup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupReceipt {
    /// Whether the remote document was created or updated.
    pub outcome: WriteOutcome,
    /// Size of the uploaded document.
    pub bytes: usize,
    /// Capture time written into the snapshot.
    pub timestamp: DateTime<Utc>,
}

/// Orchestrates backup and restore against one remote.
///
/// The engine gathers items from local storage, builds and encodes a
/// snapshot, and hands it to the remote. It never writes local storage;
/// callers apply a restored snapshot themselves, typically through
/// [`LocalLibrary::apply_snapshot`].
///
/// Operations on one engine run one at a time. Status moves to
/// [`SyncStatus::Syncing`] when an operation starts and to
/// [`SyncStatus::Success`] or [`SyncStatus::Error`] when it ends.
pub struct SyncEngine<R: SnapshotRemote, S: LocalStore> {
    remote: R,
    local: LocalLibrary<S>,
    session: SyncSession,
}

impl<R: SnapshotRemote, S: LocalStore> SyncEngine<R, S> {
    /// Creates an engine over `remote`, reading items from `store`.
    pub fn new(remote: R, store: Arc<S>) -> Self {
        Self {
            remote,
            local: LocalLibrary::new(store),
            session: SyncSession::new(),
        }
    }

    /// The remote this engine writes to.
    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Typed view of local storage.
    pub fn local(&self) -> &LocalLibrary<S> {
        &self.local
    }

    /// Session state of this engine.
    pub fn session(&self) -> &SyncSession {
        &self.session
    }

    /// Current status.
    pub fn status(&self) -> SyncStatus {
        self.session.status()
    }

    /// Time of the last successful operation.
    pub fn last_sync_date(&self) -> Option<DateTime<Utc>> {
        self.session.last_sync_date()
    }

    /// Returns true while an operation is running.
    pub fn is_busy(&self) -> bool {
        self.session.is_busy()
    }

    /// Session counters.
    pub fn stats(&self) -> SessionStats {
        self.session.stats()
    }

    /// Backs up `lists` and `deleted_lists` for `user`.
    ///
    /// Items are captured for active lists only. If the user already has a
    /// backup it is overwritten in place; otherwise a new one is created.
    ///
    /// # Errors
    ///
    /// Fails with the remote's precondition error before any remote call,
    /// with [`SyncError::QuotaExceeded`] before any write if the encoded
    /// snapshot is larger than the remote accepts, or with whatever the
    /// remote reports.
    pub async fn backup(
        &self,
        user: &User,
        lists: &[ListRecord],
        deleted_lists: &[ListRecord],
    ) -> SyncResult<BackupReceipt> {
        self.exclusive("backup", self.run_backup(user, lists, deleted_lists))
            .await
    }

    /// Fetches and decodes the user's most recent backup.
    ///
    /// # Errors
    ///
    /// Fails with [`SyncError::NotFound`] if the user has no backup, and
    /// with [`SyncError::Decoding`] if the stored document is unreadable.
    pub async fn restore(&self, user: &User) -> SyncResult<Snapshot> {
        self.exclusive("restore", self.run_restore(user)).await
    }

    /// Runs `operation` under the single-flight guard and publishes its
    /// outcome as the engine status.
    pub(crate) async fn exclusive<T, F>(&self, name: &'static str, operation: F) -> SyncResult<T>
    where
        F: Future<Output = SyncResult<T>>,
    {
        let _guard = self.session.begin(name).await;
        let result = operation.await;
        self.session.finish(name, result)
    }

    /// Rejects `payload` if the remote has a smaller limit.
    pub(crate) fn check_quota(&self, payload: &[u8]) -> SyncResult<()> {
        match self.remote.max_payload_bytes() {
            Some(limit) if payload.len() > limit => Err(SyncError::QuotaExceeded {
                size: payload.len(),
                limit,
            }),
            _ => Ok(()),
        }
    }

    async fn run_backup(
        &self,
        user: &User,
        lists: &[ListRecord],
        deleted_lists: &[ListRecord],
    ) -> SyncResult<BackupReceipt> {
        self.remote.ensure_ready()?;

        let items = self.local.gather_items(lists)?;
        let snapshot = Snapshot::capture(user.clone(), lists.to_vec(), deleted_lists.to_vec(), items)?;
        let payload = snapshot.encode()?;
        debug!(
            backend = self.remote.name(),
            lists = lists.len(),
            items = snapshot.item_count(),
            bytes = payload.len(),
            "encoded snapshot"
        );

        self.check_quota(&payload)?;

        let outcome = self.remote.write_snapshot(user, &payload).await?;
        info!(
            backend = self.remote.name(),
            %outcome,
            bytes = payload.len(),
            "backup stored"
        );

        Ok(BackupReceipt {
            outcome,
            bytes: payload.len(),
            timestamp: snapshot.timestamp(),
        })
    }

    async fn run_restore(&self, user: &User) -> SyncResult<Snapshot> {
        self.remote.ensure_ready()?;

        let payload = self
            .remote
            .read_snapshot(user)
            .await?
            .ok_or(SyncError::NotFound)?;

        let snapshot = Snapshot::decode(&payload).map_err(|e| SyncError::Decoding(e.to_string()))?;
        info!(
            backend = self.remote.name(),
            lists = snapshot.lists().len(),
            items = snapshot.item_count(),
            "backup restored"
        );
        Ok(snapshot)
    }
}

/// Object-safe view of a backend, for callers that pick one at runtime.
#[async_trait]
pub trait SyncBackend: Send + Sync {
    /// Short name of the backend.
    fn name(&self) -> &'static str;

    /// Current status.
    fn status(&self) -> SyncStatus;

    /// Subscribes to status changes.
    fn subscribe_status(&self) -> watch::Receiver<SyncStatus>;

    /// Time of the last successful operation.
    fn last_sync_date(&self) -> Option<DateTime<Utc>>;

    /// Returns true while an operation is running.
    fn is_busy(&self) -> bool;

    /// Returns true if the backend could start an operation now.
    fn is_ready(&self) -> bool;

    /// See [`SyncEngine::backup`].
    async fn backup(
        &self,
        user: &User,
        lists: &[ListRecord],
        deleted_lists: &[ListRecord],
    ) -> SyncResult<BackupReceipt>;

    /// See [`SyncEngine::restore`].
    async fn restore(&self, user: &User) -> SyncResult<Snapshot>;
}

#[async_trait]
impl<R, S> SyncBackend for SyncEngine<R, S>
where
    R: SnapshotRemote,
    S: LocalStore,
{
    fn name(&self) -> &'static str {
        self.remote.name()
    }

    fn status(&self) -> SyncStatus {
        self.session.status()
    }

    fn subscribe_status(&self) -> watch::Receiver<SyncStatus> {
        self.session.subscribe()
    }

    fn last_sync_date(&self) -> Option<DateTime<Utc>> {
        self.session.last_sync_date()
    }

    fn is_busy(&self) -> bool {
        self.session.is_busy()
    }

    fn is_ready(&self) -> bool {
        self.remote.is_ready()
    }

    async fn backup(
        &self,
        user: &User,
        lists: &[ListRecord],
        deleted_lists: &[ListRecord],
    ) -> SyncResult<BackupReceipt> {
        SyncEngine::backup(self, user, lists, deleted_lists).await
    }

    async fn restore(&self, user: &User) -> SyncResult<Snapshot> {
        SyncEngine::restore(self, user).await
    }
}
