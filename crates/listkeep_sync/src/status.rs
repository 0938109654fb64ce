//! Status model and per-backend session state.

use crate::error::{SyncError, SyncResult};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{watch, Mutex, MutexGuard};
use tracing::{debug, warn};

/// What a backend is doing, for display.
///
/// `Success` and `Error` stay in place until the next operation moves the
/// backend back to `Syncing`. Nothing in the engine branches on the
/// previous status.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SyncStatus {
    /// Nothing has happened yet, or the session was reset.
    #[default]
    Idle,
    /// An operation is in flight.
    Syncing,
    /// The last operation completed.
    Success,
    /// The last operation failed with this message.
    Error(String),
}

impl SyncStatus {
    /// Returns true while an operation is in flight.
    pub fn is_syncing(&self) -> bool {
        matches!(self, SyncStatus::Syncing)
    }

    /// Returns true if the last operation failed.
    pub fn is_error(&self) -> bool {
        matches!(self, SyncStatus::Error(_))
    }

    /// Returns the failure message, if any.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            SyncStatus::Error(message) => Some(message),
            _ => None,
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncStatus::Idle => f.write_str("idle"),
            SyncStatus::Syncing => f.write_str("syncing"),
            SyncStatus::Success => f.write_str("success"),
            SyncStatus::Error(message) => write!(f, "error: {message}"),
        }
    }
}

/// Counters kept per session.
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Operations that completed.
    pub succeeded: u64,
    /// Operations that failed.
    pub failed: u64,
    /// External change notifications handled.
    pub external_changes: u64,
    /// Message of the most recent failure.
    pub last_error: Option<String>,
}

/// Status, timestamp and single-flight state of one backend instance.
///
/// Each backend owns exactly one session; there is no process-wide state.
/// Status changes are published on a watch channel so observers on any
/// thread see them.
#[derive(Debug)]
pub struct SyncSession {
    status: watch::Sender<SyncStatus>,
    last_sync: RwLock<Option<DateTime<Utc>>>,
    stats: RwLock<SessionStats>,
    busy: AtomicBool,
    flight: Mutex<()>,
}

impl SyncSession {
    /// Creates an idle session.
    pub fn new() -> Self {
        let (status, _) = watch::channel(SyncStatus::Idle);
        Self {
            status,
            last_sync: RwLock::new(None),
            stats: RwLock::new(SessionStats::default()),
            busy: AtomicBool::new(false),
            flight: Mutex::new(()),
        }
    }

    /// Current status.
    pub fn status(&self) -> SyncStatus {
        self.status.borrow().clone()
    }

    /// Subscribes to status changes.
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    /// Time of the last successful operation or external change.
    pub fn last_sync_date(&self) -> Option<DateTime<Utc>> {
        *self.last_sync.read()
    }

    /// Returns true while an operation holds the flight guard.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Session counters.
    pub fn stats(&self) -> SessionStats {
        self.stats.read().clone()
    }

    /// Waits for any in-flight operation, then claims the session.
    ///
    /// Operations on one backend instance run one at a time; a caller that
    /// arrives while another operation is running waits for it to finish.
    pub async fn begin(&self, operation: &'static str) -> FlightGuard<'_> {
        let permit = self.flight.lock().await;
        self.busy.store(true, Ordering::SeqCst);
        self.set_status(SyncStatus::Syncing);
        debug!(operation, "sync operation started");
        FlightGuard {
            session: self,
            _permit: permit,
        }
    }

    /// Publishes the outcome of an operation and passes it through.
    pub fn finish<T>(&self, operation: &'static str, result: SyncResult<T>) -> SyncResult<T> {
        match &result {
            Ok(_) => {
                self.mark_success();
                debug!(operation, "sync operation succeeded");
            }
            Err(e) => {
                self.mark_failure(e);
                warn!(operation, error = %e, "sync operation failed");
            }
        }
        result
    }

    /// Records a completed operation.
    pub fn mark_success(&self) {
        *self.last_sync.write() = Some(Utc::now());
        self.stats.write().succeeded += 1;
        self.set_status(SyncStatus::Success);
    }

    /// Records a failed operation.
    pub fn mark_failure(&self, error: &SyncError) {
        let message = error.to_string();
        {
            let mut stats = self.stats.write();
            stats.failed += 1;
            stats.last_error = Some(message.clone());
        }
        self.set_status(SyncStatus::Error(message));
    }

    /// Records data arriving from another device.
    ///
    /// While an operation is in flight the status stays `Syncing`; that
    /// operation publishes the outcome.
    pub fn mark_external_change(&self) {
        *self.last_sync.write() = Some(Utc::now());
        self.stats.write().external_changes += 1;
        if !self.is_busy() {
            self.set_status(SyncStatus::Success);
        }
    }

    /// Forgets the last sync date and returns to `Idle`.
    pub fn reset(&self) {
        *self.last_sync.write() = None;
        self.set_status(SyncStatus::Idle);
    }

    fn set_status(&self, status: SyncStatus) {
        self.status.send_replace(status);
    }
}

impl Default for SyncSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Held for the duration of one operation.
#[derive(Debug)]
pub struct FlightGuard<'a> {
    session: &'a SyncSession,
    _permit: MutexGuard<'a, ()>,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.session.busy.store(false, Ordering::SeqCst);
    }
}
