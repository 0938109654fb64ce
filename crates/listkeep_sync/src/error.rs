//! Error types for the sync engine.

use listkeep_codec::CodecError;
use listkeep_storage::StorageError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during backup, restore and authentication.
///
/// Every variant is terminal for the operation that raised it; nothing is
/// retried automatically. The `Display` text is what the backend publishes
/// as its `error` status.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The ambient key-value store has no identity on this device.
    #[error("cloud key-value store is not available; sign in to enable it")]
    NotAvailable,

    /// No secret has been accepted yet.
    #[error("not authenticated; provide an access token first")]
    NotAuthenticated,

    /// Transport failure or an unexpected response status.
    #[error("network error: {message}")]
    Network {
        /// What went wrong.
        message: String,
        /// HTTP status, when a response was received.
        status: Option<u16>,
    },

    /// The identity endpoint rejected the secret.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The snapshot could not be built or serialized.
    #[error("failed to encode data for backup: {0}")]
    Encoding(String),

    /// Remote content could not be parsed.
    #[error("failed to decode backup data: {0}")]
    Decoding(String),

    /// No prior backup exists for this user.
    #[error("no backup found for this user")]
    NotFound,

    /// The encoded value is larger than the store accepts per key.
    #[error("storage quota exceeded: {size} bytes exceeds the {limit} byte limit")]
    QuotaExceeded {
        /// Encoded size.
        size: usize,
        /// Per-key limit.
        limit: usize,
    },

    /// The key-value store refused to synchronize after a write.
    #[error("cloud sync failed; please try again")]
    SyncFailed,

    /// Local storage failure while gathering items.
    #[error("local storage error: {0}")]
    Storage(#[from] StorageError),
}

impl SyncError {
    /// Creates a network error without a response status.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            status: None,
        }
    }

    /// Creates a network error for an unexpected response status.
    pub fn unexpected_status(operation: &str, expected: u16, status: u16) -> Self {
        Self::Network {
            message: format!("{operation} returned HTTP {status} (expected {expected})"),
            status: Some(status),
        }
    }

    /// Returns true if the operation stopped before touching any transport.
    pub fn is_precondition(&self) -> bool {
        matches!(self, SyncError::NotAvailable | SyncError::NotAuthenticated)
    }
}

impl From<CodecError> for SyncError {
    fn from(err: CodecError) -> Self {
        if err.is_encoding() {
            SyncError::Encoding(err.to_string())
        } else {
            SyncError::Decoding(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precondition_errors() {
        assert!(SyncError::NotAvailable.is_precondition());
        assert!(SyncError::NotAuthenticated.is_precondition());
        assert!(!SyncError::NotFound.is_precondition());
        assert!(!SyncError::network("reset").is_precondition());
    }

    #[test]
    fn codec_errors_split_by_direction() {
        let err: SyncError = CodecError::encoding_failed("bad").into();
        assert!(matches!(err, SyncError::Encoding(_)));

        let err: SyncError = CodecError::invalid_snapshot("orphan").into();
        assert!(matches!(err, SyncError::Encoding(_)));

        let err: SyncError = CodecError::decoding_failed("eof").into();
        assert!(matches!(err, SyncError::Decoding(_)));
    }

    #[test]
    fn error_display() {
        let err = SyncError::unexpected_status("create gist", 201, 422);
        assert_eq!(
            err.to_string(),
            "network error: create gist returned HTTP 422 (expected 201)"
        );

        let err = SyncError::QuotaExceeded {
            size: 1_000_001,
            limit: 1_000_000,
        };
        assert!(err.to_string().contains("1000001"));
        assert!(err.to_string().contains("1000000"));
    }
}
