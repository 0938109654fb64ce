//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur during encoding or decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Failed to encode a value to JSON.
    #[error("encoding failed: {message}")]
    EncodingFailed {
        /// Description of the encoding error.
        message: String,
    },

    /// Failed to decode JSON bytes.
    #[error("decoding failed: {message}")]
    DecodingFailed {
        /// Description of the decoding error.
        message: String,
    },

    /// The entity set violates a snapshot invariant.
    #[error("invalid snapshot: {message}")]
    InvalidSnapshot {
        /// Which invariant was violated.
        message: String,
    },

    /// The document carries a schema version this build cannot read.
    #[error("unsupported snapshot version {found:?} (expected {expected:?})")]
    UnsupportedVersion {
        /// Version found in the document.
        found: String,
        /// Version this build writes and reads.
        expected: String,
    },
}

impl CodecError {
    /// Create an encoding failed error.
    pub fn encoding_failed(message: impl Into<String>) -> Self {
        Self::EncodingFailed {
            message: message.into(),
        }
    }

    /// Create a decoding failed error.
    pub fn decoding_failed(message: impl Into<String>) -> Self {
        Self::DecodingFailed {
            message: message.into(),
        }
    }

    /// Create an invalid snapshot error.
    pub fn invalid_snapshot(message: impl Into<String>) -> Self {
        Self::InvalidSnapshot {
            message: message.into(),
        }
    }

    /// Returns true if this error was raised while building or encoding.
    pub fn is_encoding(&self) -> bool {
        matches!(self, Self::EncodingFailed { .. } | Self::InvalidSnapshot { .. })
    }
}
