//! Error types for the disk store
//!
//! Provides unified error handling using thiserror.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

// == Decode Error ==
/// Failure to turn on-disk bytes back into an envelope or a typed value.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Compressed content could not be inflated
    #[error("failed to decompress envelope: {0}")]
    Decompress(#[source] io::Error),

    /// Bytes are not a well-formed envelope (truncated write, foreign file)
    #[error("malformed envelope: {0}")]
    Malformed(#[source] serde_json::Error),

    /// Envelope is intact but the stored value does not fit the requested type
    #[error("stored value does not match the requested type: {0}")]
    ValueMismatch(#[source] serde_json::Error),
}

// == Store Error Enum ==
/// Unified error type for the disk store.
///
/// Absent and expired keys are not errors; they surface as `Ok(None)`.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Encoded entry is larger than the per-entry cap
    #[error("entry for key {key:?} is {size} bytes, exceeding the {limit} byte limit")]
    SizeExceeded { key: String, size: u64, limit: u64 },

    /// Filesystem read/write/unlink failure
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Corrupt or foreign file content
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Value could not be serialized into an envelope
    #[error("failed to encode value: {0}")]
    Encode(#[source] serde_json::Error),

    /// Configuration rejected at construction
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the disk store.
pub type Result<T> = std::result::Result<T, StoreError>;
