//! Entry Metadata Module
//!
//! Defines the per-key metadata kept in memory. Values never live here.

use std::path::PathBuf;

use chrono::Utc;

// == Entry Metadata ==
/// What the index knows about one persisted entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMetadata {
    /// The cache key
    pub key: String,
    /// Backing file, named independently of the key
    pub location: PathBuf,
    /// Expiration timestamp (Unix milliseconds)
    pub expires_at: i64,
    /// Bytes written to disk for this entry
    pub size: u64,
    /// Insertion sequence assigned by the index, used to order expiry ties
    pub(crate) seq: u64,
}

impl EntryMetadata {
    // == Constructor ==
    /// Creates metadata for an entry stored at `location`.
    pub fn new(
        key: impl Into<String>,
        location: impl Into<PathBuf>,
        expires_at: i64,
        size: u64,
    ) -> Self {
        Self {
            key: key.into(),
            location: location.into(),
            expires_at,
            size,
            seq: 0,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time reaches its expiration
    /// time, so a TTL of zero yields an entry that is dead on arrival.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(current_timestamp_ms())
    }

    /// Same as [`is_expired`](Self::is_expired) against a fixed clock reading.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        now_ms >= self.expires_at
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Absolute expiry for an entry created now with `ttl_seconds`.
pub fn expiry_from_ttl(ttl_seconds: i64) -> i64 {
    current_timestamp_ms().saturating_add(ttl_seconds.saturating_mul(1000))
}
