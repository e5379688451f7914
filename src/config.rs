//! Configuration Module
//!
//! Every option the store recognizes, with defaults, plus loading from
//! environment variables.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use crate::cache::FillReport;
use crate::error::{Result, StoreError};

/// Invoked once Recovery/Fill completes, or immediately when it is skipped.
pub type FillCallback = Arc<dyn Fn(&FillReport) + Send + Sync>;

/// Store configuration parameters.
///
/// Fixed for the lifetime of a store; validated once by
/// [`DiskStore::open`](crate::cache::DiskStore::open).
#[derive(Clone)]
pub struct StoreConfig {
    /// Storage directory, created if absent
    pub path: PathBuf,
    /// Default TTL in seconds for `set` calls without an override
    pub ttl: i64,
    /// Quota in bytes for the sum of all entry sizes (0 = unbounded)
    pub max_size: u64,
    /// Per-entry cap in bytes; falls back to `max_size` when unset
    pub max_entry_size: Option<u64>,
    /// Compress envelopes with zlib
    pub compress: bool,
    /// Skip Recovery/Fill when opening the store
    pub prevent_fill: bool,
    /// Rewrite tagged `{"type":"Buffer","data":[..]}` objects into byte arrays on decode
    pub revive_binary_payloads: bool,
    /// Notified with the fill outcome once `open` has filled or skipped the
    /// fill. Not called when listing the directory fails, since `open`
    /// returns that error instead.
    pub fill_callback: Option<FillCallback>,
}

impl StoreConfig {
    /// Creates a config for `path` with every other option at its default.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Creates a new StoreConfig by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `DISK_STORE_PATH` - Storage directory (default: `cache/`)
    /// - `DISK_STORE_TTL` - Default TTL in seconds (default: 60)
    /// - `DISK_STORE_MAX_SIZE` - Quota in bytes (default: 0, unbounded)
    /// - `DISK_STORE_MAX_ENTRY_SIZE` - Per-entry cap in bytes (default: unset)
    /// - `DISK_STORE_COMPRESS` - `true` to compress envelopes (default: false)
    /// - `DISK_STORE_PREVENT_FILL` - `true` to skip recovery (default: false)
    /// - `DISK_STORE_REVIVE_BINARY` - `true` to revive tagged buffers (default: false)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            path: env::var("DISK_STORE_PATH")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.path),
            ttl: env_or("DISK_STORE_TTL", defaults.ttl),
            max_size: env_or("DISK_STORE_MAX_SIZE", defaults.max_size),
            max_entry_size: env::var("DISK_STORE_MAX_ENTRY_SIZE")
                .ok()
                .and_then(|v| v.parse().ok()),
            compress: env_or("DISK_STORE_COMPRESS", defaults.compress),
            prevent_fill: env_or("DISK_STORE_PREVENT_FILL", defaults.prevent_fill),
            revive_binary_payloads: env_or(
                "DISK_STORE_REVIVE_BINARY",
                defaults.revive_binary_payloads,
            ),
            fill_callback: None,
        }
    }

    /// Attaches a callback that receives the fill outcome.
    pub fn with_fill_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&FillReport) + Send + Sync + 'static,
    {
        self.fill_callback = Some(Arc::new(callback));
        self
    }

    /// Effective per-entry cap, if any.
    pub fn entry_limit(&self) -> Option<u64> {
        match self.max_entry_size {
            Some(limit) => Some(limit),
            None if self.max_size > 0 => Some(self.max_size),
            None => None,
        }
    }

    /// Rejects configurations the store cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(StoreError::InvalidConfig(
                "storage path must not be empty".to_string(),
            ));
        }
        if self.max_entry_size == Some(0) {
            return Err(StoreError::InvalidConfig(
                "max_entry_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("cache/"),
            ttl: 60,
            max_size: 0,
            max_entry_size: None,
            compress: false,
            prevent_fill: false,
            revive_binary_payloads: false,
            fill_callback: None,
        }
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("path", &self.path)
            .field("ttl", &self.ttl)
            .field("max_size", &self.max_size)
            .field("max_entry_size", &self.max_entry_size)
            .field("compress", &self.compress)
            .field("prevent_fill", &self.prevent_fill)
            .field("revive_binary_payloads", &self.revive_binary_payloads)
            .field("fill_callback", &self.fill_callback.is_some())
            .finish()
    }
}
