//! Disk Store - a disk-backed key/value cache
//!
//! Entries are persisted one file per key with an in-memory index of
//! metadata, TTL expiration, size-bounded eviction and recovery of existing
//! files on startup.

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{BinaryPayload, DiskStore, FillReport, SharedStore, StoreStats};
pub use config::StoreConfig;
pub use error::{DecodeError, Result, StoreError};
pub use tasks::spawn_sweep_task;
