//! Cache Module
//!
//! Disk-backed key/value store: one file per entry, metadata-only index,
//! TTL expiration and a size quota.

mod codec;
mod entry;
mod eviction;
mod index;
mod recovery;
mod stats;
mod store;


// Re-export public types
pub use codec::{
    is_storage_file_name, revive_buffers, storage_file_name, BinaryPayload, Codec, Envelope,
    FILE_EXTENSION, FILE_PREFIX,
};
pub use entry::{current_timestamp_ms, EntryMetadata};
pub use eviction::EvictionPolicy;
pub use index::MetadataIndex;
pub use recovery::FillReport;
pub use stats::StoreStats;
pub use store::{DiskStore, SharedStore};
