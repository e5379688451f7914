//! Disk Store Module
//!
//! Main cache engine: values live in one file per entry, the in-memory index
//! holds only metadata, and a size quota is enforced by TTL-proximity eviction.

use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::entry::{current_timestamp_ms, expiry_from_ttl};
use crate::cache::{
    storage_file_name, Codec, EntryMetadata, EvictionPolicy, FillReport, MetadataIndex,
    StoreStats,
};
use crate::config::StoreConfig;
use crate::error::{Result, StoreError};

/// A store shared between tasks. The mutex serializes every operation.
pub type SharedStore = Arc<Mutex<DiskStore>>;

// == Disk Store ==
/// Disk-backed key/value cache with TTL expiration and a size quota.
///
/// Every mutating operation borrows the store mutably, so index updates never
/// interleave. Wrap it in a [`SharedStore`] to use it from several tasks.
#[derive(Debug)]
pub struct DiskStore {
    pub(super) config: StoreConfig,
    pub(super) codec: Codec,
    pub(super) index: MetadataIndex,
    pub(super) policy: EvictionPolicy,
    pub(super) stats: StoreStats,
}

impl DiskStore {
    /// Name reported to caching facades.
    pub const NAME: &'static str = "diskstore";

    // == Constructor ==
    /// Opens a store over `config.path`, creating the directory if needed.
    ///
    /// Unless `prevent_fill` is set, the index is rebuilt from the files
    /// already in the directory before this returns. The fill callback, if
    /// any, sees the outcome either way. A directory that cannot be listed
    /// fails the open before the callback runs.
    pub async fn open(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.path)
            .await
            .map_err(|e| StoreError::io(&config.path, e))?;

        let mut store = Self {
            codec: Codec::from_config(&config),
            policy: EvictionPolicy::new(config.max_size),
            index: MetadataIndex::new(),
            stats: StoreStats::new(),
            config,
        };

        let report = if store.config.prevent_fill {
            debug!("Fill skipped for {}", store.config.path.display());
            FillReport::skipped()
        } else {
            store.fill().await?
        };

        if let Some(callback) = &store.config.fill_callback {
            callback(&report);
        }

        Ok(store)
    }

    /// Moves the store behind a mutex for use from several tasks.
    pub fn into_shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    // == Set ==
    /// Persists a value under `key` and returns it back.
    ///
    /// `ttl` overrides the configured default (seconds, may be zero or
    /// negative). An entry whose encoded size exceeds the per-entry cap is
    /// rejected before anything is touched.
    pub async fn set<V: Serialize>(
        &mut self,
        key: &str,
        value: V,
        ttl: Option<i64>,
    ) -> Result<V> {
        let ttl = ttl.unwrap_or(self.config.ttl);
        let expires_at = expiry_from_ttl(ttl);

        let bytes = self
            .codec
            .encode(key, &value, expires_at)
            .map_err(StoreError::Encode)?;
        let size = bytes.len() as u64;

        if let Some(limit) = self.config.entry_limit() {
            if size > limit {
                return Err(StoreError::SizeExceeded {
                    key: key.to_string(),
                    size,
                    limit,
                });
            }
        }

        // Release the previous file for this key before making room
        self.del(key).await?;
        self.free_up_space().await;

        let location = self.config.path.join(storage_file_name());
        fs::write(&location, &bytes)
            .await
            .map_err(|e| StoreError::io(&location, e))?;
        drop(bytes);

        debug!("Stored {:?} ({} bytes) at {}", key, size, location.display());
        self.index.insert(EntryMetadata::new(key, location, expires_at, size));

        Ok(value)
    }

    // == Get ==
    /// Reads the value stored under `key`.
    ///
    /// Absent and expired keys yield `Ok(None)`; expired entries are deleted
    /// on the way. Read and decode failures leave the metadata in place.
    pub async fn get<V: DeserializeOwned>(&mut self, key: &str) -> Result<Option<V>> {
        let (expired, location) = match self.index.lookup(key) {
            Some(meta) => (meta.is_expired(), meta.location.clone()),
            None => {
                self.stats.record_miss();
                return Ok(None);
            }
        };

        if expired {
            self.stats.record_miss();
            self.stats.record_expiration();
            self.remove_entry(key).await?;
            return Ok(None);
        }

        let bytes = fs::read(&location)
            .await
            .map_err(|e| StoreError::io(&location, e))?;
        let value = self.codec.decode(&bytes)?.into_value()?;

        self.stats.record_hit();
        Ok(Some(value))
    }

    // == Delete ==
    /// Removes `key` and its backing file. Absent keys and already missing
    /// files are not errors.
    pub async fn del(&mut self, key: &str) -> Result<()> {
        self.remove_entry(key).await.map(|_| ())
    }

    // == Keys ==
    /// Snapshot of the keys currently indexed, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        self.index.keys()
    }

    // == Reset ==
    /// With a key, same as [`del`](Self::del). Without one, deletes every
    /// entry one at a time.
    pub async fn reset(&mut self, key: Option<&str>) -> Result<()> {
        if let Some(key) = key {
            return self.del(key).await;
        }

        let keys = self.index.keys();
        let count = keys.len();
        for key in keys {
            if let Err(err) = self.remove_entry(&key).await {
                warn!("Reset could not remove file for {:?}: {}", key, err);
            }
        }

        info!("Reset removed {} entries", count);
        Ok(())
    }

    // == Clean Cache ==
    /// Resets the store, then removes every regular file left in the storage
    /// directory, tracked or not.
    pub async fn clean_cache(&mut self) -> Result<()> {
        self.reset(None).await?;

        let dir = self.config.path.clone();
        let mut entries = fs::read_dir(&dir)
            .await
            .map_err(|e| StoreError::io(&dir, e))?;

        let mut removed = 0usize;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&dir, e))?
        {
            let path = entry.path();
            let is_file = fs::metadata(&path)
                .await
                .map(|meta| meta.is_file())
                .unwrap_or(false);
            if is_file {
                remove_file_if_exists(&path).await?;
                removed += 1;
            }
        }

        info!("Clean cache removed {} files from {}", removed, dir.display());
        Ok(())
    }

    // == Cleanup Expired ==
    /// Removes all expired entries. Returns the number of entries removed.
    ///
    /// File deletion failures are logged; the entries still leave the index.
    pub async fn clean_expired(&mut self) -> usize {
        let expired = self.policy.expired(&self.index, current_timestamp_ms());
        let count = expired.len();

        for key in expired {
            self.stats.record_expiration();
            if let Err(err) = self.remove_entry(&key).await {
                warn!("Expired entry {:?} left its file behind: {}", key, err);
            }
        }

        count
    }

    // == Is Cacheable ==
    /// False for values that serialize to null (`None`, `()`) or cannot be
    /// serialized at all.
    pub fn is_cacheable_value<V: Serialize + ?Sized>(&self, value: &V) -> bool {
        serde_json::to_value(value)
            .map(|v| !v.is_null())
            .unwrap_or(false)
    }

    // == Stats ==
    /// Returns current store statistics.
    pub fn stats(&self) -> StoreStats {
        let mut stats = self.stats.clone();
        stats.entries = self.index.len();
        stats.current_size = self.index.current_size();
        stats.max_size = self.policy.max_size();
        stats
    }

    /// Metadata for `key`, expired or not.
    pub fn metadata(&self, key: &str) -> Option<&EntryMetadata> {
        self.index.lookup(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Sum of on-disk entry sizes in bytes.
    pub fn current_size(&self) -> u64 {
        self.index.current_size()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // == Free Up Space ==
    /// Brings the tracked size back under quota: expired entries first, then
    /// soonest-to-expire entries one at a time.
    async fn free_up_space(&mut self) {
        if !self.policy.is_over_quota(&self.index) {
            return;
        }

        let swept = self.clean_expired().await;
        if swept > 0 {
            debug!("Quota sweep removed {} expired entries", swept);
        }

        for key in self.policy.candidates(&self.index) {
            if !self.policy.is_over_quota(&self.index) {
                break;
            }
            self.stats.record_eviction();
            debug!("Evicting {:?} to satisfy quota", key);
            if let Err(err) = self.remove_entry(&key).await {
                warn!("Evicted entry {:?} left its file behind: {}", key, err);
            }
        }
    }

    /// Drops the metadata for `key`, then its file. Returns whether the key
    /// was indexed.
    pub(super) async fn remove_entry(&mut self, key: &str) -> Result<bool> {
        let Some(meta) = self.index.remove(key) else {
            return Ok(false);
        };
        remove_file_if_exists(&meta.location).await?;
        debug!("Removed {:?} ({} bytes)", key, meta.size);
        Ok(true)
    }
}

/// Deletes a file, treating an already missing file as success.
pub(super) async fn remove_file_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(StoreError::io(path, err)),
    }
}
