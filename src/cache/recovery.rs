//! Recovery Module
//!
//! Rebuilds the index from storage files already on disk, e.g. after a
//! restart. Files are handled strictly one after another and a bad file never
//! stops the scan.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::cache::codec::{is_storage_file_name, Envelope};
use crate::cache::store::remove_file_if_exists;
use crate::cache::{DiskStore, EntryMetadata};
use crate::error::{Result, StoreError};

// == Fill Report ==
/// Outcome of a fill pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FillReport {
    /// Fill was suppressed by configuration
    pub skipped: bool,
    /// Storage files found in the directory
    pub files_scanned: usize,
    /// Live entries added to the index
    pub loaded: usize,
    /// Entries dropped because their TTL had passed
    pub expired: usize,
    /// Files deleted because they could not be decoded
    pub corrupt: usize,
    /// Files that could not be read and were left alone
    pub unreadable: usize,
    /// Files deleted because another file held a later copy of the same key
    pub duplicates: usize,
}

impl FillReport {
    /// Report for a fill that never ran.
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }
}

/// Regular files in `dir` whose names look like storage files, sorted by name.
async fn candidate_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir).await.map_err(|e| StoreError::io(dir, e))?;
    let mut files = Vec::new();

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| StoreError::io(dir, e))?
    {
        let name = entry.file_name();
        if !name.to_str().is_some_and(is_storage_file_name) {
            continue;
        }
        let path = entry.path();
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => files.push(path),
            Ok(_) => {}
            Err(err) => warn!("Skipping {}: {}", path.display(), err),
        }
    }

    files.sort();
    Ok(files)
}

impl DiskStore {
    // == Fill ==
    /// Scans the storage directory and indexes every decodable file.
    ///
    /// Undecodable files are deleted, expired entries are removed right after
    /// being indexed, and unreadable files are skipped. Only a failure to list
    /// the directory is returned as an error.
    pub async fn fill(&mut self) -> Result<FillReport> {
        let files = candidate_files(&self.config.path).await?;
        let mut report = FillReport {
            files_scanned: files.len(),
            ..FillReport::default()
        };

        for path in files {
            self.fill_one(path, &mut report).await;
        }

        info!(
            "Fill of {}: {} scanned, {} loaded, {} expired, {} corrupt, {} unreadable, {} duplicates",
            self.config.path.display(),
            report.files_scanned,
            report.loaded,
            report.expired,
            report.corrupt,
            report.unreadable,
            report.duplicates
        );
        Ok(report)
    }

    async fn fill_one(&mut self, path: PathBuf, report: &mut FillReport) {
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("Skipping unreadable {}: {}", path.display(), err);
                report.unreadable += 1;
                return;
            }
        };

        let Envelope { key, expires, .. } = match self.codec.decode(&bytes) {
            Ok(envelope) => envelope,
            Err(err) => {
                warn!("Deleting undecodable {}: {}", path.display(), err);
                report.corrupt += 1;
                if let Err(err) = remove_file_if_exists(&path).await {
                    warn!("Could not delete {}: {}", path.display(), err);
                }
                return;
            }
        };
        let size = bytes.len() as u64;
        drop(bytes);

        if let Some(existing) = self.index.lookup(&key) {
            if existing.location == path {
                // Already tracked from an earlier fill
                return;
            }
            report.duplicates += 1;
            if existing.expires_at >= expires {
                debug!("Dropping older copy of {:?} at {}", key, path.display());
                if let Err(err) = remove_file_if_exists(&path).await {
                    warn!("Could not delete {}: {}", path.display(), err);
                }
                return;
            }
            if let Err(err) = self.remove_entry(&key).await {
                warn!("Could not delete older copy of {:?}: {}", key, err);
            }
        }

        let metadata = EntryMetadata::new(key, path, expires, size);
        let expired = metadata.is_expired();
        let key = metadata.key.clone();
        self.index.insert(metadata);

        if expired {
            report.expired += 1;
            self.stats.record_expiration();
            if let Err(err) = self.remove_entry(&key).await {
                warn!("Could not delete expired {:?}: {}", key, err);
            }
        } else {
            report.loaded += 1;
        }
    }
}
