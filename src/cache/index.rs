//! Metadata Index Module
//!
//! In-memory mapping from key to entry metadata, plus the running byte total.

use std::collections::HashMap;

use crate::cache::EntryMetadata;

// == Metadata Index ==
/// Key to metadata map with size accounting.
///
/// Not synchronized; the owning store is borrowed mutably for every change.
#[derive(Debug, Default)]
pub struct MetadataIndex {
    entries: HashMap<String, EntryMetadata>,
    /// Sum of `size` over all entries
    current_size: u64,
    /// Next insertion sequence number
    next_seq: u64,
}

impl MetadataIndex {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Lookup ==
    pub fn lookup(&self, key: &str) -> Option<&EntryMetadata> {
        self.entries.get(key)
    }

    // == Insert ==
    /// Inserts metadata, stamping it with the next insertion sequence.
    ///
    /// Returns the metadata previously stored under the key. Its backing file
    /// is now untracked and the caller is responsible for releasing it.
    pub fn insert(&mut self, mut metadata: EntryMetadata) -> Option<EntryMetadata> {
        metadata.seq = self.next_seq;
        self.next_seq += 1;
        self.current_size += metadata.size;

        let previous = self.entries.insert(metadata.key.clone(), metadata);
        if let Some(old) = &previous {
            self.current_size -= old.size;
        }
        previous
    }

    // == Remove ==
    /// Removes a key and subtracts its size from the total.
    pub fn remove(&mut self, key: &str) -> Option<EntryMetadata> {
        let removed = self.entries.remove(key)?;
        self.current_size -= removed.size;
        Some(removed)
    }

    // == All ==
    pub fn all(&self) -> impl Iterator<Item = (&String, &EntryMetadata)> {
        self.entries.iter()
    }

    // == Keys ==
    pub fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn current_size(&self) -> u64 {
        self.current_size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn meta(key: &str, size: u64) -> EntryMetadata {
        EntryMetadata::new(key, format!("/tmp/cache_{}.dat", key), 0, size)
    }

    #[test]
    fn test_index_new() {
        let index = MetadataIndex::new();
        assert!(index.is_empty());
        assert_eq!(index.current_size(), 0);
    }

    #[test]
    fn test_index_insert_and_lookup() {
        let mut index = MetadataIndex::new();

        assert!(index.insert(meta("a", 10)).is_none());
        assert!(index.insert(meta("b", 5)).is_none());

        assert_eq!(index.len(), 2);
        assert_eq!(index.current_size(), 15);
        assert_eq!(index.lookup("a").unwrap().size, 10);
        assert!(index.lookup("missing").is_none());
    }

    #[test]
    fn test_index_insert_overwrite_returns_previous() {
        let mut index = MetadataIndex::new();

        index.insert(meta("a", 10));
        let previous = index.insert(meta("a", 4)).unwrap();

        assert_eq!(previous.size, 10);
        assert_eq!(index.len(), 1);
        assert_eq!(index.current_size(), 4);
    }

    #[test]
    fn test_index_remove() {
        let mut index = MetadataIndex::new();

        index.insert(meta("a", 10));
        index.insert(meta("b", 5));

        assert_eq!(index.remove("a").unwrap().key, "a");
        assert!(index.remove("a").is_none());
        assert_eq!(index.current_size(), 5);
        assert!(!index.contains_key("a"));
    }

    #[test]
    fn test_index_sequence_is_monotonic() {
        let mut index = MetadataIndex::new();

        index.insert(meta("a", 1));
        index.insert(meta("b", 1));
        index.insert(meta("a", 1));

        let a = index.lookup("a").unwrap().seq;
        let b = index.lookup("b").unwrap().seq;
        assert!(a > b, "Re-inserted key should be ordered after older inserts");
    }

    #[test]
    fn test_index_keys_snapshot() {
        let mut index = MetadataIndex::new();
        index.insert(meta("x", 1));
        index.insert(meta("y", 1));

        let mut keys = index.keys();
        keys.sort();
        assert_eq!(keys, vec!["x".to_string(), "y".to_string()]);
        assert_eq!(index.all().count(), 2);
    }
}
