//! Eviction Module
//!
//! Decides which entries leave the index when the tracked size is over quota.
//! The store carries out the actual deletions.

use crate::cache::MetadataIndex;

// == Eviction Policy ==
/// Size quota with a two-phase removal order.
///
/// Phase one drops entries whose TTL already passed. Phase two removes the
/// remaining entries soonest-to-expire first; entries sharing an expiry leave
/// in insertion order.
#[derive(Debug, Clone, Copy)]
pub struct EvictionPolicy {
    /// Quota in bytes, 0 = unbounded
    max_size: u64,
}

impl EvictionPolicy {
    // == Constructor ==
    pub fn new(max_size: u64) -> Self {
        Self { max_size }
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// False when the quota is disabled.
    pub fn is_enabled(&self) -> bool {
        self.max_size > 0
    }

    // == Over Quota ==
    pub fn is_over_quota(&self, index: &MetadataIndex) -> bool {
        self.is_enabled() && index.current_size() > self.max_size
    }

    // == Expired ==
    /// Keys whose entries are expired at `now_ms`.
    pub fn expired(&self, index: &MetadataIndex, now_ms: i64) -> Vec<String> {
        index
            .all()
            .filter(|(_, meta)| meta.is_expired_at(now_ms))
            .map(|(key, _)| key.clone())
            .collect()
    }

    // == Candidates ==
    /// All keys ordered by expiry ascending, then insertion order.
    pub fn candidates(&self, index: &MetadataIndex) -> Vec<String> {
        let mut order: Vec<(i64, u64, &String)> = index
            .all()
            .map(|(key, meta)| (meta.expires_at, meta.seq, key))
            .collect();
        order.sort_unstable();
        order.into_iter().map(|(_, _, key)| key.clone()).collect()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::EntryMetadata;

    fn index_of(entries: &[(&str, i64, u64)]) -> MetadataIndex {
        let mut index = MetadataIndex::new();
        for (key, expires_at, size) in entries {
            index.insert(EntryMetadata::new(
                *key,
                format!("/tmp/cache_{}.dat", key),
                *expires_at,
                *size,
            ));
        }
        index
    }

    #[test]
    fn test_disabled_quota_never_over() {
        let policy = EvictionPolicy::new(0);
        let index = index_of(&[("a", 10, u64::MAX / 2)]);
        assert!(!policy.is_enabled());
        assert!(!policy.is_over_quota(&index));
    }

    #[test]
    fn test_over_quota_is_strict() {
        let index = index_of(&[("a", 10, 50), ("b", 10, 50)]);
        assert!(!EvictionPolicy::new(100).is_over_quota(&index));
        assert!(EvictionPolicy::new(99).is_over_quota(&index));
    }

    #[test]
    fn test_expired_keys() {
        let index = index_of(&[("dead", 100, 1), ("edge", 200, 1), ("live", 300, 1)]);
        let mut expired = EvictionPolicy::new(1).expired(&index, 200);
        expired.sort();
        assert_eq!(expired, vec!["dead".to_string(), "edge".to_string()]);
    }

    #[test]
    fn test_candidates_soonest_expiry_first() {
        let index = index_of(&[("long", 9_000, 1), ("short", 1_000, 1), ("mid", 5_000, 1)]);
        assert_eq!(
            EvictionPolicy::new(1).candidates(&index),
            vec!["short".to_string(), "mid".to_string(), "long".to_string()]
        );
    }

    #[test]
    fn test_candidates_ties_follow_insertion_order() {
        let index = index_of(&[("c", 500, 1), ("a", 500, 1), ("b", 500, 1), ("z", 100, 1)]);
        assert_eq!(
            EvictionPolicy::new(1).candidates(&index),
            vec![
                "z".to_string(),
                "c".to_string(),
                "a".to_string(),
                "b".to_string()
            ]
        );
    }
}
