//! Store Statistics Module
//!
//! Tracks lookups, removals and disk usage of a store.

use serde::Serialize;

// == Store Stats ==
/// Counters and gauges for a store instance.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreStats {
    /// Number of `get` calls that returned a value
    pub hits: u64,
    /// Number of `get` calls that found nothing live (absent or expired)
    pub misses: u64,
    /// Number of live entries removed to satisfy the quota
    pub evictions: u64,
    /// Number of entries removed because their TTL passed
    pub expirations: u64,
    /// Current number of entries in the index
    pub entries: usize,
    /// Sum of on-disk entry sizes in bytes
    pub current_size: u64,
    /// Configured quota in bytes (0 = unbounded)
    pub max_size: u64,
}

impl StoreStats {
    // == Constructor ==
    /// Creates a new StoreStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_expiration(&mut self) {
        self.expirations += 1;
    }
}
