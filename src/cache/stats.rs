//! Cache Statistics Module
//!
//! Counters for lookups, evictions and single-flight coordination.

use serde::Serialize;

// == Cache Stats ==
/// Snapshot of cache and coordinator counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups answered from a live entry
    pub hits: u64,
    /// Lookups that found nothing servable
    pub misses: u64,
    /// Entries dropped because their TTL elapsed
    pub expirations: u64,
    /// Entries dropped to stay within `max_entries`
    pub evictions: u64,
    /// Loader executions started through `cached`
    pub loads: u64,
    /// Loader executions that returned an error or were cancelled
    pub load_failures: u64,
    /// Followers that were answered by another caller's load
    pub coalesced: u64,
    /// Followers whose bounded wait elapsed before the leader finished
    pub wait_timeouts: u64,
    /// Current number of stored entries
    pub total_entries: usize,
    /// Loads currently registered as in flight
    pub inflight: usize,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 before any lookup.
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

    pub fn record_expiration(&mut self) {
        self.expirations += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_load(&mut self) {
        self.loads += 1;
    }

    pub fn record_load_failure(&mut self) {
        self.load_failures += 1;
    }

    pub fn record_coalesced(&mut self) {
        self.coalesced += 1;
    }

    pub fn record_wait_timeout(&mut self) {
        self.wait_timeouts += 1;
    }
}
