//! Cache Store Module
//!
//! Bounded key/value map with per-entry expiry and least-recently-touched
//! eviction. The store knows nothing about loaders; it is driven by the
//! [`QueryCache`](crate::cache::QueryCache) façade under its lock.

use std::collections::HashMap;
use std::time::Duration;

use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, LruTracker};

// == Cache Store ==
/// Cache storage with LRU eviction and TTL support.
#[derive(Debug)]
pub struct CacheStore<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// Recency order of stored keys
    lru: LruTracker,
    stats: CacheStats,
    /// Hard cap on stored entries
    max_entries: usize,
    /// TTL applied when a caller does not pass one
    default_ttl: Duration,
}

impl<V: Clone> CacheStore<V> {
    // == Constructor ==
    /// Creates an empty store.
    ///
    /// # Arguments
    /// * `max_entries` - Maximum number of entries kept at once
    /// * `default_ttl` - Lifetime of entries stored without an explicit TTL
    pub fn new(max_entries: usize, default_ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            max_entries,
            default_ttl,
        }
    }

    // == Get ==
    /// Returns the value for `key` if it is present and unexpired.
    ///
    /// A hit marks the key most recently used. An expired entry is removed
    /// on the spot and reported as absent.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(),
            None => {
                self.stats.record_miss();
                return None;
            }
        };

        if expired {
            self.remove_entry(key);
            self.stats.record_expiration();
            self.stats.record_miss();
            return None;
        }

        self.stats.record_hit();
        self.lru.touch(key);
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    // == Peek ==
    /// Reads a live value without touching recency or counters.
    pub fn peek(&self, key: &str) -> Option<&V> {
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| &entry.value)
    }

    // == Set ==
    /// Stores `value` under `key`, replacing any previous entry.
    ///
    /// The entry expires after `ttl` (the store default when `None`). The key
    /// becomes the most recently used one, then least recently used keys are
    /// evicted until the store is back within `max_entries`. Returns the
    /// stored value.
    pub fn set(&mut self, key: &str, value: V, ttl: Option<Duration>) -> V {
        let ttl = ttl.unwrap_or(self.default_ttl);
        self.entries
            .insert(key.to_string(), CacheEntry::new(value.clone(), ttl));
        self.lru.touch(key);

        while self.entries.len() > self.max_entries {
            let Some(evicted) = self.lru.pop_oldest() else {
                break;
            };
            self.entries.remove(&evicted);
            self.stats.record_eviction();
            debug!(key = %evicted, "evicted least recently used entry");
        }

        value
    }

    // == Cleanup Expired ==
    /// Removes all expired entries, returning how many were dropped.
    pub fn cleanup_expired(&mut self) -> usize {
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            self.remove_entry(key);
            self.stats.record_expiration();
        }

        expired_keys.len()
    }

    /// Keys from least to most recently touched.
    pub fn keys_by_recency(&self) -> impl Iterator<Item = &str> {
        self.lru.iter()
    }

    fn remove_entry(&mut self, key: &str) {
        self.entries.remove(key);
        self.lru.remove(key);
    }
}

impl<V> CacheStore<V> {
    // == Stats ==
    /// Returns current counters with an up-to-date entry count.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.total_entries = self.entries.len();
        stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut CacheStats {
        &mut self.stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }
}
