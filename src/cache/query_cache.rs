//! Query Cache Module
//!
//! The read-through façade: a [`CacheStore`] and an [`InflightRegistry`]
//! behind one lock, exposed as `get`, `set` and `cached`.
//!
//! The lock only covers bookkeeping. Loaders run and followers wait with the
//! lock released, so a slow load never blocks callers of unrelated keys.

use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use crate::cache::singleflight::{follower_wait_bound, Registration, WaitOutcome};
use crate::cache::{CacheStats, CacheStore, InflightRegistry};
use crate::config::CacheConfig;

struct CacheState<V> {
    store: CacheStore<V>,
    inflight: InflightRegistry,
}

// == Query Cache ==
/// Shared read-through cache with single-flight loads.
///
/// One instance is created by the composition root and shared (behind an
/// `Arc`) by every handler that reads the same dataset.
pub struct QueryCache<V> {
    state: Mutex<CacheState<V>>,
    default_ttl: Duration,
    follower_wait: Option<Duration>,
}

impl<V> std::fmt::Debug for QueryCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("default_ttl", &self.default_ttl)
            .field("follower_wait", &self.follower_wait)
            .finish_non_exhaustive()
    }
}

impl<V: Clone + Send + Sync> QueryCache<V> {
    // == Constructor ==
    /// Creates a cache holding at most `max_entries` values.
    pub fn new(max_entries: usize, default_ttl: Duration) -> Self {
        Self {
            state: Mutex::new(CacheState {
                store: CacheStore::new(max_entries, default_ttl),
                inflight: InflightRegistry::new(),
            }),
            default_ttl,
            follower_wait: None,
        }
    }

    /// Creates a cache from the `cache` section of the configuration.
    pub fn from_config(config: &CacheConfig) -> Self {
        let cache = Self::new(config.max_entries, config.default_ttl);
        match config.follower_wait {
            Some(wait) => cache.with_follower_wait(wait),
            None => cache,
        }
    }

    /// Bounds follower waits by `wait` instead of the call's TTL.
    pub fn with_follower_wait(mut self, wait: Duration) -> Self {
        self.follower_wait = Some(wait);
        self
    }

    // == Get ==
    /// Returns the live value for `key`, if any.
    pub fn get(&self, key: &str) -> Option<V> {
        self.state.lock().store.get(key)
    }

    // == Set ==
    /// Stores `value` for `ttl` (or the default TTL) and returns it.
    pub fn set(&self, key: &str, value: V, ttl: Option<Duration>) -> V {
        self.state.lock().store.set(key, value, ttl)
    }

    // == Cached ==
    /// Returns the cached value for `key`, loading it with `loader` on a miss.
    ///
    /// Concurrent misses for the same key are coalesced: the first caller
    /// (the leader) runs its loader while the others wait for at most the
    /// governing TTL (floored at one second) or the configured follower wait.
    /// A follower that wakes to a populated cache returns that value; one
    /// that wakes to a miss, because the leader failed or the wait expired,
    /// runs its own loader.
    ///
    /// Loader errors are returned unchanged to whichever caller ran the
    /// loader and are never cached.
    pub async fn cached<F, Fut, E>(&self, key: &str, loader: F, ttl: Option<Duration>) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let registration = {
            let mut state = self.state.lock();
            if let Some(value) = state.store.get(key) {
                return Ok(value);
            }
            let registration = state.inflight.register(key);
            if matches!(registration, Registration::Leader) {
                state.store.stats_mut().record_load();
            }
            registration
        };

        let waiter = match registration {
            Registration::Leader => {
                debug!(key = %key, "cache miss, loading as leader");
                let guard = LeaderGuard::new(self, key);
                let value = loader().await?;
                return Ok(guard.commit(value, ttl));
            }
            Registration::Follower(waiter) => waiter,
        };

        let bound = follower_wait_bound(self.follower_wait, ttl.unwrap_or(self.default_ttl));
        debug!(key = %key, wait_ms = bound.as_millis() as u64, "load in flight, waiting");
        let outcome = waiter.wait(bound).await;

        {
            let mut state = self.state.lock();
            if let Some(value) = state.store.get(key) {
                state.store.stats_mut().record_coalesced();
                return Ok(value);
            }
            let stats = state.store.stats_mut();
            if outcome == WaitOutcome::TimedOut {
                stats.record_wait_timeout();
            }
            stats.record_load();
        }

        debug!(key = %key, ?outcome, "no value after wait, loading independently");
        match loader().await {
            Ok(value) => Ok(self.set(key, value, ttl)),
            Err(err) => {
                self.state.lock().store.stats_mut().record_load_failure();
                Err(err)
            }
        }
    }
}

impl<V> QueryCache<V>
where
    V: Clone,
{
    // == Cleanup Expired ==
    /// Drops every expired entry, returning how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        self.state.lock().store.cleanup_expired()
    }

    /// Counter snapshot including the number of in-flight loads.
    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        let mut stats = state.store.stats();
        stats.inflight = state.inflight.len();
        stats
    }

    pub fn len(&self) -> usize {
        self.state.lock().store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().store.is_empty()
    }

    /// Whether a load for `key` is currently registered.
    pub fn is_loading(&self, key: &str) -> bool {
        self.state.lock().inflight.contains(key)
    }
}

// == Leader Guard ==
/// Holds a leader's in-flight registration.
///
/// Committing stores the value and signals followers under one lock.
/// Dropping the guard without committing (loader error or a cancelled
/// future) still removes the registration and wakes followers.
struct LeaderGuard<'a, V: Clone> {
    cache: &'a QueryCache<V>,
    key: &'a str,
    armed: bool,
}

impl<'a, V: Clone> LeaderGuard<'a, V> {
    fn new(cache: &'a QueryCache<V>, key: &'a str) -> Self {
        Self {
            cache,
            key,
            armed: true,
        }
    }

    fn commit(mut self, value: V, ttl: Option<Duration>) -> V {
        let mut state = self.cache.state.lock();
        let value = state.store.set(self.key, value, ttl);
        state.inflight.finish(self.key);
        self.armed = false;
        value
    }
}

impl<V: Clone> Drop for LeaderGuard<'_, V> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.cache.state.lock();
        state.inflight.finish(self.key);
        state.store.stats_mut().record_load_failure();
        debug!(key = %self.key, "leader load did not complete, followers released");
    }
}
