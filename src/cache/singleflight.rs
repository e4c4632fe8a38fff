//! Single-Flight Module
//!
//! Tracks loads that are currently executing so that concurrent callers for
//! the same key can wait for one load instead of starting their own.
//!
//! Each in-flight key owns a `watch` channel used as a one-shot broadcast:
//! the leader flips it to `true` exactly once when it finishes, and every
//! follower holding a receiver wakes up. Receivers never see the loaded
//! value; followers re-read the cache after waking.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::watch;

/// Lower bound on a follower wait derived from a TTL.
pub const MIN_FOLLOWER_WAIT: Duration = Duration::from_secs(1);

// == Registration ==
/// Outcome of trying to register a load for a key.
#[derive(Debug)]
pub enum Registration {
    /// No load was running; the caller must run the loader and later call
    /// [`InflightRegistry::finish`].
    Leader,
    /// Another caller is loading; wait on the receiver.
    Follower(LoadWaiter),
}

// == Wait Outcome ==
/// How a follower's wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The leader finished (successfully or not)
    Signaled,
    /// The wait bound elapsed first
    TimedOut,
}

// == Load Waiter ==
/// Follower side of an in-flight load.
#[derive(Debug)]
pub struct LoadWaiter {
    rx: watch::Receiver<bool>,
}

impl LoadWaiter {
    /// Waits until the leader signals or `bound` elapses.
    ///
    /// A leader that disappears without signaling (its sender was dropped)
    /// counts as signaled: there is nothing left to wait for.
    pub async fn wait(mut self, bound: Duration) -> WaitOutcome {
        match tokio::time::timeout(bound, self.rx.wait_for(|done| *done)).await {
            Ok(_) => WaitOutcome::Signaled,
            Err(_) => WaitOutcome::TimedOut,
        }
    }
}

// == In-Flight Registry ==
/// Map of keys to the broadcast handle of their running load.
///
/// Not synchronized on its own; the façade keeps it behind the same lock as
/// the cache store so a miss and the registration happen atomically.
#[derive(Debug, Default)]
pub struct InflightRegistry {
    loads: HashMap<String, watch::Sender<bool>>,
}

impl InflightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // == Register ==
    /// Registers the caller as leader for `key`, or hands back a waiter when
    /// a load is already running.
    pub fn register(&mut self, key: &str) -> Registration {
        if let Some(tx) = self.loads.get(key) {
            return Registration::Follower(LoadWaiter { rx: tx.subscribe() });
        }

        let (tx, _rx) = watch::channel(false);
        self.loads.insert(key.to_string(), tx);
        Registration::Leader
    }

    // == Finish ==
    /// Removes the registration for `key` and wakes every waiter.
    ///
    /// Returns false when nothing was registered.
    pub fn finish(&mut self, key: &str) -> bool {
        match self.loads.remove(key) {
            Some(tx) => {
                tx.send_replace(true);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.loads.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.loads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loads.is_empty()
    }
}

/// Computes how long a follower waits for a leader.
///
/// An explicit bound is used as is. Otherwise the wait follows the TTL that
/// governs the call, floored at [`MIN_FOLLOWER_WAIT`].
pub fn follower_wait_bound(explicit: Option<Duration>, governing_ttl: Duration) -> Duration {
    explicit.unwrap_or_else(|| governing_ttl.max(MIN_FOLLOWER_WAIT))
}
