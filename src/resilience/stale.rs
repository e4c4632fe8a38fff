//! Last-good result fallback.
//!
//! Remembers the most recent successful result per key and serves it when
//! a later load fails, so charts keep rendering through transient backend
//! pressure. Unlike the query cache this has no expiry: a remembered value
//! is only replaced by a newer successful one.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;

use parking_lot::Mutex;
use tracing::warn;

pub struct StaleFallback<V> {
    last_good: Mutex<HashMap<String, V>>,
    /// Decides whether a successful result is worth remembering
    keep: fn(&V) -> bool,
}

impl<V> fmt::Debug for StaleFallback<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaleFallback")
            .field("keys", &self.last_good.lock().len())
            .finish()
    }
}

impl<V: Clone> StaleFallback<V> {
    /// Remembers every successful result.
    pub fn new() -> Self {
        Self::keeping(|_| true)
    }

    /// Remembers only results for which `keep` returns true, e.g. non-empty
    /// row sets.
    pub fn keeping(keep: fn(&V) -> bool) -> Self {
        Self {
            last_good: Mutex::new(HashMap::new()),
            keep,
        }
    }

    /// Awaits `load`; on success records the value, on failure returns the
    /// last recorded value for `key` or, if there is none, the error.
    pub async fn load<Fut, E>(&self, key: &str, load: Fut) -> Result<V, E>
    where
        Fut: Future<Output = Result<V, E>>,
        E: fmt::Display,
    {
        match load.await {
            Ok(value) => {
                if (self.keep)(&value) {
                    self.last_good.lock().insert(key.to_string(), value.clone());
                }
                Ok(value)
            }
            Err(err) => {
                let stale = self.last_good.lock().get(key).cloned();
                match stale {
                    Some(value) => {
                        warn!(key = %key, error = %err, "load failed, serving last good result");
                        Ok(value)
                    }
                    None => Err(err),
                }
            }
        }
    }

    pub fn last_good(&self, key: &str) -> Option<V> {
        self.last_good.lock().get(key).cloned()
    }
}

impl<V: Clone> Default for StaleFallback<V> {
    fn default() -> Self {
        Self::new()
    }
}
