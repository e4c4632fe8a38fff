//! Cache key construction.
//!
//! Keys are a namespace followed by parameter values, joined with `::`.
//! Values are escaped so that no two distinct parameter lists can produce
//! the same key, e.g. `("a::b", "c")` and `("a", "b::c")`.

use std::fmt;

/// Builder for collision-free cache keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Starts a key in `namespace`, e.g. `"dex_swaps::ranked_events"`.
    ///
    /// The namespace is written verbatim and should be a literal.
    pub fn new(namespace: &str) -> Self {
        Self(namespace.to_string())
    }

    /// Appends one parameter value.
    pub fn part(mut self, value: impl fmt::Display) -> Self {
        self.0.push_str("::");
        for ch in value.to_string().chars() {
            match ch {
                '%' => self.0.push_str("%25"),
                ':' => self.0.push_str("%3A"),
                other => self.0.push(other),
            }
        }
        self
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}
