//! Cache Module
//!
//! Bounded in-memory caching with TTL expiration, LRU eviction and
//! single-flight coordination of concurrent loads.

mod entry;
mod key;
mod lru;
mod query_cache;
pub mod singleflight;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub(crate) use entry::deadline_after;
pub use key::CacheKey;
pub use lru::LruTracker;
pub use query_cache::QueryCache;
pub use singleflight::{InflightRegistry, Registration, WaitOutcome};
pub use stats::CacheStats;
pub use store::CacheStore;
