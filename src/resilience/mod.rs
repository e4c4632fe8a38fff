//! Resilience Module
//!
//! Degraded-mode policies layered on top of the query cache: timeout
//! escalation inside loaders, a stale-if-error health indicator, and a
//! last-good fallback for results that should survive backend errors.

mod health;
mod retry;
mod stale;

pub use health::{HealthStatus, HealthStatusCache};
pub use retry::TimeoutFallback;
pub use stale::StaleFallback;
