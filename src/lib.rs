//! Widget Cache - read-through query caching for dashboard widgets
//!
//! A bounded TTL cache with single-flight loads sits between the widget
//! handlers and a shared PostgreSQL backend, with timeout fallback and
//! stale-if-error policies layered on top.

pub mod api;
pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod resilience;
pub mod service;
pub mod tasks;
pub mod widgets;

pub use api::AppState;
pub use config::Config;
pub use service::DataService;
pub use tasks::spawn_cleanup_task;
