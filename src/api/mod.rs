//! API Module
//!
//! HTTP handlers and routing for the widget REST API.
//!
//! # Endpoints
//! - `GET /health` - Liveness check
//! - `GET /api/v1/health-status` - Header health indicator
//! - `GET /api/v1/widgets` - List widgets of a page
//! - `GET /api/v1/:page/:widget` - Widget payload
//! - `GET /api/v1/cache/stats` - Cache statistics

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
