//! Request and Response models for the widget API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP query strings and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{WidgetListQuery, WidgetParams, MAX_ROWS};
pub use responses::{
    HealthResponse, HealthStatusResponse, StatsResponse, WidgetListResponse, WidgetMetadata,
    WidgetResponse,
};
