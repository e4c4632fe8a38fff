//! Response DTOs for the widget API
//!
//! Defines the structure of outgoing HTTP response bodies.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::cache::CacheStats;

/// Provenance attached to every widget payload.
#[derive(Debug, Clone, Serialize)]
pub struct WidgetMetadata {
    pub protocol: String,
    pub pair: String,
    pub generated_at: DateTime<Utc>,
    /// Data freshness marker; not tracked yet
    pub watermark: Option<String>,
}

/// Response body for the widget endpoints
#[derive(Debug, Clone, Serialize)]
pub struct WidgetResponse {
    pub metadata: WidgetMetadata,
    /// Widget specific chart, table or KPI payload
    pub data: Value,
    pub status: String,
}

impl WidgetResponse {
    /// Wraps a widget payload with metadata stamped now.
    pub fn success(protocol: impl Into<String>, pair: impl Into<String>, data: Value) -> Self {
        Self {
            metadata: WidgetMetadata {
                protocol: protocol.into(),
                pair: pair.into(),
                generated_at: Utc::now(),
                watermark: None,
            },
            data,
            status: "success".to_string(),
        }
    }
}

/// Response body for the widget listing (GET /api/v1/widgets)
#[derive(Debug, Clone, Serialize)]
pub struct WidgetListResponse {
    pub widgets: Vec<&'static str>,
}

/// Response body for the header indicator (GET /api/v1/health-status)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthStatusResponse {
    /// `null` when the status has never been observed
    pub is_green: Option<bool>,
}

/// Response body for the stats endpoint (GET /api/v1/cache/stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: CacheStats,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
}

impl StatsResponse {
    /// Creates a new StatsResponse from cache statistics
    pub fn new(stats: CacheStats) -> Self {
        Self {
            hit_rate: stats.hit_rate(),
            stats,
        }
    }
}

/// Response body for the liveness endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_widget_response_shape() {
        let response = WidgetResponse::success("raydium", "USX-USDC", json!({"kind": "kpi"}));
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["status"], "success");
        assert_eq!(value["metadata"]["protocol"], "raydium");
        assert_eq!(value["metadata"]["watermark"], Value::Null);
        assert!(value["metadata"]["generated_at"].is_string());
        assert_eq!(value["data"]["kind"], "kpi");
    }

    #[test]
    fn test_health_status_serializes_null() {
        let value = serde_json::to_value(HealthStatusResponse { is_green: None }).unwrap();
        assert_eq!(value, json!({"is_green": null}));
    }

    #[test]
    fn test_stats_response_flattens_counters() {
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..CacheStats::default()
        };
        let value = serde_json::to_value(StatsResponse::new(stats)).unwrap();

        assert_eq!(value["hits"], 3);
        assert_eq!(value["hit_rate"], 0.75);
    }

    #[test]
    fn test_health_response() {
        let value = serde_json::to_value(HealthResponse::ok()).unwrap();
        assert_eq!(value, json!({"status": "ok"}));
    }
}
