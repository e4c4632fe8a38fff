//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for each endpoint against an
//! in-memory backend.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use widget_cache::{
    api::create_router,
    backend::{Backend, Row, Statement},
    error::BackendError,
    AppState, Config,
};

// == Helper Functions ==

/// Serves fixed rows per view, or fails every statement when `down` is set.
#[derive(Default)]
struct FakeBackend {
    calls: AtomicUsize,
    down: AtomicBool,
    timeout_on: Option<&'static str>,
}

fn rows(value: Value) -> Vec<Row> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(row) => Some(row),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn fetch_rows(&self, statement: &Statement) -> Result<Vec<Row>, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("connection refused".into()));
        }
        if self.timeout_on.is_some_and(|fragment| statement.sql.contains(fragment)) {
            return Err(BackendError::StatementTimeout);
        }

        let sql = statement.sql.as_str();
        let result = if sql.contains("get_view_dex_last") {
            json!([{"swap_vol_t1_total_24h": 98000.25, "swap_count_24h": 311}])
        } else if sql.contains("v_health_master_table") {
            json!([
                {"domain": "MASTER", "is_red": "f"},
                {"domain": "dexes", "domain_label": "DEXes", "is_red": "f"},
            ])
        } else if sql.contains("kamino_lend.v_config") {
            json!([{"market_quote_currency": "USD", "reserve_brw_all_symbols_array": ["USX"]}])
        } else {
            json!([])
        };
        Ok(rows(result))
    }

    async fn close(&self) {}
}

fn create_test_app(backend: Arc<FakeBackend>) -> Router {
    let state = AppState::from_config(backend, &Config::default());
    create_router(state)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

// == Health Endpoint Tests ==

#[tokio::test]
async fn test_health_endpoint() {
    let (status, json) = get(create_test_app(Arc::default()), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_health_status_green() {
    let (status, json) = get(create_test_app(Arc::default()), "/api/v1/health-status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"is_green": true}));
}

#[tokio::test]
async fn test_health_status_unknown_when_backend_down() {
    let backend = Arc::new(FakeBackend::default());
    backend.down.store(true, Ordering::SeqCst);

    let (status, json) = get(create_test_app(backend), "/api/v1/health-status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"is_green": null}));
}

// == Widget Endpoint Tests ==

#[tokio::test]
async fn test_widget_payload() {
    let (status, json) = get(
        create_test_app(Arc::default()),
        "/api/v1/dex-swaps/kpi-swap-count-24h?pair=USX-USDC&last_window=7d",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "success");
    assert_eq!(json["metadata"]["protocol"], "raydium");
    assert_eq!(json["metadata"]["pair"], "USX-USDC");
    assert_eq!(json["data"], json!({"kind": "kpi", "primary": 311, "label": "24h Swap Count"}));
}

#[tokio::test]
async fn test_long_form_route() {
    let (status, json) = get(
        create_test_app(Arc::default()),
        "/api/v1/pages/kamino/widgets/kamino-config-table",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["rows"][0]["value"], "USD");
    assert_eq!(json["data"]["rows"][2]["units"], "%, USX");
}

#[tokio::test]
async fn test_repeated_requests_hit_cache() {
    let backend = Arc::new(FakeBackend::default());
    let app = create_test_app(Arc::clone(&backend));

    for _ in 0..3 {
        let (status, _) = get(app.clone(), "/api/v1/dex-swaps/kpi-swap-volume-24h").await;
        assert_eq!(status, StatusCode::OK);
    }

    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    let (_, stats) = get(app, "/api/v1/cache/stats").await;
    assert_eq!(stats["hits"], 2);
    assert_eq!(stats["misses"], 1);
    assert_eq!(stats["loads"], 1);
    assert_eq!(stats["total_entries"], 1);
}

#[tokio::test]
async fn test_unknown_page_not_found() {
    let (status, json) = get(
        create_test_app(Arc::default()),
        "/api/v1/playbook-liquidity/kpi-tvl",
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].as_str().unwrap().contains("playbook-liquidity"));
}

#[tokio::test]
async fn test_unknown_widget_not_found() {
    let (status, _) = get(create_test_app(Arc::default()), "/api/v1/health/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rows_out_of_range_is_bad_request() {
    let (status, json) = get(
        create_test_app(Arc::default()),
        "/api/v1/kamino/kamino-config-table?rows=501",
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("rows"));
}

#[tokio::test]
async fn test_backend_failure_is_server_error() {
    let backend = Arc::new(FakeBackend::default());
    backend.down.store(true, Ordering::SeqCst);

    let (status, json) = get(create_test_app(backend), "/api/v1/health/health-master").await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["error"].as_str().unwrap().starts_with("Widget query failed"));
}

#[tokio::test]
async fn test_statement_timeout_is_gateway_timeout() {
    let backend = Arc::new(FakeBackend {
        timeout_on: Some("kamino_lend.v_last"),
        ..FakeBackend::default()
    });

    let (status, _) = get(create_test_app(backend), "/api/v1/kamino/kamino-market-assets").await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
}

#[tokio::test]
async fn test_ecosystem_chart_survives_timeout() {
    let backend = Arc::new(FakeBackend {
        timeout_on: Some("get_view_prop_timeseries"),
        ..FakeBackend::default()
    });

    let (status, json) = get(
        create_test_app(backend),
        "/api/v1/global-ecosystem/ge-issuance-time?last_window=30d",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["kind"], "chart");
    assert_eq!(json["data"]["x"], json!([]));
}

// == Listing Endpoint Tests ==

#[tokio::test]
async fn test_list_widgets_default_page() {
    let (status, json) = get(create_test_app(Arc::default()), "/api/v1/widgets").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        json!({"widgets": ["kpi-swap-count-24h", "kpi-swap-volume-24h", "swaps-ranked-events"]})
    );
}

#[tokio::test]
async fn test_list_widgets_for_page() {
    let (status, json) = get(create_test_app(Arc::default()), "/api/v1/widgets?page=health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"widgets": ["health-master"]}));
}

#[tokio::test]
async fn test_list_widgets_unknown_page() {
    let (status, _) = get(create_test_app(Arc::default()), "/api/v1/widgets?page=exponent").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
