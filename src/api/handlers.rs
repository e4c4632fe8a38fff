//! API Handlers
//!
//! HTTP request handlers for each widget API endpoint.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};

use crate::config::Config;
use crate::error::Result;
use crate::models::{
    HealthResponse, HealthStatusResponse, StatsResponse, WidgetListQuery, WidgetListResponse,
    WidgetParams, WidgetResponse,
};
use crate::service::DataService;

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub service: Arc<DataService>,
}

impl AppState {
    /// Creates a new AppState around an existing service.
    pub fn new(service: Arc<DataService>) -> Self {
        Self { service }
    }

    /// Creates a new AppState from configuration and a backend.
    pub fn from_config(backend: Arc<dyn crate::backend::Backend>, config: &Config) -> Self {
        Self::new(Arc::new(DataService::new(backend, config)))
    }
}

/// Handler for GET /api/v1/:page/:widget and
/// GET /api/v1/pages/:page/widgets/:widget
pub async fn widget_handler(
    State(state): State<AppState>,
    Path((page, widget)): Path<(String, String)>,
    Query(params): Query<WidgetParams>,
) -> Result<Json<WidgetResponse>> {
    let response = state
        .service
        .get_widget_data(&page, &widget, &params)
        .await?;

    Ok(Json(response))
}

/// Handler for GET /api/v1/widgets
pub async fn list_widgets_handler(
    State(state): State<AppState>,
    Query(query): Query<WidgetListQuery>,
) -> Result<Json<WidgetListResponse>> {
    let widgets = state.service.list_widgets(query.page.as_deref())?;

    Ok(Json(WidgetListResponse { widgets }))
}

/// Handler for GET /api/v1/health-status
///
/// Never fails; an unobserved status is reported as `null`.
pub async fn health_status_handler(State(state): State<AppState>) -> Json<HealthStatusResponse> {
    let status = state.service.health_status().await;

    Json(HealthStatusResponse {
        is_green: status.is_green(),
    })
}

/// Handler for GET /api/v1/cache/stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::new(state.service.cache_stats()))
}

/// Handler for GET /health
///
/// Liveness only; does not touch the database.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}
