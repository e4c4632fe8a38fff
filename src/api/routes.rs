//! API Routes
//!
//! Configures the Axum router with all widget API endpoints.

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    health_handler, health_status_handler, list_widgets_handler, stats_handler, widget_handler,
    AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Liveness check
/// - `GET /api/v1/health-status` - Header health indicator
/// - `GET /api/v1/widgets?page=` - Widget ids served on a page
/// - `GET /api/v1/:page/:widget` - Widget payload
/// - `GET /api/v1/pages/:page/widgets/:widget` - Widget payload (long form)
/// - `GET /api/v1/cache/stats` - Query cache statistics
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/v1/health-status", get(health_status_handler))
        .route("/api/v1/widgets", get(list_widgets_handler))
        .route("/api/v1/cache/stats", get(stats_handler))
        .route("/api/v1/pages/:page/widgets/:widget", get(widget_handler))
        .route("/api/v1/:page/:widget", get(widget_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
