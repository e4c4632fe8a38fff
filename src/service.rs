//! Data Service
//!
//! Composition root for the widget API. Owns the backend, the shared query
//! cache, the health indicator and the widget registry; handlers reach it
//! through axum state.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{info, warn};

use crate::backend::{Backend, Rows};
use crate::cache::{CacheStats, QueryCache};
use crate::config::{Config, WarmupConfig};
use crate::error::{Result, ServiceError};
use crate::models::{WidgetParams, WidgetResponse};
use crate::resilience::{HealthStatus, HealthStatusCache};
use crate::widgets::{
    cached_master_is_green, master_is_green, master_status_statement, Page, WidgetContext,
    WidgetKind, WidgetRegistry,
};

/// Page listed when a request does not name one.
pub const DEFAULT_PAGE: Page = Page::DexSwaps;

/// Outcome of a cache warmup run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WarmupReport {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
}

pub struct DataService {
    ctx: WidgetContext,
    registry: WidgetRegistry,
    health: HealthStatusCache,
    health_probe_timeout: Duration,
    warmup: WarmupConfig,
    slow_widget_threshold: Option<Duration>,
}

impl std::fmt::Debug for DataService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataService")
            .field("widgets", &self.registry.len())
            .field("health", &self.health)
            .finish_non_exhaustive()
    }
}

impl DataService {
    pub fn new(backend: Arc<dyn Backend>, config: &Config) -> Self {
        let cache = Arc::new(QueryCache::from_config(&config.cache));
        Self {
            ctx: WidgetContext::new(backend, cache),
            registry: WidgetRegistry::new(),
            health: HealthStatusCache::new(&config.health),
            health_probe_timeout: config.health.probe_timeout,
            warmup: config.warmup.clone(),
            slow_widget_threshold: config.slow_widget_threshold,
        }
    }

    /// The shared query cache, for the expired-entry sweeper.
    pub fn cache(&self) -> &Arc<QueryCache<Rows>> {
        &self.ctx.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.ctx.cache.stats()
    }

    // == Widgets ==
    /// Computes one widget and wraps it with response metadata.
    pub async fn get_widget_data(
        &self,
        page: &str,
        widget: &str,
        params: &WidgetParams,
    ) -> Result<WidgetResponse> {
        let started = Instant::now();
        if let Some(message) = params.validate() {
            return Err(ServiceError::InvalidParams(message));
        }
        let kind = self.resolve(page, widget)?;

        let data = kind.compute(&self.ctx, params).await?;
        let response = WidgetResponse::success(&params.protocol, &params.pair, data);

        if let Some(threshold) = self.slow_widget_threshold {
            let elapsed = started.elapsed();
            if elapsed >= threshold {
                warn!(
                    elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                    page = %page,
                    widget = %widget,
                    "slow widget"
                );
            }
        }
        Ok(response)
    }

    /// Widget ids served on `page`, or on the default page.
    pub fn list_widgets(&self, page: Option<&str>) -> Result<Vec<&'static str>> {
        let page = match page {
            Some(raw) => raw.parse()?,
            None => DEFAULT_PAGE,
        };
        Ok(self.registry.list(page))
    }

    fn resolve(&self, page: &str, widget: &str) -> Result<WidgetKind> {
        let parsed: Page = page.parse()?;
        self.registry
            .lookup(parsed, widget)
            .ok_or_else(|| ServiceError::UnknownWidget {
                page: page.to_string(),
                widget: widget.to_string(),
            })
    }

    // == Health ==
    /// Header indicator: green/red from the master health view. When the
    /// fast probe fails, cached master table rows decide; without those the
    /// last known status is served while the database is degraded.
    pub async fn health_status(&self) -> HealthStatus {
        let backend = self.ctx.backend.as_ref();
        let statement = master_status_statement(self.health_probe_timeout);
        self.health
            .get_or_derive(
                || async move {
                    let rows = backend.fetch_rows(&statement).await?;
                    Ok::<_, crate::error::BackendError>(master_is_green(&rows))
                },
                || cached_master_is_green(&self.ctx),
            )
            .await
    }

    // == Warmup ==
    /// Primes the cache with the widgets users open first. Runs jobs in
    /// order until the time budget is spent; failures are logged only.
    pub async fn warmup(&self) -> WarmupReport {
        let mut report = WarmupReport::default();
        if !self.warmup.enabled {
            return report;
        }

        let jobs = self.warmup_jobs();
        report.total = jobs.len();
        let started = Instant::now();

        for (kind, params) in &jobs {
            let budget = self.warmup.max_duration;
            if !budget.is_zero() && started.elapsed() >= budget {
                info!(
                    completed = report.completed,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "warmup budget reached"
                );
                break;
            }
            match kind.compute(&self.ctx, params).await {
                Ok(_) => report.completed += 1,
                Err(err) => {
                    report.failed += 1;
                    warn!(page = %kind.page(), widget = kind.id(), error = %err, "warmup failed");
                }
            }
        }

        info!(
            completed = report.completed,
            total = report.total,
            failed = report.failed,
            "warmup complete"
        );
        report
    }

    /// Window-independent widgets once, windowed widgets per configured
    /// window.
    fn warmup_jobs(&self) -> Vec<(WidgetKind, WidgetParams)> {
        let base = WidgetParams::default();
        let mut jobs: Vec<(WidgetKind, WidgetParams)> = WidgetKind::ALL
            .into_iter()
            .filter(|kind| !kind.is_windowed())
            .map(|kind| (kind, base.clone()))
            .collect();

        for window in &self.warmup.windows {
            let params = base.with_window(window);
            jobs.extend(
                WidgetKind::ALL
                    .into_iter()
                    .filter(|kind| kind.is_windowed())
                    .map(|kind| (kind, params.clone())),
            );
        }
        jobs
    }

    pub async fn close(&self) {
        self.ctx.backend.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Row, Statement};
    use crate::error::BackendError;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Answers statements by matching a fragment of their SQL.
    #[derive(Default)]
    struct ScriptedBackend {
        responses: Vec<(&'static str, std::result::Result<Vec<Row>, BackendError>)>,
        calls: AtomicUsize,
        statements: parking_lot::Mutex<Vec<Statement>>,
        failing: AtomicBool,
    }

    impl ScriptedBackend {
        fn respond(mut self, fragment: &'static str, rows: Value) -> Self {
            let rows = match rows {
                Value::Array(items) => items
                    .into_iter()
                    .filter_map(|item| match item {
                        Value::Object(row) => Some(row),
                        _ => None,
                    })
                    .collect(),
                _ => Vec::new(),
            };
            self.responses.push((fragment, Ok(rows)));
            self
        }

        fn fail_with(mut self, fragment: &'static str, err: BackendError) -> Self {
            self.responses.push((fragment, Err(err)));
            self
        }
    }

    #[async_trait]
    impl Backend for ScriptedBackend {
        async fn fetch_rows(&self, statement: &Statement) -> std::result::Result<Vec<Row>, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.statements.lock().push(statement.clone());
            if self.failing.load(Ordering::SeqCst) {
                return Err(BackendError::Unavailable("connection refused".into()));
            }
            self.responses
                .iter()
                .find(|(fragment, _)| statement.sql.contains(fragment))
                .map(|(_, response)| response.clone())
                .unwrap_or_else(|| Ok(Vec::new()))
        }

        async fn close(&self) {}
    }

    fn service(backend: Arc<ScriptedBackend>) -> DataService {
        DataService::new(backend, &Config::default())
    }

    #[tokio::test]
    async fn test_widget_response_and_caching() {
        let backend = Arc::new(
            ScriptedBackend::default()
                .respond("get_view_dex_last", json!([{"swap_vol_t1_total_24h": 1250.5, "swap_count_24h": 42}])),
        );
        let service = service(Arc::clone(&backend));
        let params = WidgetParams::default();

        let volume = service
            .get_widget_data("dex-swaps", "kpi-swap-volume-24h", &params)
            .await
            .unwrap();
        let count = service
            .get_widget_data("dex-swaps", "kpi-swap-count-24h", &params)
            .await
            .unwrap();

        assert_eq!(volume.status, "success");
        assert_eq!(volume.metadata.pair, "USX-USDC");
        assert_eq!(volume.data["primary"], json!(1250.5));
        assert_eq!(count.data["primary"], json!(42));
        // Both KPIs share one cached row.
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert_eq!(service.cache_stats().hits, 1);
    }

    #[tokio::test]
    async fn test_unknown_page_and_widget() {
        let service = service(Arc::new(ScriptedBackend::default()));
        let params = WidgetParams::default();

        let err = service.get_widget_data("nope", "x", &params).await.unwrap_err();
        assert!(matches!(err, ServiceError::UnknownPage(_)));

        let err = service
            .get_widget_data("kamino", "kpi-swap-volume-24h", &params)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::UnknownWidget { .. }));
    }

    #[tokio::test]
    async fn test_invalid_rows_rejected() {
        let service = service(Arc::new(ScriptedBackend::default()));
        let params = WidgetParams {
            rows: 0,
            ..WidgetParams::default()
        };

        let err = service
            .get_widget_data("kamino", "kamino-config-table", &params)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidParams(_)));
    }

    #[tokio::test]
    async fn test_ranked_events_fall_back_to_24_hours() {
        let backend = Arc::new(
            ScriptedBackend::default()
                .fail_with("ranked_events", BackendError::StatementTimeout),
        );
        let service = service(Arc::clone(&backend));
        let params = WidgetParams::default().with_window("90d");

        let err = service
            .get_widget_data("dex-swaps", "swaps-ranked-events", &params)
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Backend(BackendError::StatementTimeout)));
        let lookbacks: Vec<_> = backend
            .statements
            .lock()
            .iter()
            .map(|statement| statement.params[4].clone())
            .collect();
        // The sell query times out for 90 days, then once more for 24 hours.
        assert_eq!(lookbacks, vec!["90 days".into(), "24 hours".into()]);
    }

    #[tokio::test]
    async fn test_short_window_timeout_is_not_widened() {
        let backend = Arc::new(
            ScriptedBackend::default()
                .fail_with("ranked_events", BackendError::StatementTimeout),
        );
        let service = service(Arc::clone(&backend));
        let params = WidgetParams::default().with_window("1h");

        let err = service
            .get_widget_data("dex-swaps", "swaps-ranked-events", &params)
            .await
            .unwrap_err();

        assert!(matches!(err, ServiceError::Backend(BackendError::StatementTimeout)));
        let lookbacks: Vec<_> = backend
            .statements
            .lock()
            .iter()
            .map(|statement| statement.params[4].clone())
            .collect();
        assert_eq!(lookbacks, vec!["1 hour".into()]);
    }

    #[tokio::test]
    async fn test_ranked_events_merge_sides() {
        let backend = Arc::new(ScriptedBackend::default().respond(
            "ranked_events",
            json!([{"primary_flow": 10.0}, {"primary_flow": "30"}]),
        ));
        let service = service(backend);

        let response = service
            .get_widget_data("dex-swaps", "swaps-ranked-events", &WidgetParams::default())
            .await
            .unwrap();
        let rows = response.data["rows"].as_array().unwrap();

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0]["primary_flow"], json!("30"));
        assert_eq!(rows[0]["side"], json!("Sell USX"));
        assert_eq!(rows[3]["primary_flow"], json!(10.0));
    }

    #[tokio::test]
    async fn test_ecosystem_timeseries_never_fails() {
        let backend = Arc::new(
            ScriptedBackend::default()
                .fail_with("get_view_prop_timeseries", BackendError::StatementTimeout),
        );
        let service = service(backend);

        let response = service
            .get_widget_data("global-ecosystem", "ge-issuance-time", &WidgetParams::default())
            .await
            .unwrap();

        assert_eq!(response.data["x"], json!([]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_status_stale_if_error() {
        let backend = Arc::new(
            ScriptedBackend::default()
                .respond("v_health_master_table", json!([{"domain": "MASTER", "is_red": false}])),
        );
        let service = service(Arc::clone(&backend));

        assert_eq!(service.health_status().await, HealthStatus::Known(true));

        backend.failing.store(true, Ordering::SeqCst);
        tokio::time::advance(Duration::from_secs(16)).await;
        assert_eq!(service.health_status().await, HealthStatus::Known(true));

        let probe = backend.statements.lock().last().cloned().unwrap();
        assert_eq!(probe.timeout, Some(Duration::from_millis(2000)));
    }

    #[tokio::test]
    async fn test_health_status_derived_from_cached_master_rows() {
        let backend = Arc::new(ScriptedBackend::default().respond(
            "v_health_master_table",
            json!([{"domain": "MASTER", "is_red": true}, {"domain": "dexes", "is_red": false}]),
        ));
        let service = service(Arc::clone(&backend));

        service
            .get_widget_data("health", "health-master", &WidgetParams::default())
            .await
            .unwrap();
        backend.failing.store(true, Ordering::SeqCst);

        assert_eq!(service.health_status().await, HealthStatus::Known(false));
    }

    #[tokio::test]
    async fn test_health_status_unknown_without_data() {
        let service = service(Arc::new(ScriptedBackend::default()));
        assert_eq!(service.health_status().await, HealthStatus::Unknown);
    }

    #[tokio::test]
    async fn test_list_widgets() {
        let service = service(Arc::new(ScriptedBackend::default()));

        assert_eq!(service.list_widgets(None).unwrap().len(), 3);
        assert_eq!(
            service.list_widgets(Some("kamino")).unwrap(),
            vec!["kamino-config-table", "kamino-market-assets"]
        );
        assert!(service.list_widgets(Some("playbook-liquidity")).is_err());
    }

    #[tokio::test]
    async fn test_warmup_counts_jobs_and_failures() {
        let backend = Arc::new(
            ScriptedBackend::default().fail_with("kamino_lend.v_config", BackendError::Query("boom".into())),
        );
        let service = service(backend);

        let report = service.warmup().await;

        // 3 window-independent widgets plus 4 windowed ones for 3 windows.
        assert_eq!(report.total, 15);
        assert_eq!(report.failed, 1);
        assert_eq!(report.completed, 14);
    }

    #[tokio::test]
    async fn test_warmup_disabled() {
        let mut config = Config::default();
        config.warmup.enabled = false;
        let backend = Arc::new(ScriptedBackend::default());
        let service = DataService::new(backend.clone(), &config);

        assert_eq!(service.warmup().await, WarmupReport::default());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }
}
