//! Widget Kinds
//!
//! Every servable widget, its page, and how it turns cached query rows
//! into a chart, table or KPI payload.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tracing::warn;

use super::format::{column, display_value, join_symbols, number, truthy};
use super::{Page, TimeWindow, WidgetContext};
use crate::backend::{Backend, Row, Rows, Statement};
use crate::cache::CacheKey;
use crate::error::BackendError;
use crate::models::WidgetParams;
use crate::resilience::TimeoutFallback;

const KAMINO_LAST_TTL: Duration = Duration::from_secs(15);
const KAMINO_CONFIG_TTL: Duration = Duration::from_secs(30);
const HEALTH_TABLE_TTL: Duration = Duration::from_secs(60);
const GE_TIMESERIES_TTL: Duration = Duration::from_secs(300);
/// Cold ecosystem timeseries are expensive; one request must be able to
/// populate the cache.
const GE_TIMESERIES_TIMEOUT: Duration = Duration::from_secs(60);
/// Ranked events fetched per swap direction.
const RANKED_EVENTS_PER_SIDE: i64 = 6;

const RED: &str = "\u{1f534}";
const GREEN: &str = "\u{1f7e2}";

// == Widget Kind ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WidgetKind {
    KpiSwapVolume24h,
    KpiSwapCount24h,
    SwapsRankedEvents,
    KaminoMarketAssets,
    KaminoConfigTable,
    HealthMasterTable,
    GeTimeseries,
}

impl WidgetKind {
    pub const ALL: [WidgetKind; 7] = [
        WidgetKind::KpiSwapVolume24h,
        WidgetKind::KpiSwapCount24h,
        WidgetKind::SwapsRankedEvents,
        WidgetKind::KaminoMarketAssets,
        WidgetKind::KaminoConfigTable,
        WidgetKind::HealthMasterTable,
        WidgetKind::GeTimeseries,
    ];

    /// Identifier used in URLs, unique within a page.
    pub fn id(self) -> &'static str {
        match self {
            WidgetKind::KpiSwapVolume24h => "kpi-swap-volume-24h",
            WidgetKind::KpiSwapCount24h => "kpi-swap-count-24h",
            WidgetKind::SwapsRankedEvents => "swaps-ranked-events",
            WidgetKind::KaminoMarketAssets => "kamino-market-assets",
            WidgetKind::KaminoConfigTable => "kamino-config-table",
            WidgetKind::HealthMasterTable => "health-master",
            WidgetKind::GeTimeseries => "ge-issuance-time",
        }
    }

    pub fn page(self) -> Page {
        match self {
            WidgetKind::KpiSwapVolume24h
            | WidgetKind::KpiSwapCount24h
            | WidgetKind::SwapsRankedEvents => Page::DexSwaps,
            WidgetKind::KaminoMarketAssets | WidgetKind::KaminoConfigTable => Page::Kamino,
            WidgetKind::HealthMasterTable => Page::Health,
            WidgetKind::GeTimeseries => Page::GlobalEcosystem,
        }
    }

    /// Whether the payload depends on `last_window`.
    pub fn is_windowed(self) -> bool {
        matches!(
            self,
            WidgetKind::KpiSwapVolume24h
                | WidgetKind::KpiSwapCount24h
                | WidgetKind::SwapsRankedEvents
                | WidgetKind::GeTimeseries
        )
    }

    // == Compute ==
    /// Builds the widget payload, reading rows through the shared cache.
    pub async fn compute(
        self,
        ctx: &WidgetContext,
        params: &WidgetParams,
    ) -> Result<Value, BackendError> {
        match self {
            WidgetKind::KpiSwapVolume24h => {
                let rows = dex_last(ctx, params).await?;
                Ok(kpi(first(&rows), "swap_vol_t1_total_24h", "24h Transaction Volume"))
            }
            WidgetKind::KpiSwapCount24h => {
                let rows = dex_last(ctx, params).await?;
                Ok(kpi(first(&rows), "swap_count_24h", "24h Swap Count"))
            }
            WidgetKind::SwapsRankedEvents => {
                let rows = ranked_events(ctx, params).await?;
                Ok(ranked_events_table(&rows))
            }
            WidgetKind::KaminoMarketAssets => {
                let rows = kamino_last(ctx).await?;
                Ok(market_assets(first(&rows)))
            }
            WidgetKind::KaminoConfigTable => {
                let rows = kamino_config(ctx).await?;
                Ok(config_table(first(&rows)))
            }
            WidgetKind::HealthMasterTable => {
                let rows = health_master(ctx).await?;
                Ok(master_table(&rows))
            }
            WidgetKind::GeTimeseries => {
                let rows = ge_timeseries(ctx, params.window()).await;
                Ok(issuance_chart(&rows))
            }
        }
    }
}

/// Green/red answer of the master health view: the `MASTER` row when
/// present, otherwise green only if no row is red. `None` without rows.
pub fn master_is_green(rows: &[Row]) -> Option<bool> {
    if rows.is_empty() {
        return None;
    }
    match rows.iter().find(|row| is_master(row)) {
        Some(master) => Some(!truthy(master.get("is_red"))),
        None => Some(!rows.iter().any(|row| truthy(row.get("is_red")))),
    }
}

/// Green/red from master table rows already in the cache. Never queries.
pub fn cached_master_is_green(ctx: &WidgetContext) -> Option<bool> {
    ctx.cache
        .get(health_master_key().as_str())
        .and_then(|rows| master_is_green(&rows))
}

/// Statement behind the header health indicator.
pub fn master_status_statement(timeout: Duration) -> Statement {
    Statement::new("SELECT domain, is_red FROM health.v_health_master_table").with_timeout(timeout)
}

// == Loaders ==
async fn load(
    ctx: &WidgetContext,
    key: &CacheKey,
    statement: Statement,
    ttl: Option<Duration>,
) -> Result<Rows, BackendError> {
    let backend = ctx.backend.as_ref();
    ctx.cache
        .cached(
            key.as_str(),
            || async move { backend.fetch_rows(&statement).await.map(Arc::new) },
            ttl,
        )
        .await
}

async fn dex_last(ctx: &WidgetContext, params: &WidgetParams) -> Result<Rows, BackendError> {
    let lookback = params.window().lookback();
    let key = CacheKey::new("dex_swaps")
        .part("dex_last")
        .part(&params.protocol)
        .part(&params.pair)
        .part(lookback);
    let statement =
        Statement::new("SELECT * FROM dexes.get_view_dex_last($1, $2, $3::interval) LIMIT 1")
            .bind(params.protocol.as_str())
            .bind(params.pair.as_str())
            .bind(lookback);
    load(ctx, &key, statement, None).await
}

async fn ranked_events(ctx: &WidgetContext, params: &WidgetParams) -> Result<Rows, BackendError> {
    let lookback = params.window().lookback();
    let key = CacheKey::new("dex_swaps")
        .part("ranked_events")
        .part(&params.protocol)
        .part(&params.pair)
        .part(lookback);
    let policy = TimeoutFallback::on_statement_timeout(TimeWindow::Hours24);
    let backend = ctx.backend.as_ref();

    ctx.cache
        .cached(
            key.as_str(),
            || async {
                policy
                    .run(params.window(), |active| {
                        fetch_ranked_events(backend, params, active)
                    })
                    .await
                    .map(Arc::new)
            },
            None,
        )
        .await
}

/// Sell and buy events for one lookback, merged by descending flow.
async fn fetch_ranked_events(
    backend: &dyn Backend,
    params: &WidgetParams,
    window: TimeWindow,
) -> Result<Vec<Row>, BackendError> {
    let statement = |direction: &str| {
        Statement::new(
            "SELECT * FROM dexes.get_view_dex_table_ranked_events(\
             $1, $2, 'swap', 't0', $3, $4::int, $5::interval)",
        )
        .bind(params.protocol.as_str())
        .bind(params.pair.as_str())
        .bind(direction)
        .bind(RANKED_EVENTS_PER_SIDE)
        .bind(window.lookback())
    };

    let sells = backend.fetch_rows(&statement("in")).await?;
    let buys = backend.fetch_rows(&statement("out")).await?;

    let mut combined: Vec<Row> = sells
        .into_iter()
        .map(|row| with_side(row, "Sell USX"))
        .chain(buys.into_iter().map(|row| with_side(row, "Buy USX")))
        .collect();
    combined.sort_by(|a, b| {
        number(b.get("primary_flow"))
            .partial_cmp(&number(a.get("primary_flow")))
            .unwrap_or(Ordering::Equal)
    });
    combined.truncate(RANKED_EVENTS_PER_SIDE as usize * 2);
    Ok(combined)
}

fn with_side(mut row: Row, side: &str) -> Row {
    row.insert("side".to_string(), Value::from(side));
    row
}

async fn kamino_last(ctx: &WidgetContext) -> Result<Rows, BackendError> {
    let key = CacheKey::new("kamino").part("v_last");
    let statement = Statement::new("SELECT * FROM kamino_lend.v_last LIMIT 1");
    load(ctx, &key, statement, Some(KAMINO_LAST_TTL)).await
}

async fn kamino_config(ctx: &WidgetContext) -> Result<Rows, BackendError> {
    let key = CacheKey::new("kamino").part("v_config");
    let statement = Statement::new("SELECT * FROM kamino_lend.v_config LIMIT 1");
    load(ctx, &key, statement, Some(KAMINO_CONFIG_TTL)).await
}

fn health_master_key() -> CacheKey {
    CacheKey::new("health").part("master")
}

async fn health_master(ctx: &WidgetContext) -> Result<Rows, BackendError> {
    let key = health_master_key();
    let statement = Statement::new("SELECT * FROM health.v_health_master_table");
    load(ctx, &key, statement, Some(HEALTH_TABLE_TTL)).await
}

/// Ecosystem timeseries rows. Falls back to the last good rows for the
/// window, then to an empty series, so the chart keeps rendering while the
/// database is under pressure.
async fn ge_timeseries(ctx: &WidgetContext, window: TimeWindow) -> Rows {
    let key = CacheKey::new("ge").part("ts").part(window);
    let statement = Statement::new(
        "SELECT * FROM solstice_proprietary.get_view_prop_timeseries(\
         $1::interval, NOW() - $2::interval, NOW()) ORDER BY bucket_time",
    )
    .bind(window.bucket())
    .bind(window.lookback())
    .with_timeout(GE_TIMESERIES_TIMEOUT);

    let fresh = load(ctx, &key, statement, Some(GE_TIMESERIES_TTL));
    match ctx.ge_history.load(window.label(), fresh).await {
        Ok(rows) => rows,
        Err(err) => {
            warn!(window = %window, error = %err, "no ecosystem timeseries available");
            Rows::default()
        }
    }
}

// == Payloads ==
fn first(rows: &[Row]) -> Option<&Row> {
    rows.first()
}

fn is_master(row: &Row) -> bool {
    row.get("domain")
        .and_then(Value::as_str)
        .is_some_and(|domain| domain.eq_ignore_ascii_case("MASTER"))
}

fn kpi(row: Option<&Row>, field: &str, label: &str) -> Value {
    let primary = row.map(|row| column(row, field)).unwrap_or(Value::Null);
    json!({ "kind": "kpi", "primary": primary, "label": label })
}

fn ranked_events_table(rows: &[Row]) -> Value {
    json!({
        "kind": "table",
        "columns": [
            {"key": "tx_time", "label": "Time"},
            {"key": "side", "label": "Side"},
            {"key": "primary_flow", "label": "USX Amount"},
            {"key": "primary_flow_impact_bps_now", "label": "Est. Price Impact (bps)"},
            {"key": "signature", "label": "Tx Signature"},
        ],
        "rows": rows,
    })
}

fn market_assets(row: Option<&Row>) -> Value {
    let field = |name: &str| row.map(|row| column(row, name)).unwrap_or(Value::Null);
    json!({
        "kind": "kpi-group",
        "items": [
            {"label": "Loan Value", "value": field("reserve_brw_all_borrowed")},
            {"label": "Collateral Value", "value": field("reserve_coll_all_collateral")},
            {"label": "Utilization", "value": field("reserve_brw_all_utilization_pct"), "unit": "%"},
            {"label": "Obligations", "value": field("obl_debt_borrow_nonzero_count")},
        ],
    })
}

fn config_table(row: Option<&Row>) -> Value {
    let get = |name: &str| row.and_then(|row| row.get(name));
    let borrow_symbols = join_symbols(get("reserve_brw_all_symbols_array"));
    let collateral_symbols = join_symbols(get("reserve_coll_all_symbols_array"));
    let units = |base: &str, symbols: &str| {
        if symbols.is_empty() {
            base.to_string()
        } else {
            format!("{base}, {symbols}")
        }
    };

    let terms = [
        ("Quote Currency", "symbol / address".to_string(), "market_quote_currency"),
        ("User Borrow Limits", "quote curr. units".to_string(), "market_user_borrow_limit"),
        ("Risk Weight for Loan LTV", units("%", &borrow_symbols), "reserve_brw_all_risk_weight_array"),
        ("General New Loan LTV", units("%", &collateral_symbols), "reserve_coll_all_ltv_new_loan_array"),
        ("Unhealthy Threshold LTV", units("%", &collateral_symbols), "reserve_coll_all_ltv_unhealthy_array"),
        ("Bad Debt Threshold LTV", "%".to_string(), "market_ltv_bad"),
        ("Unhealthy Loan Share Liquidatable", "%".to_string(), "market_liquidatable_unhealthy_share"),
        ("Small Loans Fully Liquidatable", "quote curr. units".to_string(), "market_liquidatable_small_loan_full"),
        ("Max Amount Liquidatable [Any]", "quote curr. units".to_string(), "market_liquidatable_max_value"),
        ("Min Liquidation Fee", units("bps", &borrow_symbols), "reserve_brw_all_liquidation_fee_unhealthy_min_array"),
        ("Max Liquidation Fee", units("bps", &borrow_symbols), "reserve_brw_all_liquidation_fee_unhealthy_max_array"),
    ];

    let rows: Vec<Value> = terms
        .into_iter()
        .map(|(term, units, field)| {
            json!({ "term": term, "units": units, "value": display_value(get(field)) })
        })
        .collect();

    json!({
        "kind": "table",
        "columns": [
            {"key": "term", "label": "Term"},
            {"key": "units", "label": "Units"},
            {"key": "value", "label": "Value"},
        ],
        "rows": rows,
    })
}

fn master_table(rows: &[Row]) -> Value {
    let indicator = |row: &Row, field: &str| if truthy(row.get(field)) { RED } else { GREEN };
    let is_green = rows
        .iter()
        .find(|row| is_master(row))
        .is_some_and(|master| !truthy(master.get("is_red")));
    let title = if is_green {
        format!("{GREEN} Master Health: ALL SYSTEMS NOMINAL")
    } else {
        format!("{RED} Master Health: ACTION REQUIRED")
    };

    let domains: Vec<Value> = rows
        .iter()
        .filter(|row| !is_master(row))
        .map(|row| {
            json!({
                "status": indicator(row, "is_red"),
                "domain_label": column(row, "domain_label"),
                "queues": indicator(row, "queue_red"),
                "triggers": indicator(row, "trigger_red"),
                "base_tables": indicator(row, "base_red"),
                "cagg_refresh": indicator(row, "cagg_red"),
                "is_red": truthy(row.get("is_red")),
            })
        })
        .collect();

    json!({
        "kind": "table",
        "title_override": title,
        "columns": [
            {"key": "status", "label": "Status"},
            {"key": "domain_label", "label": "Domain"},
            {"key": "queues", "label": "Queues"},
            {"key": "triggers", "label": "Triggers"},
            {"key": "base_tables", "label": "Base Tables"},
            {"key": "cagg_refresh", "label": "CAGG Refresh"},
        ],
        "rows": domains,
    })
}

fn issuance_chart(rows: &[Row]) -> Value {
    let series = |name: &str, color: &str, field: &str| {
        let data: Vec<Value> = rows.iter().map(|row| column(row, field)).collect();
        json!({
            "name": name,
            "type": "line",
            "area": true,
            "stack": "dist",
            "color": color,
            "data": data,
        })
    };
    let x: Vec<Value> = rows.iter().map(|row| column(row, "bucket_time")).collect();

    json!({
        "kind": "chart",
        "chart": "line",
        "x": x,
        "yAxisLabel": "% of USX Supply",
        "yAxisFormat": "pct1",
        "yAxisMin": 0,
        "yAxisMax": 100,
        "series": [
            series("USX (pure)", "#f8a94a", "usx_csupply_pure_pct"),
            series("eUSX (pure)", "#ae82ff", "eusx_csupply_pure_pct"),
            series("SY (USX eq.)", "#facc15", "sy_all_csupply_in_usx_pure_pct"),
            series("PT/YT (USX eq.)", "#4bb7ff", "ptyt_all_csupply_in_usx_pct"),
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_ids_are_unique_per_page() {
        for kind in WidgetKind::ALL {
            let clashes = WidgetKind::ALL
                .iter()
                .filter(|other| other.page() == kind.page() && other.id() == kind.id())
                .count();
            assert_eq!(clashes, 1, "{}", kind.id());
        }
    }

    #[test]
    fn test_master_row_decides() {
        let rows = vec![
            row(json!({"domain": "MASTER", "is_red": "f"})),
            row(json!({"domain": "dexes", "is_red": true})),
        ];
        assert_eq!(master_is_green(&rows), Some(true));
    }

    #[test]
    fn test_without_master_any_red_row_is_red() {
        let rows = vec![
            row(json!({"domain": "dexes", "is_red": false})),
            row(json!({"domain": "kamino", "is_red": 1})),
        ];
        assert_eq!(master_is_green(&rows), Some(false));

        let rows = vec![row(json!({"domain": "dexes", "is_red": null}))];
        assert_eq!(master_is_green(&rows), Some(true));
    }

    #[test]
    fn test_no_rows_is_no_data() {
        assert_eq!(master_is_green(&[]), None);
    }

    #[test]
    fn test_kpi_without_row() {
        let value = kpi(None, "swap_count_24h", "24h Swap Count");
        assert_eq!(value, json!({"kind": "kpi", "primary": null, "label": "24h Swap Count"}));
    }

    #[test]
    fn test_config_table_units_include_symbols() {
        let config = row(json!({
            "reserve_brw_all_symbols_array": ["USX"],
            "reserve_brw_all_risk_weight_array": [100],
            "market_ltv_bad": 99.5,
        }));
        let table = config_table(Some(&config));
        let rows = table["rows"].as_array().unwrap();

        assert_eq!(rows.len(), 11);
        assert_eq!(rows[2]["units"], "%, USX");
        assert_eq!(rows[2]["value"], "100");
        assert_eq!(rows[3]["units"], "%");
        assert_eq!(rows[5]["value"], "99.5");
        assert_eq!(rows[0]["value"], "");
    }

    #[test]
    fn test_master_table_excludes_master_row() {
        let rows = vec![
            row(json!({"domain": "MASTER", "is_red": false})),
            row(json!({"domain": "dexes", "domain_label": "DEXes", "is_red": false, "queue_red": true})),
        ];
        let table = master_table(&rows);

        assert!(table["title_override"].as_str().unwrap().contains("ALL SYSTEMS NOMINAL"));
        assert_eq!(table["rows"].as_array().unwrap().len(), 1);
        assert_eq!(table["rows"][0]["queues"], RED);
        assert_eq!(table["rows"][0]["triggers"], GREEN);
    }

    #[test]
    fn test_issuance_chart_series() {
        let rows = vec![
            row(json!({"bucket_time": "t0", "usx_csupply_pure_pct": 60.0})),
            row(json!({"bucket_time": "t1", "usx_csupply_pure_pct": 61.0})),
        ];
        let chart = issuance_chart(&rows);

        assert_eq!(chart["x"], json!(["t0", "t1"]));
        assert_eq!(chart["series"][0]["data"], json!([60.0, 61.0]));
        assert_eq!(chart["series"][1]["data"], json!([null, null]));
    }
}
