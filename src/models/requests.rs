//! Request DTOs for the widget API
//!
//! Defines the query strings accepted by the HTTP endpoints.

use serde::Deserialize;

use crate::widgets::TimeWindow;

/// Largest `rows` value a widget request may ask for.
pub const MAX_ROWS: u32 = 500;

/// Query string for the widget endpoints
///
/// # Fields
/// - `protocol`: DEX protocol the widget reads (default `raydium`)
/// - `pair`: Trading pair (default `USX-USDC`)
/// - `last_window`: Lookback window such as `24h` or `7d` (default `24h`)
/// - `rows`: Row limit for table widgets, 1 to 500 (default 120)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WidgetParams {
    pub protocol: String,
    pub pair: String,
    pub last_window: String,
    pub rows: u32,
}

impl Default for WidgetParams {
    fn default() -> Self {
        Self {
            protocol: "raydium".to_string(),
            pair: "USX-USDC".to_string(),
            last_window: "24h".to_string(),
            rows: 120,
        }
    }
}

impl WidgetParams {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.rows == 0 || self.rows > MAX_ROWS {
            return Some(format!("rows must be between 1 and {MAX_ROWS}"));
        }
        if self.protocol.is_empty() || self.pair.is_empty() {
            return Some("protocol and pair cannot be empty".to_string());
        }
        None
    }

    /// The parsed lookback window; unknown values fall back to 24 hours.
    pub fn window(&self) -> TimeWindow {
        TimeWindow::parse(&self.last_window)
    }

    /// Copy of these params with a different `last_window`.
    pub fn with_window(&self, window: &str) -> Self {
        Self {
            last_window: window.to_string(),
            ..self.clone()
        }
    }
}

/// Query string for `GET /api/v1/widgets`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WidgetListQuery {
    /// Page to list; defaults to `dex-swaps`
    pub page: Option<String>,
}
