//! Lookback windows selectable from the dashboard.

use std::fmt;

/// Ordered from shortest (cheapest to query) to longest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimeWindow {
    Hour1,
    Hours4,
    Hours6,
    Hours24,
    Days7,
    Days30,
    Days90,
}

impl TimeWindow {
    pub const ALL: [TimeWindow; 7] = [
        TimeWindow::Hour1,
        TimeWindow::Hours4,
        TimeWindow::Hours6,
        TimeWindow::Hours24,
        TimeWindow::Days7,
        TimeWindow::Days30,
        TimeWindow::Days90,
    ];

    /// Parses `1h`, `4h`, `6h`, `24h`, `7d`, `30d` or `90d`, ignoring case.
    /// Anything else is treated as `24h`.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|window| window.label().eq_ignore_ascii_case(raw))
            .unwrap_or(TimeWindow::Hours24)
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeWindow::Hour1 => "1h",
            TimeWindow::Hours4 => "4h",
            TimeWindow::Hours6 => "6h",
            TimeWindow::Hours24 => "24h",
            TimeWindow::Days7 => "7d",
            TimeWindow::Days30 => "30d",
            TimeWindow::Days90 => "90d",
        }
    }

    /// Postgres interval literal covering the whole window.
    pub fn lookback(self) -> &'static str {
        match self {
            TimeWindow::Hour1 => "1 hour",
            TimeWindow::Hours4 => "4 hours",
            TimeWindow::Hours6 => "6 hours",
            TimeWindow::Hours24 => "24 hours",
            TimeWindow::Days7 => "7 days",
            TimeWindow::Days30 => "30 days",
            TimeWindow::Days90 => "90 days",
        }
    }

    /// Bucket width for ecosystem timeseries over this window.
    pub fn bucket(self) -> &'static str {
        match self {
            TimeWindow::Hour1 => "5 minutes",
            TimeWindow::Hours4 => "15 minutes",
            TimeWindow::Hours6 => "30 minutes",
            TimeWindow::Hours24 => "1 hour",
            TimeWindow::Days7 => "4 hours",
            TimeWindow::Days30 => "1 day",
            TimeWindow::Days90 => "3 days",
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
