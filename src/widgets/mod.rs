//! Widgets Module
//!
//! Dashboard widgets grouped by page. Each [`WidgetKind`] reads its rows
//! through the shared [`QueryCache`] and shapes them into a JSON payload.

mod format;
mod kinds;
mod registry;
mod window;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::backend::{Backend, Rows};
use crate::cache::QueryCache;
use crate::error::ServiceError;
use crate::resilience::StaleFallback;

pub use kinds::{cached_master_is_green, master_is_green, master_status_statement, WidgetKind};
pub use registry::WidgetRegistry;
pub use window::TimeWindow;

// == Page ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Page {
    DexSwaps,
    Kamino,
    Health,
    GlobalEcosystem,
}

impl Page {
    pub const ALL: [Page; 4] = [Page::DexSwaps, Page::Kamino, Page::Health, Page::GlobalEcosystem];

    pub fn as_str(self) -> &'static str {
        match self {
            Page::DexSwaps => "dex-swaps",
            Page::Kamino => "kamino",
            Page::Health => "health",
            Page::GlobalEcosystem => "global-ecosystem",
        }
    }
}

impl FromStr for Page {
    type Err = ServiceError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Page::ALL
            .into_iter()
            .find(|page| page.as_str() == raw)
            .ok_or_else(|| ServiceError::UnknownPage(raw.to_string()))
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Widget Context ==
/// What a widget needs to compute its payload.
pub struct WidgetContext {
    pub backend: Arc<dyn Backend>,
    pub cache: Arc<QueryCache<Rows>>,
    /// Last good ecosystem timeseries per window
    pub ge_history: StaleFallback<Rows>,
}

impl WidgetContext {
    pub fn new(backend: Arc<dyn Backend>, cache: Arc<QueryCache<Rows>>) -> Self {
        Self {
            backend,
            cache,
            ge_history: StaleFallback::keeping(|rows: &Rows| !rows.is_empty()),
        }
    }
}

impl fmt::Debug for WidgetContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WidgetContext")
            .field("cache", &self.cache)
            .field("ge_history", &self.ge_history)
            .finish_non_exhaustive()
    }
}
