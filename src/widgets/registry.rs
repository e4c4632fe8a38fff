//! Lookup table from `(page, widget id)` to widget kind, built once at
//! startup.

use std::collections::HashMap;

use super::{Page, WidgetKind};

#[derive(Debug, Clone)]
pub struct WidgetRegistry {
    widgets: HashMap<(Page, &'static str), WidgetKind>,
}

impl WidgetRegistry {
    /// Registers every known widget kind.
    pub fn new() -> Self {
        Self::with_kinds(&WidgetKind::ALL)
    }

    pub fn with_kinds(kinds: &[WidgetKind]) -> Self {
        let widgets = kinds
            .iter()
            .map(|kind| ((kind.page(), kind.id()), *kind))
            .collect();
        Self { widgets }
    }

    pub fn lookup(&self, page: Page, id: &str) -> Option<WidgetKind> {
        self.widgets.get(&(page, id)).copied()
    }

    /// Sorted widget ids served on `page`.
    pub fn list(&self, page: Page) -> Vec<&'static str> {
        let mut ids: Vec<&'static str> = self
            .widgets
            .keys()
            .filter(|(widget_page, _)| *widget_page == page)
            .map(|(_, id)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }
}

impl Default for WidgetRegistry {
    fn default() -> Self {
        Self::new()
    }
}
