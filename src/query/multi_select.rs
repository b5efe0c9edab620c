//! Set-valued filters backed by a checkbox list.
//!
//! An empty selection means "no constraint", never "show nothing". The
//! search text only narrows the displayed options and does not touch the
//! selection.

use std::collections::BTreeSet;

/// A multi-select filter: selected option values plus a local option search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiSelectFilter {
    selected: BTreeSet<String>,
    search_query: String,
}

impl MultiSelectFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `value` if absent, remove it if present.
    pub fn toggle(&mut self, value: &str) {
        if !self.selected.remove(value) {
            self.selected.insert(value.to_string());
        }
    }

    pub fn select_all<I, S>(&mut self, universe: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected = universe.into_iter().map(Into::into).collect();
    }

    pub fn deselect_all(&mut self) {
        self.selected.clear();
    }

    pub fn is_selected(&self, value: &str) -> bool {
        self.selected.contains(value)
    }

    /// True when the filter places no constraint on the query.
    pub fn is_unconstrained(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn selected(&self) -> &BTreeSet<String> {
        &self.selected
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
    }

    /// Options to display for the current search text (case-insensitive substring).
    pub fn visible_options<'a>(&self, universe: &'a [String]) -> Vec<&'a str> {
        let needle = self.search_query.trim().to_lowercase();
        universe
            .iter()
            .map(String::as_str)
            .filter(|option| needle.is_empty() || option.to_lowercase().contains(&needle))
            .collect()
    }
}
