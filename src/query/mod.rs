//! Reproducible query descriptions for list fetches.
//!
//! A [`QueryKey`] captures everything a list fetch depends on. Its stable
//! serialization is used to detect "nothing actually changed" and to decide
//! whether a new page may be appended to the pages already loaded.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

pub mod multi_select;
pub mod sort;

pub use multi_select::MultiSelectFilter;
pub use sort::{SortCycle, SortDirection, SortSpec, SortState};

/// Filter values that survived the debounce window, keyed by field name.
pub type CommittedFilters = BTreeMap<String, String>;

/// Selected values per multi-select field.
pub type MultiSelects = BTreeMap<String, BTreeSet<String>>;

/// The full input to one list fetch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct QueryKey {
    pub tab: Option<String>,
    pub year: Option<i32>,
    pub sort: SortSpec,
    pub filters: CommittedFilters,
    pub multi_selects: MultiSelects,
    pub page: u32,
    pub page_size: u32,
}

/// The non-paging part of a [`QueryKey`]. Pages may only be concatenated
/// while this stays the same.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct QueryScope {
    tab: Option<String>,
    year: Option<i32>,
    sort: SortSpec,
    filters: CommittedFilters,
    multi_selects: MultiSelects,
    page_size: u32,
}

impl QueryKey {
    pub fn new(page_size: u32) -> Self {
        Self {
            tab: None,
            year: None,
            sort: SortSpec::unsorted(),
            filters: CommittedFilters::new(),
            multi_selects: MultiSelects::new(),
            page: 0,
            page_size,
        }
    }

    pub fn with_tab(mut self, tab: impl Into<String>) -> Self {
        self.tab = Some(tab.into());
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(field.into(), value.into());
        self
    }

    pub fn with_multi_select<I, S>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.multi_selects
            .insert(field.into(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    pub fn scope(&self) -> QueryScope {
        QueryScope {
            tab: self.tab.clone(),
            year: self.year,
            sort: self.sort.clone(),
            filters: self.filters.clone(),
            multi_selects: self.multi_selects.clone(),
            page_size: self.page_size,
        }
    }

    /// Request parameters in wire order.
    ///
    /// Blank filters and empty multi-selects are omitted entirely, since an
    /// absent parameter means "unconstrained". Each selected multi-select
    /// value becomes its own parameter. `tab_params` are the fixed flags the
    /// table declares for the active tab.
    pub fn to_params(&self, tab_params: &BTreeMap<String, String>) -> Vec<(String, String)> {
        let mut params = vec![
            ("page".to_string(), self.page.to_string()),
            ("size".to_string(), self.page_size.to_string()),
        ];

        if let (Some(field), Some(direction)) = (&self.sort.field, self.sort.direction) {
            params.push(("sortBy".to_string(), field.clone()));
            params.push(("sortDir".to_string(), direction.to_string()));
        }

        for (field, value) in &self.filters {
            let value = value.trim();
            if !value.is_empty() {
                params.push((field.clone(), value.to_string()));
            }
        }

        for (field, values) in &self.multi_selects {
            for value in values {
                params.push((field.clone(), value.clone()));
            }
        }

        for (flag, value) in tab_params {
            params.push((flag.clone(), value.clone()));
        }

        if let Some(year) = self.year {
            params.push(("year".to_string(), year.to_string()));
        }

        params
    }

    /// URL-encoded form of [`QueryKey::to_params`], used in logs and by the HTTP adapter.
    pub fn query_string(&self, tab_params: &BTreeMap<String, String>) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.to_params(tab_params))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_flags() -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    #[test]
    fn test_empty_multi_select_is_omitted() {
        let key = QueryKey::new(20).with_multi_select("status", Vec::<String>::new());
        let params = key.to_params(&no_flags());
        assert!(params.iter().all(|(k, _)| k != "status"));
    }

    #[test]
    fn test_multi_select_repeats_parameter() {
        let key = QueryKey::new(20).with_multi_select("status", ["A", "B"]);
        let params = key.to_params(&no_flags());
        let statuses: Vec<&str> = params
            .iter()
            .filter(|(k, _)| k == "status")
            .map(|(_, v)| v.as_str())
            .collect();
        assert_eq!(statuses, vec!["A", "B"]);
    }

    #[test]
    fn test_blank_filter_is_omitted() {
        let key = QueryKey::new(20)
            .with_filter("innerId", "")
            .with_filter("cfo", "   ");
        let params = key.to_params(&no_flags());
        assert_eq!(params.len(), 2, "only page and size expected: {params:?}");
    }

    #[test]
    fn test_unsorted_key_sends_no_sort_params() {
        let key = QueryKey::new(10);
        let params = key.to_params(&no_flags());
        assert!(params.iter().all(|(k, _)| k != "sortBy" && k != "sortDir"));
    }

    #[test]
    fn test_query_string_layout() {
        let mut flags = BTreeMap::new();
        flags.insert("archived".to_string(), "false".to_string());

        let key = QueryKey::new(20)
            .with_tab("active")
            .with_year(2024)
            .with_sort(SortSpec::desc("name"))
            .with_filter("cfo", "Smith")
            .with_multi_select("status", ["Draft", "Awaiting approval"])
            .with_page(3);

        insta::assert_snapshot!(
            key.query_string(&flags),
            @"page=3&size=20&sortBy=name&sortDir=desc&cfo=Smith&status=Awaiting+approval&status=Draft&archived=false&year=2024"
        );
    }

    #[test]
    fn test_key_equality_tracks_components() {
        let a = QueryKey::new(20).with_filter("cfo", "Smith");
        let b = QueryKey::new(20).with_filter("cfo", "Smith");
        let c = QueryKey::new(20).with_filter("cfo", "Jones");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_scope_ignores_page() {
        let first = QueryKey::new(20).with_filter("cfo", "Smith");
        let later = first.clone().with_page(4);
        assert_ne!(first, later);
        assert_eq!(first.scope(), later.scope());

        let resized = QueryKey::new(50).with_filter("cfo", "Smith");
        assert_ne!(first.scope(), resized.scope());
    }
}
