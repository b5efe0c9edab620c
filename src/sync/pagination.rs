//! Accumulation of server pages for infinite scroll.
//!
//! Pages are only ever concatenated while the non-paging part of the query
//! stays the same. Any other change starts a fresh list.

use crate::error::SyncError;
use crate::query::QueryScope;
use crate::remote::PageResult;

/// Whether a fetched page replaces or extends the accumulated list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    Replace,
    Append,
}

enum_display_fromstr!(
    FetchMode,
    SyncError::InvalidFetchMode,
    {
        Replace => "replace",
        Append => "append",
    }
);

/// Why a page was not merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeRejection {
    /// The page was fetched under a different query than the list holds.
    ScopeMismatch,
    /// The page does not directly follow the last loaded one.
    OutOfOrder { expected: u32, got: u32 },
}

/// All pages loaded so far for one query scope.
#[derive(Debug, Clone)]
pub struct AccumulatedList<T = serde_json::Value> {
    scope: Option<QueryScope>,
    items: Vec<T>,
    page_size: u32,
    last_page: Option<u32>,
    last_page_len: usize,
    total_pages: Option<u32>,
    total_elements: Option<u64>,
    exhausted: bool,
}

impl<T> Default for AccumulatedList<T> {
    fn default() -> Self {
        Self {
            scope: None,
            items: Vec::new(),
            page_size: 0,
            last_page: None,
            last_page_len: 0,
            total_pages: None,
            total_elements: None,
            exhausted: false,
        }
    }
}

impl<T> AccumulatedList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty the list and bind it to `scope`, before any page for it lands.
    pub fn reset(&mut self, scope: QueryScope, page_size: u32) {
        *self = Self {
            scope: Some(scope),
            page_size,
            ..Self::default()
        };
    }

    /// Set `page` as the only page of the list.
    pub fn replace(&mut self, scope: QueryScope, page_size: u32, page: PageResult<T>) {
        self.reset(scope, page_size);
        self.absorb(page);
    }

    /// Concatenate `page` after the pages already loaded.
    pub fn append(&mut self, scope: &QueryScope, page: PageResult<T>) -> Result<(), MergeRejection> {
        if self.scope.as_ref() != Some(scope) {
            return Err(MergeRejection::ScopeMismatch);
        }
        let expected = self.last_page.map_or(0, |p| p + 1);
        if page.page_number != expected {
            return Err(MergeRejection::OutOfOrder {
                expected,
                got: page.page_number,
            });
        }
        self.absorb(page);
        Ok(())
    }

    fn absorb(&mut self, page: PageResult<T>) {
        self.last_page = Some(page.page_number);
        self.last_page_len = page.items.len();
        self.total_pages = page.total_pages;
        self.total_elements = page.total_elements;
        self.items.extend(page.items);
    }

    /// Stop offering further pages for this scope, e.g. after the server
    /// answered a page request with a page that cannot be merged.
    pub fn mark_exhausted(&mut self) {
        self.exhausted = true;
    }

    /// More pages remain iff the last page came back full, the server does
    /// not report it as the final page, and paging was not stopped.
    pub fn has_more(&self) -> bool {
        let Some(page) = self.last_page else {
            return false;
        };
        if self.exhausted {
            return false;
        }
        let full = self.page_size > 0 && self.last_page_len == self.page_size as usize;
        let below_total = self.total_pages.is_none_or(|total| page + 1 < total);
        full && below_total
    }

    pub fn next_page(&self) -> Option<u32> {
        if self.has_more() {
            self.last_page.map(|p| p + 1)
        } else {
            None
        }
    }

    pub fn scope(&self) -> Option<&QueryScope> {
        self.scope.as_ref()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn last_page(&self) -> Option<u32> {
        self.last_page
    }

    pub fn total_pages(&self) -> Option<u32> {
        self.total_pages
    }

    pub fn total_elements(&self) -> Option<u64> {
        self.total_elements
    }
}
