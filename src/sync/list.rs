//! List controller: the query executor for one filterable, paginated table.
//!
//! The controller owns the table's draft and committed filters, sort state,
//! multi-select sets, active tab and year, and the accumulated result list.
//! Typed filters go through the debounce committer; discrete actions (sort
//! clicks, checkbox toggles, tab switches, resets) commit synchronously.
//!
//! Every request is stamped with a [`GenerationToken`]. A response mutates
//! state only if its token is still the latest one, so a slow stale
//! response can never overwrite a newer result.
//!
//! Mutating methods must be called from within a tokio runtime. Methods that
//! start a fetch return the spawned task's handle; awaiting it is optional.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::prefs::PreferenceStore;
use crate::query::{
    CommittedFilters, MultiSelectFilter, QueryKey, SortCycle, SortSpec, SortState,
};
use crate::remote::{Backend, Entity, PageRequest};

use super::debounce::{DEFAULT_DEBOUNCE, DebounceCommitter};
use super::draft::FilterDraft;
use super::focus::{DetachedSurface, FocusController, FocusSurface, RestoreOutcome};
use super::generation::{Generation, GenerationToken};
use super::pagination::{AccumulatedList, FetchMode};
use super::visibility::{SentinelObservation, VisibilityTrigger};

/// Handle of a spawned list fetch.
pub type FetchHandle = JoinHandle<()>;

/// Debounce group for typed filters not declared in any group.
pub const DEFAULT_GROUP: &str = "filters";

/// Static description of one table.
#[derive(Debug, Clone)]
pub struct TableSpec {
    /// Used as the preference scope and in log lines.
    pub name: String,
    pub collection: String,
    pub page_size: u32,
    pub sort_cycle: SortCycle,
    pub initial_sort: SortSpec,
    pub debounce: Duration,
    pub scroll_threshold_px: f64,
    /// Debounce group name to the text filter fields it watches.
    pub text_filters: BTreeMap<String, Vec<String>>,
    pub multi_select_fields: Vec<String>,
    /// Fixed request flags per tab.
    pub tab_params: BTreeMap<String, BTreeMap<String, String>>,
    pub default_tab: Option<String>,
}

impl TableSpec {
    pub fn new(name: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collection: collection.into(),
            page_size: 20,
            sort_cycle: SortCycle::default(),
            initial_sort: SortSpec::unsorted(),
            debounce: DEFAULT_DEBOUNCE,
            scroll_threshold_px: 200.0,
            text_filters: BTreeMap::new(),
            multi_select_fields: Vec::new(),
            tab_params: BTreeMap::new(),
            default_tab: None,
        }
    }

    /// Start from the configured page size, debounce window and scroll threshold.
    pub fn from_config(
        name: impl Into<String>,
        collection: impl Into<String>,
        config: &Config,
    ) -> Self {
        Self::new(name, collection)
            .with_page_size(config.page_size)
            .with_debounce(config.debounce())
            .with_scroll_threshold(config.scroll_threshold_px)
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_sort_cycle(mut self, cycle: SortCycle) -> Self {
        self.sort_cycle = cycle;
        self
    }

    pub fn with_initial_sort(mut self, sort: SortSpec) -> Self {
        self.initial_sort = sort;
        self
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_scroll_threshold(mut self, threshold_px: f64) -> Self {
        self.scroll_threshold_px = threshold_px;
        self
    }

    /// Declare text filters that share one debounce timer.
    pub fn with_text_filters<I, S>(mut self, group: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.text_filters
            .entry(group.into())
            .or_default()
            .extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn with_multi_select(mut self, field: impl Into<String>) -> Self {
        self.multi_select_fields.push(field.into());
        self
    }

    pub fn with_tab<I, K, V>(mut self, tab: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.tab_params.insert(
            tab.into(),
            params
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    pub fn with_default_tab(mut self, tab: impl Into<String>) -> Self {
        self.default_tab = Some(tab.into());
        self
    }

    /// Debounce group a text field belongs to.
    pub fn group_of(&self, field: &str) -> &str {
        self.text_filters
            .iter()
            .find(|(_, fields)| fields.iter().any(|f| f == field))
            .map(|(group, _)| group.as_str())
            .unwrap_or(DEFAULT_GROUP)
    }

    /// Fixed request flags for `tab`; empty for unknown tabs.
    pub fn tab_params_for(&self, tab: Option<&str>) -> BTreeMap<String, String> {
        tab.and_then(|t| self.tab_params.get(t))
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn pref_key(&self, what: &str) -> String {
        format!("{}.{what}", self.name)
    }
}

/// Read-only view of a table for the rendering layer.
#[derive(Debug, Clone)]
pub struct ListSnapshot {
    pub items: Vec<Entity>,
    pub total_elements: Option<u64>,
    pub total_pages: Option<u32>,
    /// Last page merged into `items`.
    pub loaded_page: Option<u32>,
    pub has_more: bool,
    pub loading: bool,
    pub error: Option<String>,
    /// Committed query at page 0.
    pub key: QueryKey,
    pub drafts: BTreeMap<String, String>,
}

struct ListState {
    draft: FilterDraft,
    committed: CommittedFilters,
    multi: BTreeMap<String, MultiSelectFilter>,
    sort: SortState,
    tab: Option<String>,
    year: Option<i32>,
    page_size: u32,
    list: AccumulatedList<Entity>,
    in_flight: Option<GenerationToken>,
    last_issued: Option<QueryKey>,
    error: Option<String>,
}

impl ListState {
    fn key(&self, page: u32) -> QueryKey {
        QueryKey {
            tab: self.tab.clone(),
            year: self.year,
            sort: self.sort.spec().clone(),
            filters: self.committed.clone(),
            multi_selects: self
                .multi
                .iter()
                .filter(|(_, filter)| !filter.is_unconstrained())
                .map(|(field, filter)| (field.clone(), filter.selected().clone()))
                .collect(),
            page,
            page_size: self.page_size,
        }
    }
}

struct ListInner<B> {
    spec: TableSpec,
    backend: Arc<B>,
    generation: Generation,
    debounce: DebounceCommitter,
    focus: FocusController,
    trigger: Mutex<VisibilityTrigger>,
    prefs: Option<Arc<dyn PreferenceStore>>,
    state: Mutex<ListState>,
}

impl<B> ListInner<B> {
    /// Second restoration pass, once a refresh has re-rendered the list.
    fn restore_focus(&self) -> RestoreOutcome {
        let Some(field) = self.focus.focused() else {
            return RestoreOutcome::NothingFocused;
        };
        let intended = self
            .state
            .lock()
            .draft
            .get(&field.name)
            .map(str::to_string);
        match intended {
            Some(value) => self.focus.restore(&value),
            None => RestoreOutcome::NothingFocused,
        }
    }

    fn remember(&self, what: &str, value: Value) {
        if let Some(prefs) = &self.prefs {
            prefs.save(&self.spec.pref_key(what), value);
        }
    }
}

/// Builder for [`ListController`].
pub struct ListControllerBuilder<B> {
    spec: TableSpec,
    backend: Arc<B>,
    surface: Arc<dyn FocusSurface>,
    prefs: Option<Arc<dyn PreferenceStore>>,
}

impl<B: Backend + 'static> ListControllerBuilder<B> {
    pub fn surface(mut self, surface: Arc<dyn FocusSurface>) -> Self {
        self.surface = surface;
        self
    }

    pub fn preferences(mut self, prefs: Arc<dyn PreferenceStore>) -> Self {
        self.prefs = Some(prefs);
        self
    }

    pub fn build(self) -> ListController<B> {
        let spec = self.spec;

        let mut focus = FocusController::new(self.surface);
        for field in spec.text_filters.values().flatten() {
            focus.track(field.clone());
        }
        for field in &spec.multi_select_fields {
            focus.track(field.clone());
        }

        let remembered = |what: &str| {
            self.prefs
                .as_ref()
                .and_then(|prefs| prefs.load(&spec.pref_key(what)))
        };
        let tab = match remembered("tab") {
            Some(Value::String(tab)) => Some(tab),
            Some(Value::Null) => None,
            _ => spec.default_tab.clone(),
        };
        let page_size = remembered("page_size")
            .and_then(|v| v.as_u64())
            .and_then(|n| u32::try_from(n).ok())
            .filter(|n| *n > 0)
            .unwrap_or(spec.page_size);

        let state = ListState {
            draft: FilterDraft::new(),
            committed: CommittedFilters::new(),
            multi: spec
                .multi_select_fields
                .iter()
                .map(|field| (field.clone(), MultiSelectFilter::new()))
                .collect(),
            sort: SortState::with_initial(spec.sort_cycle, spec.initial_sort.clone()),
            tab,
            year: None,
            page_size,
            list: AccumulatedList::new(),
            in_flight: None,
            last_issued: None,
            error: None,
        };

        ListController {
            inner: Arc::new(ListInner {
                debounce: DebounceCommitter::new(spec.debounce),
                trigger: Mutex::new(VisibilityTrigger::new(spec.scroll_threshold_px)),
                spec,
                backend: self.backend,
                generation: Generation::new(),
                focus,
                prefs: self.prefs,
                state: Mutex::new(state),
            }),
        }
    }
}

/// Query synchronization for one table instance.
pub struct ListController<B> {
    inner: Arc<ListInner<B>>,
}

impl<B> Clone for ListController<B> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<B: Backend + 'static> ListController<B> {
    /// Controller without a focus surface or preference store.
    pub fn new(spec: TableSpec, backend: Arc<B>) -> Self {
        Self::builder(spec, backend).build()
    }

    pub fn builder(spec: TableSpec, backend: Arc<B>) -> ListControllerBuilder<B> {
        ListControllerBuilder {
            spec,
            backend,
            surface: Arc::new(DetachedSurface),
            prefs: None,
        }
    }

    pub fn spec(&self) -> &TableSpec {
        &self.inner.spec
    }

    // ---------------------------------------------------------------------
    // Typed filters
    // ---------------------------------------------------------------------

    /// Record a keystroke. The committed filters change only after the
    /// debounce window passes with no further input in the field's group.
    pub fn input(&self, field: &str, value: &str, cursor: usize) {
        self.inner.state.lock().draft.set(field, value);
        self.inner.focus.on_cursor(field, cursor);

        let group = self.inner.spec.group_of(field).to_string();
        let weak = Arc::downgrade(&self.inner);
        let commit_group = group.clone();
        self.inner.debounce.schedule(&group, move || {
            if let Some(inner) = weak.upgrade() {
                ListController { inner }.commit_group(&commit_group);
            }
        });

        self.schedule_focus_restore();
    }

    /// Commit every pending draft now (e.g. on Enter), skipping the wait.
    pub fn flush(&self) -> Option<FetchHandle> {
        self.inner.debounce.cancel_all();
        let mut state = self.inner.state.lock();
        let fields: Vec<String> = state.draft.values().keys().cloned().collect();
        self.commit_fields(&mut state, &fields)
    }

    /// True while typed input is waiting out the debounce window.
    pub fn has_pending_input(&self) -> bool {
        let spec = &self.inner.spec;
        spec.text_filters
            .keys()
            .map(String::as_str)
            .chain(std::iter::once(DEFAULT_GROUP))
            .any(|group| self.inner.debounce.is_pending(group))
    }

    fn commit_group(&self, group: &str) -> Option<FetchHandle> {
        let mut state = self.inner.state.lock();
        let fields = self.group_fields(group, &state);
        self.commit_fields(&mut state, &fields)
    }

    fn group_fields(&self, group: &str, state: &ListState) -> Vec<String> {
        let spec = &self.inner.spec;
        if let Some(fields) = spec.text_filters.get(group) {
            return fields.clone();
        }
        state
            .draft
            .values()
            .keys()
            .filter(|field| spec.group_of(field) == group)
            .cloned()
            .collect()
    }

    fn commit_fields(&self, state: &mut ListState, fields: &[String]) -> Option<FetchHandle> {
        let changed = state.draft.changed_fields(&state.committed, fields);
        if changed.is_empty() {
            tracing::trace!("{}: drafts match committed filters", self.inner.spec.name);
            return None;
        }
        state.draft.commit_into(&mut state.committed, fields);
        tracing::debug!(
            "{}: committed filters {:?}",
            self.inner.spec.name,
            changed
        );
        self.issue(state, FetchMode::Replace, 0, false)
    }

    // ---------------------------------------------------------------------
    // Discrete actions
    // ---------------------------------------------------------------------

    /// Advance the sort state machine for a header click on `field`.
    pub fn click_sort(&self, field: &str) -> Option<FetchHandle> {
        let mut state = self.inner.state.lock();
        let spec = state.sort.click(field).clone();
        tracing::debug!("{}: sort is now {:?}", self.inner.spec.name, spec);
        self.issue(&mut state, FetchMode::Replace, 0, false)
    }

    pub fn toggle_option(&self, field: &str, value: &str) -> Option<FetchHandle> {
        self.mutate_multi(field, |filter| filter.toggle(value))
    }

    pub fn select_all_options<I, S>(&self, field: &str, universe: I) -> Option<FetchHandle>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mutate_multi(field, |filter| filter.select_all(universe))
    }

    pub fn deselect_all_options(&self, field: &str) -> Option<FetchHandle> {
        self.mutate_multi(field, MultiSelectFilter::deselect_all)
    }

    /// Narrow the displayed options of a multi-select. Never fetches.
    pub fn set_option_search(&self, field: &str, query: &str) {
        self.inner
            .state
            .lock()
            .multi
            .entry(field.to_string())
            .or_default()
            .set_search_query(query);
    }

    /// Options of `field` matching its current search text.
    pub fn visible_options(&self, field: &str, universe: &[String]) -> Vec<String> {
        let state = self.inner.state.lock();
        match state.multi.get(field) {
            Some(filter) => filter
                .visible_options(universe)
                .into_iter()
                .map(str::to_string)
                .collect(),
            None => universe.to_vec(),
        }
    }

    pub fn multi_select(&self, field: &str) -> MultiSelectFilter {
        self.inner
            .state
            .lock()
            .multi
            .get(field)
            .cloned()
            .unwrap_or_default()
    }

    fn mutate_multi(
        &self,
        field: &str,
        mutate: impl FnOnce(&mut MultiSelectFilter),
    ) -> Option<FetchHandle> {
        let mut state = self.inner.state.lock();
        mutate(state.multi.entry(field.to_string()).or_default());
        self.issue(&mut state, FetchMode::Replace, 0, false)
    }

    /// Switch the active tab. Remembered when a preference store is attached.
    pub fn set_tab(&self, tab: Option<&str>) -> Option<FetchHandle> {
        let mut state = self.inner.state.lock();
        state.tab = tab.map(str::to_string);
        self.inner
            .remember("tab", tab.map_or(Value::Null, |t| Value::String(t.to_string())));
        self.issue(&mut state, FetchMode::Replace, 0, false)
    }

    pub fn set_year(&self, year: Option<i32>) -> Option<FetchHandle> {
        let mut state = self.inner.state.lock();
        state.year = year;
        self.issue(&mut state, FetchMode::Replace, 0, false)
    }

    pub fn set_page_size(&self, page_size: u32) -> Option<FetchHandle> {
        let page_size = page_size.max(1);
        let mut state = self.inner.state.lock();
        state.page_size = page_size;
        self.inner.remember("page_size", Value::from(page_size));
        self.issue(&mut state, FetchMode::Replace, 0, false)
    }

    /// Clear typed, committed and multi-select filters in one step.
    pub fn reset_filters(&self) -> Option<FetchHandle> {
        self.inner.debounce.cancel_all();
        let mut state = self.inner.state.lock();
        state.draft.clear();
        state.committed.clear();
        for filter in state.multi.values_mut() {
            *filter = MultiSelectFilter::new();
        }
        tracing::debug!("{}: filters reset", self.inner.spec.name);
        self.issue(&mut state, FetchMode::Replace, 0, false)
    }

    /// Initial load. Does nothing if the current query was already issued.
    pub fn load(&self) -> Option<FetchHandle> {
        let mut state = self.inner.state.lock();
        self.issue(&mut state, FetchMode::Replace, 0, false)
    }

    /// Re-issue the current query from page 0, e.g. to retry after an error.
    pub fn refresh(&self) -> Option<FetchHandle> {
        let mut state = self.inner.state.lock();
        self.issue(&mut state, FetchMode::Replace, 0, true)
    }

    // ---------------------------------------------------------------------
    // Infinite scroll
    // ---------------------------------------------------------------------

    /// Fetch the next page if one exists and nothing is in flight.
    pub fn load_more(&self) -> Option<FetchHandle> {
        let mut state = self.inner.state.lock();
        if state.in_flight.is_some() {
            tracing::trace!("{}: fetch pending, not loading more", self.inner.spec.name);
            return None;
        }
        let next = state.list.next_page()?;
        if state.list.scope() != Some(&state.key(next).scope()) {
            return None;
        }
        self.issue(&mut state, FetchMode::Append, next, true)
    }

    /// Feed a sentinel observation from the rendering layer.
    pub fn on_sentinel(&self, observation: SentinelObservation) -> Option<FetchHandle> {
        let (pending, has_more) = {
            let state = self.inner.state.lock();
            (state.in_flight.is_some(), state.list.has_more())
        };
        if self
            .inner
            .trigger
            .lock()
            .should_load(observation, pending, has_more)
        {
            self.load_more()
        } else {
            None
        }
    }

    pub fn set_scroll_loading(&self, enabled: bool) {
        self.inner.trigger.lock().set_enabled(enabled);
    }

    // ---------------------------------------------------------------------
    // Focus
    // ---------------------------------------------------------------------

    pub fn on_focus(&self, field: &str, cursor: usize) {
        self.inner.focus.on_focus(field, cursor);
    }

    pub fn on_blur(&self, field: &str, next_target: Option<&str>) {
        self.inner.focus.on_blur(field, next_target);
    }

    pub fn on_cursor(&self, field: &str, cursor: usize) {
        self.inner.focus.on_cursor(field, cursor);
    }

    /// First restoration pass, one scheduler turn after a draft update.
    fn schedule_focus_restore(&self) {
        let weak: Weak<ListInner<B>> = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            tokio::task::yield_now().await;
            if let Some(inner) = weak.upgrade() {
                inner.restore_focus();
            }
        });
    }

    // ---------------------------------------------------------------------
    // Read access
    // ---------------------------------------------------------------------

    pub fn snapshot(&self) -> ListSnapshot {
        let state = self.inner.state.lock();
        ListSnapshot {
            items: state.list.items().to_vec(),
            total_elements: state.list.total_elements(),
            total_pages: state.list.total_pages(),
            loaded_page: state.list.last_page(),
            has_more: state.list.has_more(),
            loading: state.in_flight.is_some(),
            error: state.error.clone(),
            key: state.key(0),
            drafts: state.draft.values().clone(),
        }
    }

    pub fn query_key(&self) -> QueryKey {
        self.inner.state.lock().key(0)
    }

    pub fn committed_filters(&self) -> CommittedFilters {
        self.inner.state.lock().committed.clone()
    }

    pub fn draft(&self, field: &str) -> Option<String> {
        self.inner.state.lock().draft.get(field).map(str::to_string)
    }

    pub fn sort(&self) -> SortSpec {
        self.inner.state.lock().sort.spec().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.lock().in_flight.is_some()
    }

    pub fn error(&self) -> Option<String> {
        self.inner.state.lock().error.clone()
    }

    // ---------------------------------------------------------------------
    // Request issuing
    // ---------------------------------------------------------------------

    /// Stamp and spawn a fetch for `page` of the committed query.
    ///
    /// Replace requests for a query identical to the last one issued are
    /// skipped unless `force` is set or the last attempt failed.
    fn issue(
        &self,
        state: &mut ListState,
        mode: FetchMode,
        page: u32,
        force: bool,
    ) -> Option<FetchHandle> {
        let spec = &self.inner.spec;
        let key = state.key(page);

        if mode == FetchMode::Replace
            && !force
            && state.error.is_none()
            && state.last_issued.as_ref() == Some(&key)
        {
            tracing::trace!("{}: query unchanged, not fetching", spec.name);
            return None;
        }

        let token = self.inner.generation.advance();
        if mode == FetchMode::Replace {
            let scope = key.scope();
            if state.list.scope() != Some(&scope) {
                state.list.reset(scope, key.page_size);
            }
            state.last_issued = Some(key.clone());
        }
        state.in_flight = Some(token);

        let request = PageRequest {
            collection: spec.collection.clone(),
            tab_params: spec.tab_params_for(state.tab.as_deref()),
            key,
        };
        tracing::debug!(
            "{}: {mode} fetch {token} /{}?{}",
            spec.name,
            request.collection,
            request.key.query_string(&request.tab_params)
        );

        let inner = self.inner.clone();
        Some(tokio::spawn(Self::complete(inner, request, token, mode)))
    }

    async fn complete(
        inner: Arc<ListInner<B>>,
        request: PageRequest,
        token: GenerationToken,
        mode: FetchMode,
    ) {
        let result = inner.backend.fetch_page(&request).await;

        {
            let mut state = inner.state.lock();
            if !inner.generation.is_current(token) {
                tracing::debug!("{}: discarding stale response {token}", inner.spec.name);
                return;
            }
            state.in_flight = None;

            match result {
                Ok(page) => {
                    let scope = request.key.scope();
                    match mode {
                        FetchMode::Replace => {
                            state.list.replace(scope, request.key.page_size, page)
                        }
                        FetchMode::Append => {
                            if let Err(rejection) = state.list.append(&scope, page) {
                                tracing::warn!(
                                    "{}: dropping page {}, no further pages: {rejection:?}",
                                    inner.spec.name,
                                    request.key.page
                                );
                                state.list.mark_exhausted();
                            }
                        }
                    }
                    state.error = None;
                }
                Err(e) if e.is_cancellation() => {
                    tracing::debug!("{}: fetch {token} cancelled", inner.spec.name);
                }
                Err(e) => {
                    tracing::warn!("{}: fetch {token} failed: {e}", inner.spec.name);
                    state.error = Some(e.user_message());
                }
            }
        }

        inner.restore_focus();
    }
}
