//! Detail view orchestration: one root entity and the collections hanging off it.
//!
//! Loading an id fetches the root first, then every related collection in
//! parallel, then any chained fetches that need an id found in a related
//! result. The view reports `loading` until every dependent fetch has
//! settled, and the related data lands in a single update.
//!
//! Switching to another id while a load is in flight aborts the old load and
//! stamps the new one with a fresh generation, so data for a previous id can
//! never end up on screen next to the current one.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::task::{AbortHandle, JoinHandle};

use crate::error::SyncError;
use crate::remote::{Backend, Entity, entity_id};

use super::generation::{Generation, GenerationToken};

/// Where a related fetch gets its data from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelatedSource {
    /// `GET /{collection}/by-parent/{root id}`
    ByParent { collection: String },
    /// `GET /{collection}/{root[field]}`
    Referenced { collection: String, field: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedFetch {
    pub name: String,
    pub source: RelatedSource,
}

/// A fetch keyed by an id found in another related result.
///
/// Runs once `after` has settled, and only when `after` produced a single
/// entity: `GET /{collection}/by-parent/{after[id_field]}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainedFetch {
    pub name: String,
    pub after: String,
    pub collection: String,
    pub id_field: String,
}

/// What a detail view loads for one root id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailPlan {
    pub collection: String,
    pub related: Vec<RelatedFetch>,
    pub chained: Vec<ChainedFetch>,
}

impl DetailPlan {
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            related: Vec::new(),
            chained: Vec::new(),
        }
    }

    pub fn by_parent(mut self, name: impl Into<String>, collection: impl Into<String>) -> Self {
        self.related.push(RelatedFetch {
            name: name.into(),
            source: RelatedSource::ByParent {
                collection: collection.into(),
            },
        });
        self
    }

    pub fn referenced(
        mut self,
        name: impl Into<String>,
        collection: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        self.related.push(RelatedFetch {
            name: name.into(),
            source: RelatedSource::Referenced {
                collection: collection.into(),
                field: field.into(),
            },
        });
        self
    }

    pub fn chained(
        mut self,
        name: impl Into<String>,
        after: impl Into<String>,
        collection: impl Into<String>,
        id_field: impl Into<String>,
    ) -> Self {
        self.chained.push(ChainedFetch {
            name: name.into(),
            after: after.into(),
            collection: collection.into(),
            id_field: id_field.into(),
        });
        self
    }
}

/// Result of one related or chained fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum RelatedData {
    Many(Vec<Entity>),
    One(Option<Entity>),
}

impl RelatedData {
    pub fn as_many(&self) -> &[Entity] {
        match self {
            RelatedData::Many(items) => items,
            RelatedData::One(_) => &[],
        }
    }

    pub fn as_one(&self) -> Option<&Entity> {
        match self {
            RelatedData::One(entity) => entity.as_ref(),
            RelatedData::Many(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetailStage {
    #[default]
    Idle,
    Root,
    Related,
    Chained,
    Ready,
    Failed,
    Cancelled,
}

enum_display_fromstr!(
    DetailStage,
    SyncError::Other,
    {
        Idle => "idle",
        Root => "root",
        Related => "related",
        Chained => "chained",
        Ready => "ready",
        Failed => "failed",
        Cancelled => "cancelled",
    }
);

/// Read-only view of the detail state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailSnapshot {
    pub id: Option<String>,
    pub stage: DetailStage,
    pub root: Option<Entity>,
    pub related: BTreeMap<String, RelatedData>,
    /// Dependent fetches that failed and are shown empty.
    pub degraded: BTreeSet<String>,
    pub loading: bool,
    pub error: Option<String>,
}

struct DetailState {
    snapshot: DetailSnapshot,
    task: Option<AbortHandle>,
}

struct DetailInner<B> {
    backend: Arc<B>,
    plan: DetailPlan,
    generation: Generation,
    state: Mutex<DetailState>,
}

/// Loads and holds the detail view for one root id at a time.
///
/// Dropping the orchestrator aborts any load still in flight.
pub struct DetailOrchestrator<B> {
    inner: Arc<DetailInner<B>>,
}

impl<B: Backend + 'static> DetailOrchestrator<B> {
    pub fn new(plan: DetailPlan, backend: Arc<B>) -> Self {
        Self {
            inner: Arc::new(DetailInner {
                backend,
                plan,
                generation: Generation::new(),
                state: Mutex::new(DetailState {
                    snapshot: DetailSnapshot::default(),
                    task: None,
                }),
            }),
        }
    }

    pub fn plan(&self) -> &DetailPlan {
        &self.inner.plan
    }

    /// Show `id`. A second call for an id that is still loading is ignored.
    ///
    /// Must be called from within a tokio runtime.
    pub fn load(&self, id: &str) -> Option<JoinHandle<()>> {
        self.start(id, false)
    }

    /// Load the current id again from scratch.
    pub fn reload(&self) -> Option<JoinHandle<()>> {
        let id = self.inner.state.lock().snapshot.id.clone()?;
        self.start(&id, true)
    }

    fn start(&self, id: &str, force: bool) -> Option<JoinHandle<()>> {
        let mut state = self.inner.state.lock();
        if !force && state.snapshot.loading && state.snapshot.id.as_deref() == Some(id) {
            tracing::debug!("detail '{id}' already loading");
            return None;
        }

        let token = self.inner.generation.advance();
        if let Some(previous) = state.task.take() {
            previous.abort();
        }
        state.snapshot = DetailSnapshot {
            id: Some(id.to_string()),
            stage: DetailStage::Root,
            loading: true,
            ..DetailSnapshot::default()
        };
        tracing::debug!("loading {}/{id} as {token}", self.inner.plan.collection);

        let handle = tokio::spawn(run(self.inner.clone(), id.to_string(), token));
        state.task = Some(handle.abort_handle());
        Some(handle)
    }

    /// Unmount: abort in-flight work and forget the current id.
    pub fn close(&self) {
        self.inner.generation.advance();
        let mut state = self.inner.state.lock();
        if let Some(task) = state.task.take() {
            task.abort();
        }
        state.snapshot = DetailSnapshot::default();
    }

    pub fn snapshot(&self) -> DetailSnapshot {
        self.inner.state.lock().snapshot.clone()
    }

    pub fn stage(&self) -> DetailStage {
        self.inner.state.lock().snapshot.stage
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.lock().snapshot.loading
    }
}

impl<B> Drop for DetailOrchestrator<B> {
    fn drop(&mut self) {
        self.inner.generation.advance();
        if let Some(task) = self.inner.state.lock().task.take() {
            task.abort();
        }
    }
}

impl<B: Backend> DetailInner<B> {
    /// Mutate the snapshot if `token` is still current.
    fn apply(&self, token: GenerationToken, update: impl FnOnce(&mut DetailSnapshot)) -> bool {
        let mut state = self.state.lock();
        if !self.generation.is_current(token) {
            tracing::debug!("discarding stale detail update {token}");
            return false;
        }
        update(&mut state.snapshot);
        true
    }

    fn fail(&self, token: GenerationToken, error: SyncError) {
        let cancelled = error.is_cancellation();
        if cancelled {
            tracing::debug!("detail load {token} cancelled");
        } else {
            tracing::warn!("detail load {token} failed: {error}");
        }
        self.apply(token, |snapshot| {
            snapshot.loading = false;
            if cancelled {
                snapshot.stage = DetailStage::Cancelled;
            } else {
                snapshot.stage = DetailStage::Failed;
                snapshot.error = Some(error.user_message());
            }
        });
    }

    /// Fetch one related entry. Failures yield empty data and a `true` flag.
    async fn fetch_related(&self, fetch: &RelatedFetch, root_id: &str, root: &Entity) -> (RelatedData, bool) {
        match &fetch.source {
            RelatedSource::ByParent { collection } => {
                match self.backend.fetch_related(collection, root_id).await {
                    Ok(items) => (RelatedData::Many(items), false),
                    Err(e) => {
                        self.degrade(&fetch.name, &e);
                        (RelatedData::Many(Vec::new()), true)
                    }
                }
            }
            RelatedSource::Referenced { collection, field } => {
                let Some(id) = entity_id(root, field) else {
                    return (RelatedData::One(None), false);
                };
                match self.backend.fetch_entity(collection, &id).await {
                    Ok(entity) => (RelatedData::One(Some(entity)), false),
                    Err(SyncError::NotFound(_)) => (RelatedData::One(None), false),
                    Err(e) => {
                        self.degrade(&fetch.name, &e);
                        (RelatedData::One(None), true)
                    }
                }
            }
        }
    }

    async fn fetch_chained(&self, fetch: &ChainedFetch, anchor: Option<&Entity>) -> (RelatedData, bool) {
        let Some(parent_id) = anchor.and_then(|entity| entity_id(entity, &fetch.id_field)) else {
            return (RelatedData::Many(Vec::new()), false);
        };
        match self.backend.fetch_related(&fetch.collection, &parent_id).await {
            Ok(items) => (RelatedData::Many(items), false),
            Err(e) => {
                self.degrade(&fetch.name, &e);
                (RelatedData::Many(Vec::new()), true)
            }
        }
    }

    fn degrade(&self, name: &str, error: &SyncError) {
        if error.is_cancellation() {
            tracing::debug!("related fetch '{name}' cancelled");
        } else {
            tracing::warn!("related fetch '{name}' failed, showing it empty: {error}");
        }
    }
}

async fn run<B: Backend>(inner: Arc<DetailInner<B>>, id: String, token: GenerationToken) {
    let plan = &inner.plan;

    let root = match inner.backend.fetch_entity(&plan.collection, &id).await {
        Ok(root) => root,
        Err(e) => {
            inner.fail(token, e);
            return;
        }
    };
    let shown = root.clone();
    if !inner.apply(token, |snapshot| {
        snapshot.root = Some(shown);
        snapshot.stage = DetailStage::Related;
    }) {
        return;
    }

    let outcomes = join_all(
        plan.related
            .iter()
            .map(|fetch| inner.fetch_related(fetch, &id, &root)),
    )
    .await;

    let mut related = BTreeMap::new();
    let mut degraded = BTreeSet::new();
    for (fetch, (data, failed)) in plan.related.iter().zip(outcomes) {
        if failed {
            degraded.insert(fetch.name.clone());
        }
        related.insert(fetch.name.clone(), data);
    }

    if !plan.chained.is_empty() {
        if !inner.apply(token, |snapshot| snapshot.stage = DetailStage::Chained) {
            return;
        }
        let outcomes = join_all(plan.chained.iter().map(|fetch| {
            let anchor = related.get(&fetch.after).and_then(RelatedData::as_one);
            inner.fetch_chained(fetch, anchor)
        }))
        .await;
        for (fetch, (data, failed)) in plan.chained.iter().zip(outcomes) {
            if failed {
                degraded.insert(fetch.name.clone());
            }
            related.insert(fetch.name.clone(), data);
        }
    }

    let settled = inner.apply(token, |snapshot| {
        snapshot.related = related;
        snapshot.degraded = degraded;
        snapshot.stage = DetailStage::Ready;
        snapshot.loading = false;
    });
    if settled {
        tracing::debug!("detail {}/{id} ready", plan.collection);
    }
}
