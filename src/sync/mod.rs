//! Query synchronization between view state and the backend.

pub mod debounce;
pub mod detail;
pub mod draft;
pub mod focus;
pub mod generation;
pub mod list;
pub mod pagination;
pub mod visibility;

pub use debounce::{DEFAULT_DEBOUNCE, DebounceCommitter};
pub use detail::{
    ChainedFetch, DetailOrchestrator, DetailPlan, DetailSnapshot, DetailStage, RelatedData,
    RelatedFetch, RelatedSource,
};
pub use draft::FilterDraft;
pub use focus::{DetachedSurface, FocusController, FocusSurface, FocusedField, RestoreOutcome};
pub use generation::{Generation, GenerationToken};
pub use list::{
    DEFAULT_GROUP, FetchHandle, ListController, ListControllerBuilder, ListSnapshot, TableSpec,
};
pub use pagination::{AccumulatedList, FetchMode, MergeRejection};
pub use visibility::{SentinelObservation, VisibilityTrigger};
