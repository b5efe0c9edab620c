#[macro_use]
mod macros;

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod prefs;
pub mod query;
pub mod remote;
pub mod sync;

pub use config::Config;
pub use error::{Result, SyncError};
pub use prefs::{FilePreferences, MemoryPreferences, PreferenceStore};
pub use query::{
    CommittedFilters, MultiSelectFilter, MultiSelects, QueryKey, QueryScope, SortCycle,
    SortDirection, SortSpec, SortState,
};
pub use remote::{Backend, Entity, HttpBackend, PageEnvelope, PageRequest, PageResult, entity_id};
pub use sync::{
    DetailOrchestrator, DetailPlan, DetailSnapshot, DetailStage, FocusSurface, ListController,
    ListSnapshot, RelatedData, SentinelObservation, TableSpec,
};
