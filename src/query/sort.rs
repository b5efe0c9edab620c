//! Sort cycle state machine for sortable table columns.
//!
//! A click on a column header moves the table through `Unsorted`,
//! `Asc(field)` and `Desc(field)`. What happens after `Desc(field)` depends
//! on the table's [`SortCycle`]: two-state tables flip back to ascending,
//! three-state tables clear the sort.

use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Direction of an active sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

enum_display_fromstr!(
    SortDirection,
    SyncError::InvalidSortDirection,
    {
        Asc => "asc",
        Desc => "desc",
    }
);

/// Which state follows `Desc(field)` on a repeated click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortCycle {
    /// `Asc → Desc → Asc`. For tables that always carry a sort.
    #[default]
    TwoState,
    /// `Asc → Desc → Unsorted`. For tables that allow clearing the sort.
    ThreeState,
}

enum_display_fromstr!(
    SortCycle,
    SyncError::InvalidSortCycle,
    {
        TwoState => "two-state",
        ThreeState => "three-state",
    }
);

/// Wire-level sort description. `None` in both fields means unsorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: Option<String>,
    pub direction: Option<SortDirection>,
}

impl SortSpec {
    pub fn unsorted() -> Self {
        Self::default()
    }

    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            direction: Some(SortDirection::Asc),
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            direction: Some(SortDirection::Desc),
        }
    }

    pub fn is_sorted(&self) -> bool {
        self.field.is_some() && self.direction.is_some()
    }

    /// Apply a header click on `field` under the given cycle policy.
    pub fn clicked(&self, field: &str, cycle: SortCycle) -> SortSpec {
        match (self.field.as_deref(), self.direction) {
            (Some(current), Some(SortDirection::Asc)) if current == field => Self::desc(field),
            (Some(current), Some(SortDirection::Desc)) if current == field => match cycle {
                SortCycle::TwoState => Self::asc(field),
                SortCycle::ThreeState => Self::unsorted(),
            },
            _ => Self::asc(field),
        }
    }
}

/// Per-table sort state: the current spec plus the table's cycle policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortState {
    spec: SortSpec,
    cycle: SortCycle,
}

impl SortState {
    pub fn new(cycle: SortCycle) -> Self {
        Self {
            spec: SortSpec::unsorted(),
            cycle,
        }
    }

    /// Start from an initial sort, e.g. a table that defaults to newest-first.
    pub fn with_initial(cycle: SortCycle, spec: SortSpec) -> Self {
        Self { spec, cycle }
    }

    pub fn spec(&self) -> &SortSpec {
        &self.spec
    }

    pub fn cycle(&self) -> SortCycle {
        self.cycle
    }

    /// Advance the state machine and return the new spec.
    pub fn click(&mut self, field: &str) -> &SortSpec {
        self.spec = self.spec.clicked(field, self.cycle);
        &self.spec
    }
}
