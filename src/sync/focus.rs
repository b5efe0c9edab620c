//! Keeps keyboard focus on the filter being typed in across re-renders.
//!
//! Replacing an input's value or re-rendering the list around it can make
//! the rendering layer recreate the element, which silently drops focus and
//! the cursor. The controller remembers which tracked field had focus and
//! where the cursor was, and puts both back after renders that may have
//! replaced the element. It only talks to the rendering layer through
//! [`FocusSurface`].

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::Mutex;

/// Capabilities the rendering layer exposes for focus restoration.
pub trait FocusSurface: Send + Sync {
    /// Name of the tracked control currently holding focus, if any.
    fn active_field(&self) -> Option<String>;

    /// Current value of the input named `name`, or `None` if it is not rendered.
    fn field_value(&self, name: &str) -> Option<String>;

    /// Focus the input named `name` and place the cursor at `cursor` (in chars).
    fn focus_field(&self, name: &str, cursor: usize);
}

/// Surface for headless use: nothing is ever focused or rendered.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedSurface;

impl FocusSurface for DetachedSurface {
    fn active_field(&self) -> Option<String> {
        None
    }

    fn field_value(&self, _name: &str) -> Option<String> {
        None
    }

    fn focus_field(&self, _name: &str, _cursor: usize) {}
}

/// The field believed to hold focus, with its last known cursor offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusedField {
    pub name: String,
    pub cursor: usize,
}

/// Result of a restoration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    Restored { cursor: usize },
    /// No tracked field had focus.
    NothingFocused,
    /// The field never lost focus; its live cursor wins over the remembered one.
    StillFocused,
    /// The user moved focus to another tracked control on purpose.
    FocusMovedByUser,
    /// The input is not currently rendered.
    FieldMissing,
    /// The rendered value is not the one we meant to show; leave it alone.
    ValueMismatch,
}

pub struct FocusController {
    surface: Arc<dyn FocusSurface>,
    tracked: BTreeSet<String>,
    focused: Mutex<Option<FocusedField>>,
}

impl FocusController {
    pub fn new(surface: Arc<dyn FocusSurface>) -> Self {
        Self {
            surface,
            tracked: BTreeSet::new(),
            focused: Mutex::new(None),
        }
    }

    /// Register a control (text filter, checkbox list, sort header) as tracked.
    pub fn track(&mut self, name: impl Into<String>) {
        self.tracked.insert(name.into());
    }

    pub fn is_tracked(&self, name: &str) -> bool {
        self.tracked.contains(name)
    }

    pub fn focused(&self) -> Option<FocusedField> {
        self.focused.lock().clone()
    }

    pub fn on_focus(&self, name: &str, cursor: usize) {
        if self.is_tracked(name) {
            *self.focused.lock() = Some(FocusedField {
                name: name.to_string(),
                cursor,
            });
        }
    }

    /// Record the cursor position of the focused field, e.g. after a keystroke.
    pub fn on_cursor(&self, name: &str, cursor: usize) {
        let mut focused = self.focused.lock();
        if let Some(field) = focused.as_mut().filter(|f| f.name == name) {
            field.cursor = cursor;
            return;
        }
        if self.is_tracked(name) {
            *focused = Some(FocusedField {
                name: name.to_string(),
                cursor,
            });
        }
    }

    /// Forget the focused field unless focus is moving to another tracked control.
    pub fn on_blur(&self, name: &str, next_target: Option<&str>) {
        if next_target.is_some_and(|target| self.is_tracked(target)) {
            return;
        }
        let mut focused = self.focused.lock();
        if focused.as_ref().is_some_and(|f| f.name == name) {
            *focused = None;
        }
    }

    /// Put focus back on the remembered field if `intended_value` is what it shows.
    pub fn restore(&self, intended_value: &str) -> RestoreOutcome {
        let Some(field) = self.focused() else {
            return RestoreOutcome::NothingFocused;
        };

        if let Some(active) = self.surface.active_field() {
            if active == field.name {
                return RestoreOutcome::StillFocused;
            }
            if self.is_tracked(&active) {
                tracing::trace!("focus moved from '{}' to '{active}', not restoring", field.name);
                return RestoreOutcome::FocusMovedByUser;
            }
        }

        let Some(rendered) = self.surface.field_value(&field.name) else {
            return RestoreOutcome::FieldMissing;
        };
        if rendered != intended_value {
            return RestoreOutcome::ValueMismatch;
        }

        let cursor = field.cursor.min(rendered.chars().count());
        self.surface.focus_field(&field.name, cursor);
        tracing::trace!("restored focus to '{}' at {cursor}", field.name);
        RestoreOutcome::Restored { cursor }
    }
}
