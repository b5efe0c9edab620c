//! Per-keystroke filter values, owned by the input layer.

use std::collections::BTreeMap;

use crate::query::CommittedFilters;

/// Latest raw value typed into each filter field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterDraft {
    values: BTreeMap<String, String>,
}

impl FilterDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, field: &str, value: impl Into<String>) {
        self.values.insert(field.to_string(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.values.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    /// Fields in `fields` whose draft differs from the committed value.
    ///
    /// A blank or whitespace-only draft and an absent committed value are the
    /// same thing. Surrounding whitespace never makes a draft differ.
    pub fn changed_fields<'a>(
        &self,
        committed: &CommittedFilters,
        fields: impl IntoIterator<Item = &'a String>,
    ) -> Vec<String> {
        fields
            .into_iter()
            .filter(|field| {
                let draft = self.get(field).unwrap_or_default().trim();
                let current = committed
                    .get(*field)
                    .map(|v| v.trim())
                    .unwrap_or_default();
                draft != current
            })
            .cloned()
            .collect()
    }

    /// Copy the trimmed drafts for `fields` into `committed`. Blank drafts
    /// remove the filter.
    pub fn commit_into<'a>(
        &self,
        committed: &mut CommittedFilters,
        fields: impl IntoIterator<Item = &'a String>,
    ) {
        for field in fields {
            match self.get(field).map(str::trim) {
                Some(value) if !value.is_empty() => {
                    committed.insert(field.clone(), value.to_string());
                }
                _ => {
                    committed.remove(field);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_changed_fields_ignores_equal_values() {
        let mut draft = FilterDraft::new();
        draft.set("innerId", "PR-7");
        draft.set("cfo", "Smith");

        let mut committed = CommittedFilters::new();
        committed.insert("cfo".to_string(), "Smith".to_string());

        let watched = fields(&["innerId", "cfo"]);
        assert_eq!(draft.changed_fields(&committed, &watched), vec!["innerId"]);
    }

    #[test]
    fn test_blank_draft_matches_absent_filter() {
        let mut draft = FilterDraft::new();
        draft.set("innerId", "");
        let watched = fields(&["innerId"]);
        assert!(
            draft
                .changed_fields(&CommittedFilters::new(), &watched)
                .is_empty()
        );
    }

    #[test]
    fn test_whitespace_draft_is_blank() {
        let mut committed = CommittedFilters::new();
        committed.insert("cfo".to_string(), "Smith".to_string());

        let mut draft = FilterDraft::new();
        draft.set("innerId", "   ");
        draft.set("cfo", " Smith ");

        let watched = fields(&["innerId", "cfo"]);
        assert!(draft.changed_fields(&committed, &watched).is_empty());

        draft.commit_into(&mut committed, &watched);
        assert!(!committed.contains_key("innerId"));
        assert_eq!(committed.get("cfo").map(String::as_str), Some("Smith"));
    }

    #[test]
    fn test_commit_into_removes_cleared_fields() {
        let mut committed = CommittedFilters::new();
        committed.insert("cfo".to_string(), "Smith".to_string());

        let mut draft = FilterDraft::new();
        draft.set("cfo", "");
        draft.set("innerId", "42");

        draft.commit_into(&mut committed, &fields(&["cfo", "innerId"]));
        assert_eq!(committed.get("innerId").map(String::as_str), Some("42"));
        assert!(!committed.contains_key("cfo"));
    }
}
