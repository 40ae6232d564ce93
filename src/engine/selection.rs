//! Facet selection state: which values the user has activated per
//! dimension.
//!
//! Values within one dimension combine with OR; dimensions combine with AND.
//! A dimension with no selected values is unconstrained.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::dimension::{DimensionKey, FacetEntry};
use crate::model::Record;

/// Selected value ids, per dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectionState {
    selected: BTreeMap<DimensionKey, BTreeSet<String>>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Activate `value` in `dimension`. Returns `false` if it was already
    /// active.
    pub fn set(&mut self, dimension: DimensionKey, value: impl Into<String>) -> bool {
        self.selected.entry(dimension).or_default().insert(value.into())
    }

    /// Deactivate `value` in `dimension`. Returns `false` if it was not
    /// active. An emptied dimension becomes unconstrained.
    pub fn unset(&mut self, dimension: &DimensionKey, value: &str) -> bool {
        let Some(values) = self.selected.get_mut(dimension) else {
            return false;
        };
        let removed = values.remove(value);
        if values.is_empty() {
            self.selected.remove(dimension);
        }
        removed
    }

    pub fn clear_dimension(&mut self, dimension: &DimensionKey) -> bool {
        self.selected.remove(dimension).is_some()
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Whether any value in any dimension is selected.
    pub fn is_active_anywhere(&self) -> bool {
        !self.is_empty()
    }

    pub fn is_constrained(&self, dimension: &DimensionKey) -> bool {
        self.selected.contains_key(dimension)
    }

    pub fn is_selected(&self, dimension: &DimensionKey, value: &str) -> bool {
        self.selected
            .get(dimension)
            .is_some_and(|values| values.contains(value))
    }

    pub fn selected_in(&self, dimension: &DimensionKey) -> impl Iterator<Item = &str> {
        self.selected
            .get(dimension)
            .into_iter()
            .flat_map(|values| values.iter().map(String::as_str))
    }

    /// Dimensions with at least one selected value.
    pub fn dimensions(&self) -> impl Iterator<Item = &DimensionKey> {
        self.selected.keys()
    }

    /// Whether a record carrying `values` passes this dimension's selection.
    pub fn admits(&self, dimension: &DimensionKey, values: &[FacetEntry]) -> bool {
        match self.selected.get(dimension) {
            None => true,
            Some(selected) => values.iter().any(|v| selected.contains(&v.id)),
        }
    }

    /// Whether a record passes every selected dimension except `skip`.
    pub fn admits_record(&self, record: &Record, skip: Option<&DimensionKey>) -> bool {
        self.selected
            .iter()
            .filter(|(dimension, _)| Some(*dimension) != skip)
            .all(|(dimension, selected)| {
                dimension
                    .values_of(record)
                    .iter()
                    .any(|v| selected.contains(&v.id))
            })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_is_idempotent() {
        let mut state = SelectionState::new();
        assert!(state.set(DimensionKey::TagName, "service"));
        assert!(!state.set(DimensionKey::TagName, "service"));
        assert_eq!(state.selected_in(&DimensionKey::TagName).count(), 1);
    }

    #[test]
    fn unset_restores_unconstrained_dimension() {
        let mut state = SelectionState::new();
        state.set(DimensionKey::Host, "10084");
        assert!(state.is_constrained(&DimensionKey::Host));

        assert!(state.unset(&DimensionKey::Host, "10084"));
        assert!(!state.is_constrained(&DimensionKey::Host));
        assert_eq!(state, SelectionState::new());

        assert!(!state.unset(&DimensionKey::Host, "10084"));
    }

    #[test]
    fn set_leaves_other_dimensions_alone() {
        let mut state = SelectionState::new();
        state.set(DimensionKey::Host, "1");
        state.set(DimensionKey::TagName, "env");
        state.unset(&DimensionKey::TagName, "env");
        assert!(state.is_selected(&DimensionKey::Host, "1"));
        assert!(state.is_active_anywhere());
    }

    #[test]
    fn admits_record_ands_dimensions_and_ors_values() {
        let record = Record::new("1", "cpu")
            .with_host("10", "web01")
            .with_tag("env", "prod");

        let mut state = SelectionState::new();
        assert!(state.admits_record(&record, None));

        state.set(DimensionKey::Host, "10");
        state.set(DimensionKey::Host, "11");
        assert!(state.admits_record(&record, None));

        state.set(DimensionKey::tag_value("env"), "dev");
        assert!(!state.admits_record(&record, None));
        assert!(state.admits_record(&record, Some(&DimensionKey::tag_value("env"))));
    }

    #[test]
    fn serializes_as_plain_map() {
        let mut state = SelectionState::new();
        state.set(DimensionKey::tag_value("env"), "prod");
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, r#"{"tag_value:env":["prod"]}"#);

        let back: SelectionState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
