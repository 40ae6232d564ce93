//! Facet value counter.
//!
//! For one dimension, counts how many base records carry each value while
//! passing every *other* dimension's selection. The counted dimension's own
//! selection is ignored, so an unselected value shows how many records
//! selecting it would add.

use std::collections::HashMap;

use serde::Serialize;

use super::dimension::{DimensionKey, ValueOrder};
use super::selection::SelectionState;
use crate::model::Record;

// ---------------------------------------------------------------------------
// Domain
// ---------------------------------------------------------------------------

/// One value in a dimension's domain with its unconditioned occurrence count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainValue {
    pub id: String,
    pub name: String,
    pub raw_count: usize,
}

/// Every value a dimension takes within the base result set, in first-seen
/// order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FacetDomain {
    values: Vec<DomainValue>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl FacetDomain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the domain of `dimension` over `records`.
    pub fn from_records(records: &[Record], dimension: &DimensionKey) -> Self {
        let mut domain = Self::new();
        for record in records {
            for entry in dimension.values_of(record) {
                domain.observe(&entry.id, &entry.name);
            }
        }
        domain
    }

    /// Record one occurrence of a value, registering it if unseen.
    pub fn observe(&mut self, id: &str, name: &str) {
        let idx = self.ensure(id, name);
        self.values[idx].raw_count += 1;
    }

    fn ensure(&mut self, id: &str, name: &str) -> usize {
        if let Some(&idx) = self.index.get(id) {
            return idx;
        }
        self.values.push(DomainValue {
            id: id.to_string(),
            name: name.to_string(),
            raw_count: 0,
        });
        self.index.insert(id.to_string(), self.values.len() - 1);
        self.values.len() - 1
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[DomainValue] {
        &self.values
    }
}

// ---------------------------------------------------------------------------
// Counted output
// ---------------------------------------------------------------------------

/// A facet value annotated with its conditional count and selection flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountedValue {
    pub id: String,
    pub name: String,
    pub count: usize,
    pub selected: bool,
    /// Selected, but absent from the current domain.
    pub stale: bool,
}

/// Counter output for one dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DimensionCounts {
    pub key: DimensionKey,
    pub values: Vec<CountedValue>,
}

impl DimensionCounts {
    /// Number of distinct values, stale selections included.
    pub fn domain_size(&self) -> usize {
        self.values.len()
    }

    pub fn has_selection(&self) -> bool {
        self.values.iter().any(|v| v.selected)
    }

    pub fn get(&self, id: &str) -> Option<&CountedValue> {
        self.values.iter().find(|v| v.id == id)
    }
}

// ---------------------------------------------------------------------------
// Counting
// ---------------------------------------------------------------------------

/// Count every value of `dimension` over `records`.
///
/// `domain` seeds value order and names (usually supplied by the query
/// layer); values found in `records` but missing from it are appended in
/// first-seen order. Selected values absent from both are appended last as
/// stale entries with a zero count.
pub fn count_dimension(
    records: &[Record],
    dimension: &DimensionKey,
    selection: &SelectionState,
    domain: &FacetDomain,
    order: ValueOrder,
) -> DimensionCounts {
    let mut domain = domain.clone();
    let mut counts: HashMap<String, usize> = HashMap::new();

    for record in records {
        let entries = dimension.values_of(record);
        for entry in &entries {
            domain.ensure(&entry.id, &entry.name);
        }

        if entries.is_empty() || !selection.admits_record(record, Some(dimension)) {
            continue;
        }

        // A record already matched through one of its selected values only
        // counts toward those; the rest of its values would add nothing.
        let own_match = entries
            .iter()
            .any(|e| selection.is_selected(dimension, &e.id));

        for entry in &entries {
            if !own_match || selection.is_selected(dimension, &entry.id) {
                *counts.entry(entry.id.clone()).or_insert(0) += 1;
            }
        }
    }

    let mut values: Vec<CountedValue> = domain
        .values()
        .iter()
        .map(|v| CountedValue {
            id: v.id.clone(),
            name: v.name.clone(),
            count: counts.get(&v.id).copied().unwrap_or(0),
            selected: selection.is_selected(dimension, &v.id),
            stale: false,
        })
        .collect();

    sort_values(&mut values, order);

    for id in selection.selected_in(dimension) {
        if !domain.contains(id) {
            values.push(CountedValue {
                id: id.to_string(),
                name: dimension.stale_label(id),
                count: 0,
                selected: true,
                stale: true,
            });
        }
    }

    DimensionCounts {
        key: dimension.clone(),
        values,
    }
}

fn sort_values(values: &mut [CountedValue], order: ValueOrder) {
    match order {
        ValueOrder::FirstSeen => {}
        ValueOrder::Name => values.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name))
        }),
        ValueOrder::Severity => values.sort_by(|a, b| {
            let level = |v: &CountedValue| v.id.parse::<u8>().unwrap_or(0);
            level(b).cmp(&level(a))
        }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Severity;

    fn records() -> Vec<Record> {
        vec![
            Record::new("1", "a").with_host("h1", "web01").with_tag("env", "prod"),
            Record::new("2", "b").with_host("h1", "web01").with_tag("env", "dev"),
            Record::new("3", "c").with_host("h2", "db01").with_tag("env", "prod"),
            Record::new("4", "d").with_host("h2", "db01"),
        ]
    }

    fn count(
        records: &[Record],
        dimension: &DimensionKey,
        selection: &SelectionState,
    ) -> DimensionCounts {
        let domain = FacetDomain::from_records(records, dimension);
        count_dimension(records, dimension, selection, &domain, ValueOrder::FirstSeen)
    }

    #[test]
    fn domain_tracks_first_seen_order_and_raw_counts() {
        let domain = FacetDomain::from_records(&records(), &DimensionKey::tag_value("env"));
        let ids: Vec<&str> = domain.values().iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["prod", "dev"]);
        assert_eq!(domain.values()[0].raw_count, 2);
    }

    #[test]
    fn counts_without_selection() {
        let counts = count(&records(), &DimensionKey::Host, &SelectionState::new());
        assert_eq!(counts.get("h1").unwrap().count, 2);
        assert_eq!(counts.get("h2").unwrap().count, 2);
        assert_eq!(counts.get("h1").unwrap().name, "web01");
    }

    #[test]
    fn counted_dimension_ignores_its_own_selection() {
        let mut selection = SelectionState::new();
        selection.set(DimensionKey::Host, "h1");

        let hosts = count(&records(), &DimensionKey::Host, &selection);
        assert_eq!(hosts.get("h1").unwrap().count, 2);
        assert!(hosts.get("h1").unwrap().selected);
        assert_eq!(hosts.get("h2").unwrap().count, 2);

        let env = count(&records(), &DimensionKey::tag_value("env"), &selection);
        assert_eq!(env.get("prod").unwrap().count, 1);
        assert_eq!(env.get("dev").unwrap().count, 1);
    }

    #[test]
    fn multi_valued_counts_are_incremental() {
        let records = vec![
            Record::new("1", "a").with_tag("a", "").with_tag("c", ""),
            Record::new("2", "b").with_tag("c", ""),
            Record::new("3", "c").with_tag("a", ""),
        ];
        let mut selection = SelectionState::new();
        selection.set(DimensionKey::TagName, "a");

        let counts = count(&records, &DimensionKey::TagName, &selection);
        assert_eq!(counts.get("a").unwrap().count, 2);
        // Record 1 already matches through "a".
        assert_eq!(counts.get("c").unwrap().count, 1);
    }

    #[test]
    fn records_without_a_value_are_not_counted() {
        let counts = count(&records(), &DimensionKey::tag_value("env"), &SelectionState::new());
        let total: usize = counts.values.iter().map(|v| v.count).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn empty_base_set_counts_zero() {
        let mut domain = FacetDomain::new();
        domain.observe("h1", "web01");
        let counts = count_dimension(
            &[],
            &DimensionKey::Host,
            &SelectionState::new(),
            &domain,
            ValueOrder::FirstSeen,
        );
        assert_eq!(counts.values.len(), 1);
        assert_eq!(counts.values[0].count, 0);
    }

    #[test]
    fn stale_selection_is_kept_with_zero_count() {
        let mut selection = SelectionState::new();
        selection.set(DimensionKey::tag_value("env"), "staging");

        let counts = count(&records(), &DimensionKey::tag_value("env"), &selection);
        let stale = counts.values.last().unwrap();
        assert_eq!(stale.id, "staging");
        assert_eq!(stale.count, 0);
        assert!(stale.selected);
        assert!(stale.stale);
        assert_eq!(counts.domain_size(), 3);
    }

    #[test]
    fn severity_order_is_descending() {
        let records = vec![
            Record::new("1", "a").with_severity(Severity::Warning),
            Record::new("2", "b").with_severity(Severity::Disaster),
            Record::new("3", "c").with_severity(Severity::Information),
        ];
        let domain = FacetDomain::from_records(&records, &DimensionKey::Severity);
        let counts = count_dimension(
            &records,
            &DimensionKey::Severity,
            &SelectionState::new(),
            &domain,
            ValueOrder::Severity,
        );
        let names: Vec<&str> = counts.values.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["Disaster", "Warning", "Information"]);
    }

    #[test]
    fn name_order_is_case_insensitive() {
        let records = vec![
            Record::new("1", "a").with_attribute("history", "90d"),
            Record::new("2", "b").with_attribute("history", "1h"),
            Record::new("3", "c").with_attribute("history", "31d"),
        ];
        let key = DimensionKey::attribute("history");
        let domain = FacetDomain::from_records(&records, &key);
        let counts =
            count_dimension(&records, &key, &SelectionState::new(), &domain, ValueOrder::Name);
        let names: Vec<&str> = counts.values.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["1h", "31d", "90d"]);
    }
}
