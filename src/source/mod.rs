//! Record sources: the query layer that supplies the base result set.
//!
//! The engine only needs two calls: the filtered base records and each
//! dimension's domain. [`JsonRecordSource`] serves records from a JSON
//! export and applies the primary filter in memory.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::engine::counter::FacetDomain;
use crate::engine::dimension::DimensionKey;
use crate::error::{Result, SubfilterError};
use crate::filter::FilterCriteria;
use crate::model::Record;

/// Supplies base records and facet domains for a render pass.
pub trait RecordSource {
    /// Records that pass the primary filter.
    fn base_records(&self, criteria: &FilterCriteria) -> Result<Vec<Record>>;

    /// Every value `dimension` takes in the filtered set, with raw counts.
    fn facet_domain(&self, dimension: &DimensionKey, criteria: &FilterCriteria) -> Result<FacetDomain> {
        let records = self.base_records(criteria)?;
        Ok(FacetDomain::from_records(&records, dimension))
    }
}

/// Records held in memory, typically loaded from a JSON array on disk.
#[derive(Debug, Clone, Default)]
pub struct JsonRecordSource {
    records: Vec<Record>,
}

impl JsonRecordSource {
    pub fn from_records(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Load a JSON array of records.
    pub fn open(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| SubfilterError::io(path, e))?;
        let records: Vec<Record> =
            serde_json::from_str(&content).map_err(|e| SubfilterError::json(path, e))?;
        debug!(path = %path.display(), records = records.len(), "loaded record export");
        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordSource for JsonRecordSource {
    fn base_records(&self, criteria: &FilterCriteria) -> Result<Vec<Record>> {
        let compiled = criteria.compile()?;
        Ok(self
            .records
            .iter()
            .filter(|r| compiled.matches(r))
            .cloned()
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn applies_primary_filter() {
        let source = JsonRecordSource::from_records(vec![
            Record::new("1", "CPU load").with_host("1", "web01"),
            Record::new("2", "Memory").with_host("2", "db01"),
        ]);
        let criteria = FilterCriteria {
            host_ids: vec!["2".to_string()],
            ..Default::default()
        };
        let records = source.base_records(&criteria).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "2");
    }

    #[test]
    fn default_domain_comes_from_filtered_records() {
        let source = JsonRecordSource::from_records(vec![
            Record::new("1", "a").with_tag("env", "prod"),
            Record::new("2", "b").with_tag("env", "dev"),
        ]);
        let criteria = FilterCriteria {
            name: Some("a".to_string()),
            ..Default::default()
        };
        let domain = source
            .facet_domain(&DimensionKey::tag_value("env"), &criteria)
            .unwrap();
        assert_eq!(domain.len(), 1);
        assert!(domain.contains("prod"));
    }

    #[test]
    fn opens_json_export() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"id": "1", "name": "a"}}, {{"id": "2"}}]"#).unwrap();
        let source = JsonRecordSource::open(file.path()).unwrap();
        assert_eq!(source.len(), 2);
    }

    #[test]
    fn malformed_export_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = JsonRecordSource::open(file.path()).unwrap_err();
        assert!(matches!(err, SubfilterError::Json { .. }));
    }
}
