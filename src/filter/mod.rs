//! Primary (base) filter criteria.
//!
//! The base filter narrows the record set before any subfilter counting
//! happens. Changing it through the profile store clears the stored
//! subfilter selection.

pub mod tags;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SubfilterError};
use crate::model::{Record, Severity};

pub use tags::{EvalType, TagCondition, TagFilter, TagOperator};

/// Primary filter as stored in a view profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterCriteria {
    /// Case-insensitive name search; `*` matches any run of characters.
    pub name: Option<String>,
    pub host_ids: Vec<String>,
    pub severities: Vec<Severity>,
    pub tags: TagFilter,
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        self.name.as_deref().is_none_or(str::is_empty)
            && self.host_ids.is_empty()
            && self.severities.is_empty()
            && self.tags.is_empty()
    }

    /// The single host this filter is pinned to, if any.
    pub fn single_host(&self) -> Option<&str> {
        match self.host_ids.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    pub fn compile(&self) -> Result<CompiledCriteria<'_>> {
        let name = match self.name.as_deref() {
            Some(pattern) if !pattern.is_empty() => Some(wildcard_regex(pattern)?),
            _ => None,
        };
        Ok(CompiledCriteria {
            criteria: self,
            name,
        })
    }
}

/// Filter criteria with the name pattern compiled.
#[derive(Debug)]
pub struct CompiledCriteria<'a> {
    criteria: &'a FilterCriteria,
    name: Option<Regex>,
}

impl CompiledCriteria<'_> {
    pub fn matches(&self, record: &Record) -> bool {
        if let Some(re) = &self.name
            && !re.is_match(&record.name)
        {
            return false;
        }

        let criteria = self.criteria;
        if !criteria.host_ids.is_empty() {
            let Some(host) = &record.host else {
                return false;
            };
            if !criteria.host_ids.contains(&host.id) {
                return false;
            }
        }

        if !criteria.severities.is_empty()
            && !record
                .severity
                .is_some_and(|s| criteria.severities.contains(&s))
        {
            return false;
        }

        criteria.tags.matches(&record.tags)
    }
}

/// Translate a `*` wildcard search into an unanchored, case-insensitive
/// regex.
fn wildcard_regex(pattern: &str) -> Result<Regex> {
    let body = pattern
        .split('*')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("(?i){body}")).map_err(|source| SubfilterError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> Record {
        Record::new("1", "CPU utilization")
            .with_host("10084", "Zabbix server")
            .with_severity(Severity::Average)
            .with_tag("component", "cpu")
    }

    #[test]
    fn empty_criteria_match_everything() {
        let criteria = FilterCriteria::default();
        assert!(criteria.is_empty());
        assert!(criteria.compile().unwrap().matches(&record()));
    }

    #[test]
    fn name_search_is_case_insensitive_substring() {
        let criteria = FilterCriteria {
            name: Some("utiliz".to_string()),
            ..Default::default()
        };
        assert!(criteria.compile().unwrap().matches(&record()));
    }

    #[test]
    fn name_search_supports_wildcards() {
        let criteria = FilterCriteria {
            name: Some("cpu*tion".to_string()),
            ..Default::default()
        };
        assert!(criteria.compile().unwrap().matches(&record()));

        let criteria = FilterCriteria {
            name: Some("memory*".to_string()),
            ..Default::default()
        };
        assert!(!criteria.compile().unwrap().matches(&record()));
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        let criteria = FilterCriteria {
            name: Some("(cpu)".to_string()),
            ..Default::default()
        };
        assert!(!criteria.compile().unwrap().matches(&record()));
    }

    #[test]
    fn host_and_severity_restrictions() {
        let criteria = FilterCriteria {
            host_ids: vec!["10084".to_string()],
            severities: vec![Severity::High, Severity::Average],
            ..Default::default()
        };
        assert_eq!(criteria.single_host(), Some("10084"));
        assert!(criteria.compile().unwrap().matches(&record()));

        let criteria = FilterCriteria {
            severities: vec![Severity::Disaster],
            ..Default::default()
        };
        assert!(!criteria.compile().unwrap().matches(&record()));

        let hostless = Record::new("2", "x");
        let criteria = FilterCriteria {
            host_ids: vec!["10084".to_string()],
            ..Default::default()
        };
        assert!(!criteria.compile().unwrap().matches(&hostless));
    }

    #[test]
    fn tag_conditions_apply() {
        let criteria = FilterCriteria {
            tags: TagFilter::new(
                EvalType::AndOr,
                vec![TagCondition::new("component", TagOperator::Equals, "memory")],
            ),
            ..Default::default()
        };
        assert!(!criteria.compile().unwrap().matches(&record()));
    }
}
