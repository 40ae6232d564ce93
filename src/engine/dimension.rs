//! Facet dimensions: the axes a result set can be refined along.
//!
//! Every dimension has a canonical string key (`host`, `tag`,
//! `tag_value:<tag>`, `tag_pair`, `severity`, `attr:<key>`) used in CLI
//! arguments, URLs and stored profiles.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SubfilterError;
use crate::model::{Record, Severity};

// ---------------------------------------------------------------------------
// Dimension key
// ---------------------------------------------------------------------------

/// Identifies one facet dimension.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DimensionKey {
    /// Owning host, keyed by host id.
    Host,
    /// Tag names present on a record.
    TagName,
    /// Values of one tag name.
    TagValue(String),
    /// Tag name and value combined.
    TagPair,
    /// Problem severity.
    Severity,
    /// Any named record attribute.
    Attribute(String),
}

impl DimensionKey {
    pub fn tag_value(tag: impl Into<String>) -> Self {
        Self::TagValue(tag.into())
    }

    pub fn attribute(key: impl Into<String>) -> Self {
        Self::Attribute(key.into())
    }

    /// Whether a single record may carry several values in this dimension.
    pub fn is_multi_valued(&self) -> bool {
        matches!(self, Self::TagName | Self::TagValue(_) | Self::TagPair)
    }

    /// Default heading shown above the dimension's values.
    pub fn default_label(&self) -> String {
        match self {
            Self::Host => "Hosts".to_string(),
            Self::TagName | Self::TagPair => "Tags".to_string(),
            Self::TagValue(tag) => tag.clone(),
            Self::Severity => "Severity".to_string(),
            Self::Attribute(key) => humanize(key),
        }
    }

    /// Distinct values this record carries in the dimension, in the order
    /// they appear on the record.
    pub fn values_of(&self, record: &Record) -> Vec<FacetEntry> {
        let mut entries: Vec<FacetEntry> = Vec::new();
        let mut push = |entry: FacetEntry| {
            if !entries.iter().any(|e| e.id == entry.id) {
                entries.push(entry);
            }
        };

        match self {
            Self::Host => {
                if let Some(host) = &record.host {
                    push(FacetEntry::new(&host.id, &host.name));
                }
            }
            Self::TagName => {
                for tag in &record.tags {
                    push(FacetEntry::plain(&tag.name));
                }
            }
            Self::TagValue(name) => {
                for tag in record.tags.iter().filter(|t| &t.name == name) {
                    push(FacetEntry::plain(&tag.value));
                }
            }
            Self::TagPair => {
                for tag in &record.tags {
                    push(FacetEntry::new(
                        tag_pair_id(&tag.name, &tag.value),
                        tag_pair_label(&tag.name, &tag.value),
                    ));
                }
            }
            Self::Severity => {
                if let Some(severity) = record.severity {
                    push(FacetEntry::new(severity.level().to_string(), severity.label()));
                }
            }
            Self::Attribute(key) => {
                if let Some(value) = record.attribute(key) {
                    push(FacetEntry::plain(value));
                }
            }
        }

        entries
    }

    /// Display name for a selected value id that no longer appears in the
    /// domain.
    pub fn stale_label(&self, id: &str) -> String {
        match self {
            Self::Severity => id
                .parse::<u8>()
                .ok()
                .and_then(Severity::from_level)
                .map(|s| s.label().to_string())
                .unwrap_or_else(|| id.to_string()),
            Self::TagPair => serde_json::from_str::<(String, String)>(id)
                .map(|(name, value)| tag_pair_label(&name, &value))
                .unwrap_or_else(|_| id.to_string()),
            _ => id.to_string(),
        }
    }
}

impl fmt::Display for DimensionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => write!(f, "host"),
            Self::TagName => write!(f, "tag"),
            Self::TagValue(tag) => write!(f, "tag_value:{tag}"),
            Self::TagPair => write!(f, "tag_pair"),
            Self::Severity => write!(f, "severity"),
            Self::Attribute(key) => write!(f, "attr:{key}"),
        }
    }
}

impl FromStr for DimensionKey {
    type Err = SubfilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "host" | "hosts" => return Ok(Self::Host),
            "tag" | "tags" => return Ok(Self::TagName),
            "tag_pair" => return Ok(Self::TagPair),
            "severity" => return Ok(Self::Severity),
            _ => {}
        }

        match s.split_once(':') {
            Some(("tag_value", tag)) => Ok(Self::TagValue(tag.to_string())),
            Some(("attr", key)) if !key.is_empty() => Ok(Self::Attribute(key.to_string())),
            _ => Err(SubfilterError::UnknownDimension(s.to_string())),
        }
    }
}

impl TryFrom<String> for DimensionKey {
    type Error = SubfilterError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DimensionKey> for String {
    fn from(key: DimensionKey) -> Self {
        key.to_string()
    }
}

// ---------------------------------------------------------------------------
// Facet entries and ordering
// ---------------------------------------------------------------------------

/// A value id with its display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetEntry {
    pub id: String,
    pub name: String,
}

impl FacetEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Entry whose id doubles as its display name.
    pub fn plain(value: &str) -> Self {
        Self::new(value, value)
    }
}

/// Ordering applied to a dimension's values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValueOrder {
    /// Order in which values were first seen in the result set.
    #[default]
    FirstSeen,
    /// Alphabetical by display name.
    Name,
    /// Descending severity (ids are severity levels).
    Severity,
}

/// Stable id for a tag name+value pair.
pub fn tag_pair_id(name: &str, value: &str) -> String {
    serde_json::json!([name, value]).to_string()
}

fn tag_pair_label(name: &str, value: &str) -> String {
    if value.is_empty() {
        name.to_string()
    } else {
        format!("{name}: {value}")
    }
}

/// `with_triggers` → `With triggers`.
fn humanize(key: &str) -> String {
    let spaced = key.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
