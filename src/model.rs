//! Records supplied by the query layer.
//!
//! A [`Record`] is one monitored entity (host, item, data point or problem)
//! as delivered for a single page view. The engine never persists records.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SubfilterError;

// ---------------------------------------------------------------------------
// Tags and hosts
// ---------------------------------------------------------------------------

/// A `{name, value}` tag. The value may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    #[serde(alias = "tag")]
    pub name: String,
    #[serde(default)]
    pub value: String,
}

impl Tag {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Owning host of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRef {
    #[serde(alias = "hostid")]
    pub id: String,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// Problem severity, lowest first. `Ord` follows the declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    NotClassified,
    Information,
    Warning,
    Average,
    High,
    Disaster,
}

impl Severity {
    pub const ALL: [Severity; 6] = [
        Self::NotClassified,
        Self::Information,
        Self::Warning,
        Self::Average,
        Self::High,
        Self::Disaster,
    ];

    /// Numeric level, `0` (not classified) to `5` (disaster).
    pub fn level(self) -> u8 {
        self as u8
    }

    pub fn from_level(level: u8) -> Option<Self> {
        Self::ALL.get(usize::from(level)).copied()
    }

    /// Human-readable name.
    pub fn label(self) -> &'static str {
        match self {
            Self::NotClassified => "Not classified",
            Self::Information => "Information",
            Self::Warning => "Warning",
            Self::Average => "Average",
            Self::High => "High",
            Self::Disaster => "Disaster",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Severity {
    type Err = SubfilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(level) = s.parse::<u8>() {
            return Self::from_level(level).ok_or_else(|| SubfilterError::UnknownSeverity(s.into()));
        }
        match s.to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "not_classified" => Ok(Self::NotClassified),
            "information" | "info" => Ok(Self::Information),
            "warning" => Ok(Self::Warning),
            "average" => Ok(Self::Average),
            "high" => Ok(Self::High),
            "disaster" => Ok(Self::Disaster),
            _ => Err(SubfilterError::UnknownSeverity(s.into())),
        }
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// One monitored entity in the base result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<HostRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    /// Other facet attributes (`type`, `status`, `history`, ...) as display
    /// strings.
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl Record {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            host: None,
            severity: None,
            tags: Vec::new(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_host(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.host = Some(HostRef {
            id: id.into(),
            name: name.into(),
        });
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    pub fn with_tag(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push(Tag::new(name, value));
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
