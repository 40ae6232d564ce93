//! Tag conditions for the primary filter.
//!
//! With [`EvalType::AndOr`] conditions on the same tag name are OR-ed and
//! the resulting groups are AND-ed. With [`EvalType::Or`] any single
//! matching condition admits the record.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SubfilterError;
use crate::model::Tag;

/// Comparison applied to a tag's value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagOperator {
    /// Case-insensitive substring match.
    #[default]
    Contains,
    Equals,
    NotContains,
    NotEquals,
    Exists,
    NotExists,
}

impl fmt::Display for TagOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Contains => "contains",
            Self::Equals => "equals",
            Self::NotContains => "not_contains",
            Self::NotEquals => "not_equals",
            Self::Exists => "exists",
            Self::NotExists => "not_exists",
        };
        f.write_str(s)
    }
}

impl FromStr for TagOperator {
    type Err = SubfilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "contains" | "like" => Ok(Self::Contains),
            "equals" | "eq" => Ok(Self::Equals),
            "not_contains" | "not_like" => Ok(Self::NotContains),
            "not_equals" | "ne" => Ok(Self::NotEquals),
            "exists" => Ok(Self::Exists),
            "not_exists" => Ok(Self::NotExists),
            _ => Err(SubfilterError::UnknownOperator(s.to_string())),
        }
    }
}

/// How conditions are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvalType {
    #[default]
    AndOr,
    Or,
}

impl FromStr for EvalType {
    type Err = SubfilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "and-or" | "and_or" | "andor" => Ok(Self::AndOr),
            "or" => Ok(Self::Or),
            _ => Err(SubfilterError::UnknownOperator(s.to_string())),
        }
    }
}

/// One `{tag, operator, value}` condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCondition {
    pub tag: String,
    #[serde(default)]
    pub operator: TagOperator,
    #[serde(default)]
    pub value: String,
}

impl TagCondition {
    pub fn new(tag: impl Into<String>, operator: TagOperator, value: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            operator,
            value: value.into(),
        }
    }

    /// A row left blank in the filter form.
    pub fn is_blank(&self) -> bool {
        self.tag.is_empty() && self.value.is_empty()
    }

    pub fn matches(&self, tags: &[Tag]) -> bool {
        let mut named = tags.iter().filter(|t| t.name == self.tag);
        match self.operator {
            TagOperator::Exists => named.next().is_some(),
            TagOperator::NotExists => named.next().is_none(),
            TagOperator::Equals => named.any(|t| t.value == self.value),
            TagOperator::NotEquals => !named.any(|t| t.value == self.value),
            TagOperator::Contains => named.any(|t| contains_ci(&t.value, &self.value)),
            TagOperator::NotContains => !named.any(|t| contains_ci(&t.value, &self.value)),
        }
    }
}

/// Parses `TAG:OPERATOR[:VALUE]`, e.g. `service:equals:web`.
impl FromStr for TagCondition {
    type Err = SubfilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let (Some(tag), Some(operator)) = (parts.next(), parts.next()) else {
            return Err(SubfilterError::InvalidTagCondition(s.to_string()));
        };
        let value = parts.next().unwrap_or_default();
        Ok(Self::new(tag, operator.parse()?, value))
    }
}

/// Tag part of the primary filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagFilter {
    pub evaltype: EvalType,
    pub conditions: Vec<TagCondition>,
}

impl TagFilter {
    pub fn new(evaltype: EvalType, conditions: Vec<TagCondition>) -> Self {
        let conditions = conditions.into_iter().filter(|c| !c.is_blank()).collect();
        Self { evaltype, conditions }
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn matches(&self, tags: &[Tag]) -> bool {
        let mut conditions = self.conditions.iter().filter(|c| !c.is_blank()).peekable();
        if conditions.peek().is_none() {
            return true;
        }

        match self.evaltype {
            EvalType::Or => conditions.any(|c| c.matches(tags)),
            EvalType::AndOr => {
                let mut groups: Vec<(&str, bool)> = Vec::new();
                for condition in conditions {
                    let hit = condition.matches(tags);
                    match groups.iter_mut().find(|(tag, _)| *tag == condition.tag) {
                        Some((_, matched)) => *matched |= hit,
                        None => groups.push((condition.tag.as_str(), hit)),
                    }
                }
                groups.iter().all(|(_, matched)| *matched)
            }
        }
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
