//! Views, their dimension plans, and the per-request render context.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::engine::dimension::{DimensionKey, ValueOrder};
use crate::engine::selection::SelectionState;
use crate::error::SubfilterError;
use crate::filter::FilterCriteria;
use crate::model::Record;

// ---------------------------------------------------------------------------
// View kind
// ---------------------------------------------------------------------------

/// A monitoring page that carries a subfilter panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewKind {
    /// Latest data.
    #[default]
    Latest,
    /// Graphs of item values.
    Charts,
    /// Item configuration list.
    Items,
    Hosts,
    Problems,
}

impl ViewKind {
    pub const ALL: [ViewKind; 5] = [
        Self::Latest,
        Self::Charts,
        Self::Items,
        Self::Hosts,
        Self::Problems,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Latest => "latest",
            Self::Charts => "charts",
            Self::Items => "items",
            Self::Hosts => "hosts",
            Self::Problems => "problems",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Latest => "Latest data",
            Self::Charts => "Graphs",
            Self::Items => "Items",
            Self::Hosts => "Hosts",
            Self::Problems => "Problems",
        }
    }

    /// Whether users of `kind` may open this view.
    pub fn permits(self, kind: UserKind) -> bool {
        match self {
            Self::Items => kind >= UserKind::Admin,
            _ => true,
        }
    }

    /// Dimensions shown for this view, in panel order.
    ///
    /// Tag-value dimensions are generated for every tag name in `records`.
    /// Dimensions with an active selection are always included so the user
    /// can remove them.
    pub fn plan(
        self,
        records: &[Record],
        criteria: &FilterCriteria,
        selection: &SelectionState,
    ) -> Vec<DimensionPlan> {
        let mut plan: Vec<DimensionPlan> = Vec::new();
        let host = criteria.single_host().is_none();

        match self {
            Self::Latest | Self::Charts => {
                if host {
                    plan.push(DimensionPlan::new(DimensionKey::Host));
                }
                plan.push(DimensionPlan::new(DimensionKey::TagName));
                plan.extend(tag_value_plans(records));
                if self == Self::Latest {
                    plan.push(DimensionPlan::labelled(DimensionKey::attribute("data"), "Data"));
                }
            }
            Self::Items => {
                if host {
                    plan.push(DimensionPlan::new(DimensionKey::Host));
                }
                for (key, label) in [
                    ("type", "Types"),
                    ("value_type", "Type of information"),
                    ("status", "Status"),
                    ("state", "State"),
                    ("inherited", "Template"),
                    ("with_triggers", "With triggers"),
                    ("discovered", "Discovery"),
                    ("history", "History"),
                    ("trends", "Trends"),
                    ("interval", "Interval"),
                ] {
                    plan.push(DimensionPlan::labelled(DimensionKey::attribute(key), label));
                }
                plan.push(DimensionPlan::new(DimensionKey::TagPair));
                for entry in &mut plan {
                    entry.order = ValueOrder::Name;
                }
            }
            Self::Hosts => {
                plan.push(DimensionPlan::new(DimensionKey::TagName));
                plan.extend(tag_value_plans(records));
                plan.push(DimensionPlan::labelled(DimensionKey::attribute("status"), "Status"));
            }
            Self::Problems => {
                if criteria.severities.len() != 1 {
                    plan.push(DimensionPlan::new(DimensionKey::Severity));
                }
                if host {
                    plan.push(DimensionPlan::new(DimensionKey::Host));
                }
                plan.push(DimensionPlan::new(DimensionKey::TagName));
            }
        }

        for entry in &mut plan {
            if entry.key == DimensionKey::Severity {
                entry.order = ValueOrder::Severity;
            }
        }

        for key in selection.dimensions() {
            if !plan.iter().any(|p| &p.key == key) {
                plan.push(DimensionPlan::new(key.clone()));
            }
        }

        plan
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewKind {
    type Err = SubfilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "latest" | "latest-data" | "latest_data" => Ok(Self::Latest),
            "charts" | "graphs" => Ok(Self::Charts),
            "items" => Ok(Self::Items),
            "hosts" => Ok(Self::Hosts),
            "problems" => Ok(Self::Problems),
            _ => Err(SubfilterError::UnknownView(s.to_string())),
        }
    }
}

fn tag_value_plans(records: &[Record]) -> Vec<DimensionPlan> {
    let mut names: Vec<&str> = Vec::new();
    for tag in records.iter().flat_map(|r| &r.tags) {
        if !names.contains(&tag.name.as_str()) {
            names.push(&tag.name);
        }
    }
    names
        .into_iter()
        .map(|name| DimensionPlan::new(DimensionKey::tag_value(name)))
        .collect()
}

/// One dimension in a view's panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionPlan {
    pub key: DimensionKey,
    pub label: String,
    pub order: ValueOrder,
}

impl DimensionPlan {
    pub fn new(key: DimensionKey) -> Self {
        let label = key.default_label();
        Self::labelled(key, label)
    }

    pub fn labelled(key: DimensionKey, label: impl Into<String>) -> Self {
        Self {
            key,
            label: label.into(),
            order: ValueOrder::FirstSeen,
        }
    }
}

// ---------------------------------------------------------------------------
// Render context
// ---------------------------------------------------------------------------

/// User role, lowest privilege first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UserKind {
    #[default]
    User,
    Admin,
    SuperAdmin,
}

impl FromStr for UserKind {
    type Err = SubfilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            "super-admin" | "superadmin" => Ok(Self::SuperAdmin),
            _ => Err(SubfilterError::UnknownUserKind(s.to_string())),
        }
    }
}

/// The user a pass renders for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentUser {
    pub id: String,
    pub kind: UserKind,
}

/// Maximum stored lengths of the fields facet labels come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMetadata {
    lengths: HashMap<&'static str, usize>,
}

impl Default for FieldMetadata {
    fn default() -> Self {
        Self {
            lengths: HashMap::from([("host.name", 128), ("tag.tag", 255), ("tag.value", 255)]),
        }
    }
}

impl FieldMetadata {
    pub fn with_length(mut self, field: &'static str, length: usize) -> Self {
        self.lengths.insert(field, length);
        self
    }

    pub fn length(&self, field: &str) -> Option<usize> {
        self.lengths.get(field).copied()
    }

    /// Label length limit for values of `key`.
    pub fn label_limit(&self, key: &DimensionKey) -> Option<usize> {
        match key {
            DimensionKey::Host => self.length("host.name"),
            DimensionKey::TagName => self.length("tag.tag"),
            DimensionKey::TagValue(_) => self.length("tag.value"),
            DimensionKey::TagPair => self
                .length("tag.tag")
                .zip(self.length("tag.value"))
                .map(|(tag, value)| tag + value + 2),
            DimensionKey::Severity | DimensionKey::Attribute(_) => None,
        }
    }
}

/// Everything a render pass needs besides records and the profile store.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub current_user: CurrentUser,
    pub field_metadata: FieldMetadata,
}

impl RenderContext {
    pub fn new(user_id: impl Into<String>, kind: UserKind) -> Self {
        Self {
            current_user: CurrentUser {
                id: user_id.into(),
                kind,
            },
            field_metadata: FieldMetadata::default(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.current_user.id
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
