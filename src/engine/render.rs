//! Facet renderer: turns counted values into render-ready entries.
//!
//! Every value lands in exactly one [`FacetState`]:
//!
//! | State         | Condition                  | Action | `+` prefix                  |
//! |---------------|----------------------------|--------|-----------------------------|
//! | `Selected`    | selected                   | unset  | never                       |
//! | `Available`   | not selected, count > 0    | set    | if any selection is active  |
//! | `Unavailable` | not selected, count == 0   | none   | never                       |
//!
//! Dimensions with fewer than `min_distinct_values` values and no active
//! selection are suppressed. When a display cap applies, selected values
//! beyond the cap are still shown, after the visible window.

use serde::Serialize;

use super::counter::{CountedValue, DimensionCounts};
use super::dimension::DimensionKey;

// ---------------------------------------------------------------------------
// Rendered structure
// ---------------------------------------------------------------------------

/// Interactive state of one facet value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetState {
    /// Active filter; rendered as an unset action.
    Selected,
    /// Unselected with matching records; rendered as a set action.
    Available,
    /// Unselected with no matching records; disabled.
    Unavailable,
}

impl FacetState {
    pub fn is_interactive(self) -> bool {
        !matches!(self, Self::Unavailable)
    }
}

/// Action a click on the value performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetAction {
    Set,
    Unset,
}

/// One value as it should be displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedValue {
    pub id: String,
    /// Display label; the configured empty label for empty values.
    pub label: String,
    /// The value had an empty name and is shown with the empty label.
    pub is_empty: bool,
    pub count: usize,
    pub state: FacetState,
    /// Count is relative to filters already active elsewhere.
    pub incremental: bool,
    pub stale: bool,
}

impl RenderedValue {
    pub fn action(&self) -> Option<FacetAction> {
        match self.state {
            FacetState::Selected => Some(FacetAction::Unset),
            FacetState::Available => Some(FacetAction::Set),
            FacetState::Unavailable => None,
        }
    }

    /// Count as displayed next to the label, e.g. `12` or `+3`.
    pub fn count_label(&self) -> String {
        if self.incremental {
            format!("+{}", self.count)
        } else {
            self.count.to_string()
        }
    }
}

/// A rendered value or the truncation marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RenderedEntry {
    Value(RenderedValue),
    Ellipsis { marker: String, hidden: usize },
}

impl RenderedEntry {
    pub fn as_value(&self) -> Option<&RenderedValue> {
        match self {
            Self::Value(value) => Some(value),
            Self::Ellipsis { .. } => None,
        }
    }
}

/// One dimension row of the subfilter panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedDimension {
    pub key: DimensionKey,
    pub label: String,
    pub entries: Vec<RenderedEntry>,
}

impl RenderedDimension {
    pub fn values(&self) -> impl Iterator<Item = &RenderedValue> {
        self.entries.iter().filter_map(RenderedEntry::as_value)
    }

    pub fn value(&self, id: &str) -> Option<&RenderedValue> {
        self.values().find(|v| v.id == id)
    }

    pub fn is_truncated(&self) -> bool {
        self.entries
            .iter()
            .any(|e| matches!(e, RenderedEntry::Ellipsis { .. }))
    }
}

/// The whole "refine your results" panel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubfilterPanel {
    pub dimensions: Vec<RenderedDimension>,
    pub selection_active: bool,
}

impl SubfilterPanel {
    pub fn dimension(&self, key: &DimensionKey) -> Option<&RenderedDimension> {
        self.dimensions.iter().find(|d| &d.key == key)
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Panel-wide rendering options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    pub min_distinct_values: usize,
    pub empty_label: String,
    pub ellipsis: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            min_distinct_values: 2,
            empty_label: "None".to_string(),
            ellipsis: "...".to_string(),
        }
    }
}

/// Per-dimension layout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DimensionLayout {
    pub label: String,
    /// Maximum values shown before the ellipsis marker.
    pub cap: Option<usize>,
    /// Maximum label length in characters.
    pub label_limit: Option<usize>,
}

/// Shared renderer for every view.
#[derive(Debug, Clone, Default)]
pub struct FacetRenderer {
    options: RenderOptions,
}

impl FacetRenderer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Classify a counted value.
    pub fn classify(value: &CountedValue) -> FacetState {
        if value.selected {
            FacetState::Selected
        } else if value.count > 0 {
            FacetState::Available
        } else {
            FacetState::Unavailable
        }
    }

    /// Render one dimension, or `None` if it is suppressed.
    pub fn render_dimension(
        &self,
        counts: &DimensionCounts,
        layout: &DimensionLayout,
        selection_active: bool,
    ) -> Option<RenderedDimension> {
        if counts.domain_size() < self.options.min_distinct_values && !counts.has_selection() {
            return None;
        }

        let render = |value: &CountedValue| RenderedEntry::Value(self.render_value(value, layout, selection_active));

        let mut entries: Vec<RenderedEntry> = Vec::new();
        match layout.cap {
            Some(cap) if counts.values.len() > cap => {
                let (visible, overflow) = counts.values.split_at(cap);
                entries.extend(visible.iter().map(render));
                entries.extend(overflow.iter().filter(|v| v.selected).map(render));

                let hidden = overflow.iter().filter(|v| !v.selected).count();
                if hidden > 0 {
                    entries.push(RenderedEntry::Ellipsis {
                        marker: self.options.ellipsis.clone(),
                        hidden,
                    });
                }
            }
            _ => entries.extend(counts.values.iter().map(render)),
        }

        Some(RenderedDimension {
            key: counts.key.clone(),
            label: layout.label.clone(),
            entries,
        })
    }

    fn render_value(
        &self,
        value: &CountedValue,
        layout: &DimensionLayout,
        selection_active: bool,
    ) -> RenderedValue {
        let state = Self::classify(value);
        let is_empty = value.name.is_empty();
        let label = if is_empty {
            self.options.empty_label.clone()
        } else {
            self.clip(&value.name, layout.label_limit)
        };

        RenderedValue {
            id: value.id.clone(),
            label,
            is_empty,
            count: value.count,
            state,
            incremental: state == FacetState::Available && selection_active,
            stale: value.stale,
        }
    }

    fn clip(&self, name: &str, limit: Option<usize>) -> String {
        match limit {
            Some(limit) if name.chars().count() > limit => {
                let mut clipped: String = name.chars().take(limit).collect();
                clipped.push_str(&self.options.ellipsis);
                clipped
            }
            _ => name.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
