//! Subfilter engine.
//!
//! One render pass per request:
//!
//! 1. load the user's criteria and selection from the profile store
//! 2. fetch base records from the record source
//! 3. count every planned dimension against the selection
//! 4. render each dimension into the panel
//! 5. apply the selection to produce the visible record list
//!
//! Nothing is cached between passes.

pub mod counter;
pub mod dimension;
pub mod render;
pub mod selection;

use serde::Serialize;
use tracing::{debug, info, warn};

pub use counter::{CountedValue, DimensionCounts, FacetDomain, count_dimension};
pub use dimension::{DimensionKey, FacetEntry, ValueOrder};
pub use render::{
    DimensionLayout, FacetAction, FacetRenderer, FacetState, RenderOptions, RenderedDimension,
    RenderedEntry, RenderedValue, SubfilterPanel,
};
pub use selection::SelectionState;

use crate::audit::{AuditAction, AuditEntry, AuditLog};
use crate::error::{Result, SubfilterError};
use crate::filter::FilterCriteria;
use crate::model::Record;
use crate::source::RecordSource;
use crate::store::ProfileStore;
use crate::view::{DimensionPlan, RenderContext, ViewKind};

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Engine-wide behavior, usually built from the `[display]` and
/// `[selection]` config sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub render: RenderOptions,
    /// Values shown per tag-value dimension before the ellipsis.
    pub tag_value_cap: Option<usize>,
    /// Values shown per other dimension before the ellipsis.
    pub value_cap: Option<usize>,
    /// Order first-seen dimensions by name instead.
    pub sort_by_name: bool,
    /// Drop the whole selection when no record passes it.
    pub reset_when_nothing_matches: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            render: RenderOptions::default(),
            tag_value_cap: Some(5),
            value_cap: None,
            sort_by_name: false,
            reset_when_nothing_matches: false,
        }
    }
}

impl EngineSettings {
    fn layout(&self, plan: &DimensionPlan, ctx: &RenderContext) -> DimensionLayout {
        let cap = match plan.key {
            DimensionKey::TagValue(_) => self.tag_value_cap,
            _ => self.value_cap,
        };
        DimensionLayout {
            label: plan.label.clone(),
            cap,
            label_limit: ctx.field_metadata.label_limit(&plan.key),
        }
    }

    fn order(&self, plan: &DimensionPlan) -> ValueOrder {
        match plan.order {
            ValueOrder::FirstSeen if self.sort_by_name => ValueOrder::Name,
            order => order,
        }
    }
}

// ---------------------------------------------------------------------------
// Pass output
// ---------------------------------------------------------------------------

/// Everything a view needs to draw its page.
#[derive(Debug, Clone, Serialize)]
pub struct SubfilterView {
    pub view: ViewKind,
    pub user: String,
    pub criteria: FilterCriteria,
    pub selection: SelectionState,
    pub panel: SubfilterPanel,
    /// Base records that pass the selection.
    pub records: Vec<Record>,
    /// Base records before the selection is applied.
    pub base_total: usize,
    /// The stored selection was dropped during this pass.
    pub reset: bool,
}

impl SubfilterView {
    pub fn total(&self) -> usize {
        self.records.len()
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct SubfilterEngine<S, P> {
    source: S,
    store: P,
    renderer: FacetRenderer,
    settings: EngineSettings,
    audit: AuditLog,
}

impl<S: RecordSource, P: ProfileStore> SubfilterEngine<S, P> {
    pub fn new(source: S, store: P, settings: EngineSettings) -> Self {
        Self {
            source,
            store,
            renderer: FacetRenderer::new(settings.render.clone()),
            settings,
            audit: AuditLog::disabled(),
        }
    }

    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = audit;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn store(&self) -> &P {
        &self.store
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Run one render pass of `view` for the context's user.
    pub fn render_pass(&mut self, ctx: &RenderContext, view: ViewKind) -> Result<SubfilterView> {
        authorize(ctx, view)?;
        let user = ctx.user_id();

        let criteria = self.store.load_criteria(view, user)?;
        let mut selection = self.store.load_selection(view, user)?;
        let base = self.source.base_records(&criteria)?;

        let mut reset = false;
        if self.settings.reset_when_nothing_matches
            && !selection.is_empty()
            && !base.iter().any(|r| selection.admits_record(r, None))
        {
            warn!(%view, user, "no record matches the selection; resetting it");
            selection.clear();
            self.store.save_selection(view, user, &selection)?;
            self.audit.record(&AuditEntry::new(user, view, AuditAction::Reset));
            reset = true;
        }

        let selection_active = selection.is_active_anywhere();
        let plan = view.plan(&base, &criteria, &selection);
        let mut panel = SubfilterPanel {
            dimensions: Vec::with_capacity(plan.len()),
            selection_active,
        };

        for entry in &plan {
            let domain = self.source.facet_domain(&entry.key, &criteria)?;
            let counts = count_dimension(&base, &entry.key, &selection, &domain, self.settings.order(entry));
            for stale in counts.values.iter().filter(|v| v.stale) {
                warn!(dimension = %entry.key, value = %stale.id, "selected value no longer in result set");
            }
            let layout = self.settings.layout(entry, ctx);
            match self.renderer.render_dimension(&counts, &layout, selection_active) {
                Some(rendered) => panel.dimensions.push(rendered),
                None => debug!(dimension = %entry.key, values = counts.domain_size(), "dimension suppressed"),
            }
        }

        let base_total = base.len();
        let records: Vec<Record> = base
            .into_iter()
            .filter(|r| selection.admits_record(r, None))
            .collect();

        info!(
            %view,
            user,
            base = base_total,
            matched = records.len(),
            dimensions = panel.dimensions.len(),
            "rendered subfilter"
        );

        Ok(SubfilterView {
            view,
            user: user.to_string(),
            criteria,
            selection,
            panel,
            records,
            base_total,
            reset,
        })
    }

    /// Activate a value. Returns `false` if it was already active.
    pub fn set(&mut self, ctx: &RenderContext, view: ViewKind, dimension: DimensionKey, value: &str) -> Result<bool> {
        authorize(ctx, view)?;
        let user = ctx.user_id();
        let mut selection = self.store.load_selection(view, user)?;
        let entry = AuditEntry::new(user, view, AuditAction::Set).with_value(&dimension, value);

        if !selection.set(dimension, value) {
            return Ok(false);
        }
        self.store.save_selection(view, user, &selection)?;
        self.audit.record(&entry);
        info!(%view, user, dimension = entry.dimension.as_deref(), value, "selected value");
        Ok(true)
    }

    /// Deactivate a value. Returns `false` if it was not active.
    pub fn unset(&mut self, ctx: &RenderContext, view: ViewKind, dimension: &DimensionKey, value: &str) -> Result<bool> {
        authorize(ctx, view)?;
        let user = ctx.user_id();
        let mut selection = self.store.load_selection(view, user)?;

        if !selection.unset(dimension, value) {
            return Ok(false);
        }
        self.store.save_selection(view, user, &selection)?;
        self.audit
            .record(&AuditEntry::new(user, view, AuditAction::Unset).with_value(dimension, value));
        info!(%view, user, %dimension, value, "unselected value");
        Ok(true)
    }

    /// Drop every selected value of the view.
    pub fn clear(&mut self, ctx: &RenderContext, view: ViewKind) -> Result<()> {
        authorize(ctx, view)?;
        let user = ctx.user_id();
        self.store.save_selection(view, user, &SelectionState::new())?;
        self.audit.record(&AuditEntry::new(user, view, AuditAction::Clear));
        info!(%view, user, "cleared selection");
        Ok(())
    }

    /// Replace the primary filter. A change clears the selection.
    pub fn update_criteria(&mut self, ctx: &RenderContext, view: ViewKind, criteria: &FilterCriteria) -> Result<bool> {
        authorize(ctx, view)?;
        criteria.compile()?;
        let user = ctx.user_id();
        let changed = self.store.save_criteria(view, user, criteria)?;
        if changed {
            self.audit
                .record(&AuditEntry::new(user, view, AuditAction::CriteriaChanged));
            info!(%view, user, "primary filter changed; selection cleared");
        }
        Ok(changed)
    }

    pub fn selection(&self, ctx: &RenderContext, view: ViewKind) -> Result<SelectionState> {
        self.store.load_selection(view, ctx.user_id())
    }

    pub fn criteria(&self, ctx: &RenderContext, view: ViewKind) -> Result<FilterCriteria> {
        self.store.load_criteria(view, ctx.user_id())
    }
}

fn authorize(ctx: &RenderContext, view: ViewKind) -> Result<()> {
    if view.permits(ctx.current_user.kind) {
        Ok(())
    } else {
        Err(SubfilterError::AccessDenied {
            user: ctx.user_id().to_string(),
            view: view.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
