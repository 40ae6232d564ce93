//! CLI command implementations.
//!
//! Provides subcommand handlers for:
//! - `subfilter render`: run a render pass and print the panel and records
//! - `subfilter set|unset|clear|show`: change or inspect the selection
//! - `subfilter filter`: replace the primary filter
//! - `subfilter history`: recent selection changes
//! - `subfilter config show|init|set|reset`: configuration management

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::app;
use crate::audit::AuditEntry;
use crate::config::{self, SubfilterConfig};
use crate::engine::{DimensionKey, FacetState, RenderedDimension, RenderedEntry, RenderedValue, SubfilterView};
use crate::filter::{EvalType, FilterCriteria, TagCondition, TagFilter};
use crate::model::Severity;
use crate::view::ViewKind;
use crate::web;

/// Output format for `render`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Html,
}

impl OutputFormat {
    pub fn from_str_opt(s: Option<&str>) -> Self {
        match s {
            Some("json") => Self::Json,
            Some("html") => Self::Html,
            _ => Self::Table,
        }
    }
}

fn resolve_view(config: &SubfilterConfig, view: Option<&str>) -> Result<ViewKind> {
    match view {
        Some(raw) => Ok(raw.parse()?),
        None => Ok(config.general.default_view),
    }
}

// ---------------------------------------------------------------------------
// subfilter render
// ---------------------------------------------------------------------------

pub fn run_render(config: &SubfilterConfig, view: Option<&str>, records: Option<&Path>, format: OutputFormat) -> Result<()> {
    let view = resolve_view(config, view)?;
    if app::records_path(config, records).is_none() {
        anyhow::bail!("no record export given. Pass --records PATH or set source.records_path.");
    }

    let mut engine = app::open_engine(config, records)?;
    let ctx = app::render_context(config);
    let rendered = engine
        .render_pass(&ctx, view)
        .with_context(|| format!("failed to render the {view} view"))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rendered)?),
        OutputFormat::Html => println!("{}", web::frontend::page(&rendered)),
        OutputFormat::Table => print_view_table(&rendered),
    }

    Ok(())
}

fn print_view_table(view: &SubfilterView) {
    println!("{}", view.view.title().bold().cyan());
    println!("{}", "=".repeat(60));

    if view.reset {
        println!(
            "  {}",
            "Nothing matched the selection; it has been reset.".yellow()
        );
    }

    if view.panel.is_empty() {
        println!("  {}", "No subfilter dimensions to show.".dimmed());
    }
    for dimension in &view.panel.dimensions {
        print_dimension(dimension);
    }
    println!();

    println!(
        "  {:<20} {:<30} {:<14} Tags",
        "Host", "Name", "Severity"
    );
    println!("  {}", "-".repeat(76));
    for (i, record) in view.records.iter().take(50).enumerate() {
        let host = record.host.as_ref().map(|h| h.name.as_str()).unwrap_or("");
        let severity = record.severity.map(|s| s.label()).unwrap_or("");
        let tags = record
            .tags
            .iter()
            .map(|t| if t.value.is_empty() { t.name.clone() } else { format!("{}: {}", t.name, t.value) })
            .collect::<Vec<_>>()
            .join(", ");
        let line = format!(
            "  {:<20} {:<30} {:<14} {}",
            truncate(host, 20),
            truncate(&record.name, 30),
            severity,
            tags
        );
        if i % 2 == 0 {
            println!("{line}");
        } else {
            println!("{}", line.dimmed());
        }
    }
    if view.records.is_empty() {
        println!("  {}", "No data found.".dimmed());
    }

    println!();
    println!(
        "  {} {} of {}",
        "Displaying".bold(),
        view.total(),
        view.base_total
    );
}

fn print_dimension(dimension: &RenderedDimension) {
    let values: Vec<String> = dimension
        .entries
        .iter()
        .map(|entry| match entry {
            RenderedEntry::Value(value) => format_value(value),
            RenderedEntry::Ellipsis { marker, .. } => marker.dimmed().to_string(),
        })
        .collect();
    println!(
        "  {} {}",
        format!("{:>20}", truncate(&dimension.label, 20)).bold(),
        values.join("  ")
    );
}

fn format_value(value: &RenderedValue) -> String {
    let label = if value.is_empty {
        value.label.italic()
    } else {
        value.label.normal()
    };
    let count = format!("({})", value.count_label());
    match value.state {
        FacetState::Selected => format!("{} {}", label.green().bold(), count.green()),
        FacetState::Available => format!("{} {}", label, count.dimmed()),
        FacetState::Unavailable => format!("{} {}", label.dimmed(), count.dimmed()),
    }
}

// ---------------------------------------------------------------------------
// subfilter set / unset / clear / show
// ---------------------------------------------------------------------------

pub fn run_set(config: &SubfilterConfig, view: Option<&str>, dimension: &str, value: &str) -> Result<()> {
    let view = resolve_view(config, view)?;
    let key: DimensionKey = dimension.parse()?;
    let mut engine = app::open_store_engine(config);
    let changed = engine.set(&app::render_context(config), view, key, value)?;

    if changed {
        println!("{} Selected {} = {} in {}", "✓".green().bold(), dimension.bold(), value, view);
    } else {
        println!("{} {} = {} already selected", "·".dimmed(), dimension, value);
    }
    Ok(())
}

pub fn run_unset(config: &SubfilterConfig, view: Option<&str>, dimension: &str, value: &str) -> Result<()> {
    let view = resolve_view(config, view)?;
    let key: DimensionKey = dimension.parse()?;
    let mut engine = app::open_store_engine(config);
    let changed = engine.unset(&app::render_context(config), view, &key, value)?;

    if changed {
        println!("{} Removed {} = {} from {}", "✓".green().bold(), dimension.bold(), value, view);
    } else {
        println!("{} {} = {} was not selected", "·".dimmed(), dimension, value);
    }
    Ok(())
}

pub fn run_clear(config: &SubfilterConfig, view: Option<&str>) -> Result<()> {
    let view = resolve_view(config, view)?;
    let mut engine = app::open_store_engine(config);
    engine.clear(&app::render_context(config), view)?;
    println!("{} Cleared the {} subfilter", "✓".green().bold(), view);
    Ok(())
}

pub fn run_show(config: &SubfilterConfig, view: Option<&str>) -> Result<()> {
    let view = resolve_view(config, view)?;
    let engine = app::open_store_engine(config);
    let ctx = app::render_context(config);
    let criteria = engine.criteria(&ctx, view)?;
    let selection = engine.selection(&ctx, view)?;

    println!("{} {}", view.title().bold().cyan(), format!("({})", ctx.user_id()).dimmed());
    println!("{}", "=".repeat(50));

    println!("{}", "Filter".bold());
    if criteria.is_empty() {
        println!("  {}", "none".dimmed());
    } else {
        if let Some(name) = criteria.name.as_deref().filter(|n| !n.is_empty()) {
            println!("  name: {name}");
        }
        if !criteria.host_ids.is_empty() {
            println!("  hosts: {}", criteria.host_ids.join(", "));
        }
        if !criteria.severities.is_empty() {
            let labels: Vec<&str> = criteria.severities.iter().map(|s| s.label()).collect();
            println!("  severities: {}", labels.join(", "));
        }
        for condition in &criteria.tags.conditions {
            println!("  tag: {} {} {}", condition.tag, condition.operator, condition.value);
        }
    }

    println!("{}", "Subfilter".bold());
    if selection.is_empty() {
        println!("  {}", "none".dimmed());
    }
    for dimension in selection.dimensions() {
        let values: Vec<&str> = selection.selected_in(dimension).collect();
        println!("  {}: {}", dimension.to_string().cyan(), values.join(", "));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// subfilter filter
// ---------------------------------------------------------------------------

/// Flags of `subfilter filter`, unparsed.
#[derive(Debug, Default)]
pub struct FilterArgs {
    pub view: Option<String>,
    pub name: Option<String>,
    pub hosts: Vec<String>,
    pub severities: Vec<String>,
    pub tags: Vec<String>,
    pub evaltype: Option<String>,
}

impl FilterArgs {
    pub fn criteria(&self) -> Result<FilterCriteria> {
        let severities = self
            .severities
            .iter()
            .map(|s| s.parse::<Severity>())
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let conditions = self
            .tags
            .iter()
            .map(|t| t.parse::<TagCondition>())
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let evaltype = match self.evaltype.as_deref() {
            Some(raw) => raw.parse()?,
            None => EvalType::default(),
        };

        Ok(FilterCriteria {
            name: self.name.clone().filter(|n| !n.is_empty()),
            host_ids: self.hosts.clone(),
            severities,
            tags: TagFilter::new(evaltype, conditions),
        })
    }
}

pub fn run_filter(config: &SubfilterConfig, args: &FilterArgs) -> Result<()> {
    let view = resolve_view(config, args.view.as_deref())?;
    let criteria = args.criteria()?;
    let mut engine = app::open_store_engine(config);
    let changed = engine.update_criteria(&app::render_context(config), view, &criteria)?;

    if changed {
        println!("{} Filter for {} updated; subfilter cleared", "✓".green().bold(), view);
    } else {
        println!("{} Filter for {} unchanged", "·".dimmed(), view);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// subfilter history
// ---------------------------------------------------------------------------

pub fn run_history(config: &SubfilterConfig, limit: usize, format: OutputFormat) -> Result<()> {
    let entries = app::audit_log(config).read_recent(limit);

    if entries.is_empty() {
        println!("{}", "No selection changes logged yet.".yellow());
        return Ok(());
    }

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!("{}", "Selection History".bold().cyan());
    println!(
        "  {:<25} {:<10} {:<9} {:<17} Value",
        "Time", "User", "View", "Action"
    );
    println!("  {}", "-".repeat(76));
    for entry in &entries {
        print_history_entry(entry);
    }
    Ok(())
}

fn print_history_entry(entry: &AuditEntry) {
    let target = match (&entry.dimension, &entry.value) {
        (Some(d), Some(v)) => format!("{d} = {v}"),
        _ => String::new(),
    };
    println!(
        "  {:<25} {:<10} {:<9} {:<17} {}",
        truncate(&entry.timestamp, 25),
        truncate(&entry.user, 10),
        entry.view,
        colorize_action(entry.action.as_str()),
        target
    );
}

fn colorize_action(action: &str) -> colored::ColoredString {
    let padded = format!("{action:<17}");
    match action {
        "set" => padded.green(),
        "unset" => padded.yellow(),
        "clear" | "reset" | "criteria_changed" => padded.red(),
        _ => padded.normal(),
    }
}

// ---------------------------------------------------------------------------
// subfilter serve
// ---------------------------------------------------------------------------

pub fn run_serve(config: &SubfilterConfig, addr: Option<&str>, records: Option<&Path>) -> Result<()> {
    let addr = addr.unwrap_or(&config.server.addr);
    let engine = app::open_engine(config, records)?;
    web::serve(addr, engine, app::render_context(config), config.general.default_view)
}

// ---------------------------------------------------------------------------
// subfilter config
// ---------------------------------------------------------------------------

pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective subfilter Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    print_source(global_exists, "~/.subfilter/config.toml");
    print_source(project_exists, ".subfilter.toml");
    println!(
        "  {} {}",
        "·".dimmed(),
        "SUBFILTER_* environment variables".dimmed()
    );

    Ok(())
}

fn print_source(exists: bool, name: &str) {
    if exists {
        println!("  {} {}", "✓".green(), name.dimmed());
    } else {
        println!("  {} {}", "·".dimmed(), format!("{name} (not found)").dimmed());
    }
}

pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!(
        "{} Config written to {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), value);
    Ok(())
}

pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!(
        "{} Config reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Formatting helpers
// ---------------------------------------------------------------------------

/// Truncate to `max_len` characters, appending "…" if truncated.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
