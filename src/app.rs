//! Wiring shared by the CLI and the dashboard: engine construction from the
//! resolved config, the request context, and tracing setup.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::audit::AuditLog;
use crate::config::SubfilterConfig;
use crate::engine::SubfilterEngine;
use crate::source::JsonRecordSource;
use crate::store::JsonProfileStore;
use crate::view::RenderContext;

/// Engine over a JSON record export and the JSON profile file.
pub type FileEngine = SubfilterEngine<JsonRecordSource, JsonProfileStore>;

/// Record export to use: an explicit override, else `source.records_path`.
pub fn records_path(config: &SubfilterConfig, records: Option<&Path>) -> Option<PathBuf> {
    records
        .map(Path::to_path_buf)
        .or_else(|| config.source.resolved_path())
}

/// Build the engine. Without a record export the source is empty, which is
/// enough for selection changes.
pub fn open_engine(config: &SubfilterConfig, records: Option<&Path>) -> Result<FileEngine> {
    let source = match records_path(config, records) {
        Some(path) => JsonRecordSource::open(&path)
            .with_context(|| format!("failed to load records from {}", path.display()))?,
        None => {
            warn!("no record export configured; rendering an empty result set");
            JsonRecordSource::default()
        }
    };

    Ok(engine_over(config, source))
}

/// Engine for selection and filter changes, which never read records. The
/// configured export is not opened, so a missing or broken one cannot fail
/// these commands.
pub fn open_store_engine(config: &SubfilterConfig) -> FileEngine {
    engine_over(config, JsonRecordSource::default())
}

fn engine_over(config: &SubfilterConfig, source: JsonRecordSource) -> FileEngine {
    let store = JsonProfileStore::new(config.store.resolved_path());
    let audit = if config.logging.enabled {
        AuditLog::new(config.logging.resolved_path())
    } else {
        AuditLog::disabled()
    };

    SubfilterEngine::new(source, store, config.engine_settings()).with_audit(audit)
}

pub fn render_context(config: &SubfilterConfig) -> RenderContext {
    RenderContext::new(config.general.user.clone(), config.general.user_kind)
}

/// Audit log as configured, for reading history.
pub fn audit_log(config: &SubfilterConfig) -> AuditLog {
    AuditLog::new(config.logging.resolved_path())
}

/// Install the stderr subscriber. `SUBFILTER_LOG` overrides `logging.level`.
pub fn init_tracing(config: &SubfilterConfig) {
    let filter = EnvFilter::try_from_env("SUBFILTER_LOG")
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::engine::DimensionKey;
    use crate::store::ProfileStore;
    use crate::view::ViewKind;

    fn config_in(dir: &Path) -> SubfilterConfig {
        let mut config = SubfilterConfig::default();
        config.store.profiles_path = dir.join("profiles.json").display().to_string();
        config.logging.path = dir.join("selection-log.jsonl").display().to_string();
        config
    }

    #[test]
    fn override_wins_over_configured_records() {
        let mut config = SubfilterConfig::default();
        config.source.records_path = "/data/records.json".to_string();
        assert_eq!(
            records_path(&config, Some(Path::new("/tmp/other.json"))),
            Some(PathBuf::from("/tmp/other.json"))
        );
        assert_eq!(records_path(&config, None), Some(PathBuf::from("/data/records.json")));
    }

    #[test]
    fn engine_without_records_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let engine = open_engine(&config_in(dir.path()), None).unwrap();
        assert!(engine.source().is_empty());
    }

    #[test]
    fn missing_record_export_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(open_engine(&config_in(dir.path()), Some(&missing)).is_err());
    }

    #[test]
    fn store_engine_ignores_broken_record_export() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        config.source.records_path = dir.path().join("missing.json").display().to_string();
        assert!(open_engine(&config, None).is_err());

        let mut engine = open_store_engine(&config);
        let ctx = render_context(&config);
        assert!(engine.source().is_empty());
        assert!(engine.set(&ctx, ViewKind::Problems, DimensionKey::Severity, "4").unwrap());
        assert!(engine
            .selection(&ctx, ViewKind::Problems)
            .unwrap()
            .is_selected(&DimensionKey::Severity, "4"));
    }

    #[test]
    fn selection_changes_reach_store_and_audit_log() {
        let dir = tempfile::tempdir().unwrap();
        let records = dir.path().join("records.json");
        fs::write(&records, r#"[{"id": "1", "name": "CPU", "host": {"id": "h1", "name": "web01"}}]"#).unwrap();

        let config = config_in(dir.path());
        let mut engine = open_engine(&config, Some(&records)).unwrap();
        let ctx = render_context(&config);
        engine.set(&ctx, ViewKind::Latest, DimensionKey::Host, "h1").unwrap();

        let selection = engine.store().load_selection(ViewKind::Latest, "Admin").unwrap();
        assert!(selection.is_selected(&DimensionKey::Host, "h1"));
        assert_eq!(audit_log(&config).read_all().len(), 1);
    }
}
