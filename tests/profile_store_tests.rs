/// Profile persistence and the selection audit log.
///
/// These tests write to temporary directories so that separate engine
/// instances share state only through the profile file.
use std::fs;
use std::path::Path;

use subfilter::audit::{AuditAction, AuditLog};
use subfilter::engine::{DimensionKey, SelectionState};
use subfilter::filter::{EvalType, FilterCriteria, TagCondition, TagFilter, TagOperator};
use subfilter::source::JsonRecordSource;
use subfilter::store::{JsonProfileStore, ProfileStore};
use subfilter::{EngineSettings, Record, RenderContext, SubfilterEngine, SubfilterError, UserKind, ViewKind};

fn records() -> Vec<Record> {
    vec![
        Record::new("1", "CPU").with_host("h1", "web01").with_tag("env", "prod"),
        Record::new("2", "Disk").with_host("h2", "db01").with_tag("env", "dev"),
    ]
}

fn open(dir: &Path) -> SubfilterEngine<JsonRecordSource, JsonProfileStore> {
    SubfilterEngine::new(
        JsonRecordSource::from_records(records()),
        JsonProfileStore::new(dir.join("profiles.json")),
        EngineSettings::default(),
    )
    .with_audit(AuditLog::new(dir.join("selection-log.jsonl")))
}

fn admin() -> RenderContext {
    RenderContext::new("Admin", UserKind::SuperAdmin)
}

// ---------------------------------------------------------------------------
// JSON profile file
// ---------------------------------------------------------------------------

#[test]
fn selection_survives_a_new_engine() {
    let dir = tempfile::tempdir().unwrap();
    open(dir.path())
        .set(&admin(), ViewKind::Latest, DimensionKey::tag_value("env"), "prod")
        .unwrap();

    let mut reopened = open(dir.path());
    let view = reopened.render_pass(&admin(), ViewKind::Latest).unwrap();
    assert_eq!(view.total(), 1);
    assert!(view.selection.is_selected(&DimensionKey::tag_value("env"), "prod"));
}

#[test]
fn profiles_are_scoped_per_user() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = open(dir.path());
    engine.set(&admin(), ViewKind::Latest, DimensionKey::Host, "h1").unwrap();

    let other = RenderContext::new("ops", UserKind::Admin);
    assert!(engine.selection(&other, ViewKind::Latest).unwrap().is_empty());
    assert_eq!(engine.render_pass(&other, ViewKind::Latest).unwrap().total(), 2);
}

#[test]
fn criteria_round_trip_through_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = JsonProfileStore::new(dir.path().join("nested").join("profiles.json"));
    let criteria = FilterCriteria {
        name: Some("cpu*".to_string()),
        host_ids: vec!["h1".to_string()],
        tags: TagFilter::new(
            EvalType::Or,
            vec![TagCondition::new("env", TagOperator::Equals, "prod")],
        ),
        ..Default::default()
    };

    assert!(store.save_criteria(ViewKind::Problems, "Admin", &criteria).unwrap());
    assert!(!store.save_criteria(ViewKind::Problems, "Admin", &criteria).unwrap());
    assert_eq!(store.load_criteria(ViewKind::Problems, "Admin").unwrap(), criteria);

    let book = store.read_book().unwrap();
    assert!(book.get(ViewKind::Problems, "Admin").unwrap().updated_at.is_some());
}

#[test]
fn new_criteria_clear_a_persisted_selection() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = JsonProfileStore::new(dir.path().join("profiles.json"));
    let mut selection = SelectionState::new();
    selection.set(DimensionKey::Host, "h1");
    store.save_selection(ViewKind::Latest, "Admin", &selection).unwrap();

    let criteria = FilterCriteria {
        name: Some("disk".to_string()),
        ..Default::default()
    };
    assert!(store.save_criteria(ViewKind::Latest, "Admin", &criteria).unwrap());
    assert!(store.load_selection(ViewKind::Latest, "Admin").unwrap().is_empty());
}

#[test]
fn malformed_profile_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("profiles.json");
    fs::write(&path, "{ not json").unwrap();

    let store = JsonProfileStore::new(path.clone());
    let err = store.load_selection(ViewKind::Latest, "Admin").unwrap_err();
    assert!(matches!(err, SubfilterError::Json { .. }));
    // The broken file is left for the user to inspect.
    assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
}

#[test]
fn empty_profile_file_reads_as_no_profiles() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("profiles.json");
    fs::write(&path, "\n").unwrap();
    let store = JsonProfileStore::new(path.clone());
    assert!(store.read_book().unwrap().profiles.is_empty());
}

// ---------------------------------------------------------------------------
// Audit log
// ---------------------------------------------------------------------------

#[test]
fn selection_changes_are_logged_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = open(dir.path());
    let ctx = admin();

    engine.set(&ctx, ViewKind::Latest, DimensionKey::Host, "h1").unwrap();
    // No-op changes are not logged.
    engine.set(&ctx, ViewKind::Latest, DimensionKey::Host, "h1").unwrap();
    engine.unset(&ctx, ViewKind::Latest, &DimensionKey::Host, "h1").unwrap();
    engine.clear(&ctx, ViewKind::Latest).unwrap();

    let entries = engine.audit().read_all();
    let actions: Vec<AuditAction> = entries.iter().map(|e| e.action).collect();
    assert_eq!(actions, vec![AuditAction::Set, AuditAction::Unset, AuditAction::Clear]);
    assert_eq!(entries[0].dimension.as_deref(), Some("host"));
    assert_eq!(entries[0].value.as_deref(), Some("h1"));
    assert_eq!(entries[0].view, ViewKind::Latest);
}

#[test]
fn read_recent_returns_the_tail() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = open(dir.path());
    let ctx = admin();
    for host in ["h1", "h2", "h3"] {
        engine.set(&ctx, ViewKind::Charts, DimensionKey::Host, host).unwrap();
    }

    let recent = engine.audit().read_recent(2);
    let values: Vec<&str> = recent.iter().filter_map(|e| e.value.as_deref()).collect();
    assert_eq!(values, vec!["h2", "h3"]);
}

#[test]
fn disabled_audit_log_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut engine = SubfilterEngine::new(
        JsonRecordSource::from_records(records()),
        JsonProfileStore::new(dir.path().join("profiles.json")),
        EngineSettings::default(),
    );
    engine.set(&admin(), ViewKind::Latest, DimensionKey::Host, "h1").unwrap();

    assert!(engine.audit().path().is_none());
    assert!(engine.audit().read_all().is_empty());
    assert!(!dir.path().join("selection-log.jsonl").exists());
}
