//! Selection audit log.
//!
//! Every set, unset, clear and criteria change is appended as one JSON line
//! to `~/.subfilter/selection-log.jsonl`. Writes are best-effort: a failing
//! log never blocks a selection change.

use std::fs::{self, OpenOptions, create_dir_all};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::view::ViewKind;

// ---------------------------------------------------------------------------
// Entry
// ---------------------------------------------------------------------------

/// What happened to the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Set,
    Unset,
    Clear,
    /// Selection dropped because the primary filter changed.
    CriteriaChanged,
    /// Selection dropped because nothing matched it.
    Reset,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Set => "set",
            Self::Unset => "unset",
            Self::Clear => "clear",
            Self::CriteriaChanged => "criteria_changed",
            Self::Reset => "reset",
        }
    }
}

/// One line of the selection log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: String,
    pub user: String,
    pub view: ViewKind,
    pub action: AuditAction,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub dimension: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub value: Option<String>,
}

impl AuditEntry {
    pub fn new(user: &str, view: ViewKind, action: AuditAction) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            user: user.to_string(),
            view,
            action,
            dimension: None,
            value: None,
        }
    }

    pub fn with_value(mut self, dimension: impl ToString, value: &str) -> Self {
        self.dimension = Some(dimension.to_string());
        self.value = Some(value.to_string());
        self
    }
}

// ---------------------------------------------------------------------------
// Log
// ---------------------------------------------------------------------------

/// Handle to the JSONL selection log.
#[derive(Debug, Clone, Default)]
pub struct AuditLog {
    path: Option<PathBuf>,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// A log that records nothing.
    pub fn disabled() -> Self {
        Self { path: None }
    }

    /// Log at `~/.subfilter/selection-log.jsonl`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".subfilter").join("selection-log.jsonl"))
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn record(&self, entry: &AuditEntry) {
        let Some(path) = &self.path else {
            return;
        };
        if let Err(e) = append_entry(path, entry) {
            warn!(path = %path.display(), error = %e, "failed to append selection log");
        }
    }

    /// The newest `limit` entries, oldest first. Malformed lines are skipped.
    pub fn read_recent(&self, limit: usize) -> Vec<AuditEntry> {
        let mut entries = self.read_all();
        let excess = entries.len().saturating_sub(limit);
        entries.drain(..excess);
        entries
    }

    pub fn read_all(&self) -> Vec<AuditEntry> {
        let Some(path) = &self.path else {
            return Vec::new();
        };
        let Ok(file) = fs::File::open(path) else {
            return Vec::new();
        };

        BufReader::new(file)
            .lines()
            .map_while(std::io::Result::ok)
            .filter_map(|line| serde_json::from_str::<AuditEntry>(&line).ok())
            .collect()
    }
}

fn append_entry(path: &Path, entry: &AuditEntry) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let json = serde_json::to_string(entry)?;
    writeln!(file, "{json}")?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_log_records_nothing() {
        let log = AuditLog::disabled();
        log.record(&AuditEntry::new("Admin", ViewKind::Latest, AuditAction::Clear));
        assert!(log.read_all().is_empty());
    }

    #[test]
    fn appends_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path().join("logs").join("selection-log.jsonl"));

        log.record(&AuditEntry::new("Admin", ViewKind::Latest, AuditAction::Set).with_value("host", "10084"));
        log.record(&AuditEntry::new("Admin", ViewKind::Latest, AuditAction::Clear));

        let entries = log.read_all();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, AuditAction::Set);
        assert_eq!(entries[0].dimension.as_deref(), Some("host"));
        assert_eq!(entries[1].value, None);
    }

    #[test]
    fn read_recent_keeps_newest() {
        let dir = tempfile::tempdir().unwrap();
        let log = AuditLog::new(dir.path().join("selection-log.jsonl"));
        for value in ["a", "b", "c"] {
            log.record(&AuditEntry::new("Admin", ViewKind::Hosts, AuditAction::Set).with_value("tag", value));
        }

        let recent = log.read_recent(2);
        let values: Vec<_> = recent.iter().filter_map(|e| e.value.as_deref()).collect();
        assert_eq!(values, vec!["b", "c"]);
    }

    #[test]
    fn skips_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selection-log.jsonl");
        fs::write(&path, "garbage\n").unwrap();
        let log = AuditLog::new(&path);
        log.record(&AuditEntry::new("Admin", ViewKind::Items, AuditAction::Reset));
        assert_eq!(log.read_all().len(), 1);
    }
}
