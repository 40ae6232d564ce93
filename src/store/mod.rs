//! Filter profile store.
//!
//! Each `(view, user)` pair owns one profile: the primary filter criteria and
//! the subfilter selection. Replacing the criteria clears the selection.
//!
//! [`JsonProfileStore`] keeps every profile in one JSON file
//! (`~/.subfilter/profiles.json` by default). A missing file reads as empty;
//! a malformed one is an error, never silently reset.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::selection::SelectionState;
use crate::error::{Result, SubfilterError};
use crate::filter::FilterCriteria;
use crate::view::ViewKind;

// ---------------------------------------------------------------------------
// Store contract
// ---------------------------------------------------------------------------

/// Key-value persistence for per-user, per-view filter profiles.
pub trait ProfileStore {
    fn load_selection(&self, view: ViewKind, user: &str) -> Result<SelectionState>;

    fn save_selection(&mut self, view: ViewKind, user: &str, selection: &SelectionState) -> Result<()>;

    fn load_criteria(&self, view: ViewKind, user: &str) -> Result<FilterCriteria>;

    /// Store new criteria. Returns `true` if they differ from the stored
    /// ones, in which case the selection has been cleared.
    fn save_criteria(&mut self, view: ViewKind, user: &str, criteria: &FilterCriteria) -> Result<bool>;
}

// ---------------------------------------------------------------------------
// Profile book
// ---------------------------------------------------------------------------

/// Stored state of one view for one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewProfile {
    pub criteria: FilterCriteria,
    pub selection: SelectionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Every stored profile, keyed by `user/view`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileBook {
    pub profiles: BTreeMap<String, ViewProfile>,
}

impl ProfileBook {
    fn key(view: ViewKind, user: &str) -> String {
        format!("{user}/{view}")
    }

    pub fn get(&self, view: ViewKind, user: &str) -> Option<&ViewProfile> {
        self.profiles.get(&Self::key(view, user))
    }

    fn entry(&mut self, view: ViewKind, user: &str) -> &mut ViewProfile {
        let profile = self.profiles.entry(Self::key(view, user)).or_default();
        profile.updated_at = Some(Utc::now());
        profile
    }

    fn selection(&self, view: ViewKind, user: &str) -> SelectionState {
        self.get(view, user)
            .map(|p| p.selection.clone())
            .unwrap_or_default()
    }

    fn criteria(&self, view: ViewKind, user: &str) -> FilterCriteria {
        self.get(view, user)
            .map(|p| p.criteria.clone())
            .unwrap_or_default()
    }

    fn set_selection(&mut self, view: ViewKind, user: &str, selection: &SelectionState) {
        self.entry(view, user).selection = selection.clone();
    }

    fn set_criteria(&mut self, view: ViewKind, user: &str, criteria: &FilterCriteria) -> bool {
        if self.get(view, user).is_some_and(|p| &p.criteria == criteria) {
            return false;
        }
        let profile = self.entry(view, user);
        profile.criteria = criteria.clone();
        profile.selection.clear();
        true
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Process-local store, used by tests and one-shot renders.
#[derive(Debug, Clone, Default)]
pub struct MemoryProfileStore {
    book: ProfileBook,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileStore for MemoryProfileStore {
    fn load_selection(&self, view: ViewKind, user: &str) -> Result<SelectionState> {
        Ok(self.book.selection(view, user))
    }

    fn save_selection(&mut self, view: ViewKind, user: &str, selection: &SelectionState) -> Result<()> {
        self.book.set_selection(view, user, selection);
        Ok(())
    }

    fn load_criteria(&self, view: ViewKind, user: &str) -> Result<FilterCriteria> {
        Ok(self.book.criteria(view, user))
    }

    fn save_criteria(&mut self, view: ViewKind, user: &str, criteria: &FilterCriteria) -> Result<bool> {
        Ok(self.book.set_criteria(view, user, criteria))
    }
}

// ---------------------------------------------------------------------------
// File-backed store
// ---------------------------------------------------------------------------

/// Profiles persisted to a JSON file; re-read on every load so separate
/// processes see each other's writes.
#[derive(Debug, Clone)]
pub struct JsonProfileStore {
    path: PathBuf,
}

impl JsonProfileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `~/.subfilter/profiles.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".subfilter").join("profiles.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_book(&self) -> Result<ProfileBook> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ProfileBook::default()),
            Err(e) => return Err(SubfilterError::io(&self.path, e)),
        };
        if content.trim().is_empty() {
            return Ok(ProfileBook::default());
        }
        serde_json::from_str(&content).map_err(|e| SubfilterError::json(&self.path, e))
    }

    fn write_book(&self, book: &ProfileBook) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| SubfilterError::io(parent, e))?;
        }
        let json = serde_json::to_string_pretty(book).map_err(|e| SubfilterError::json(&self.path, e))?;
        fs::write(&self.path, json).map_err(|e| SubfilterError::io(&self.path, e))?;
        debug!(path = %self.path.display(), profiles = book.profiles.len(), "saved profiles");
        Ok(())
    }
}

impl ProfileStore for JsonProfileStore {
    fn load_selection(&self, view: ViewKind, user: &str) -> Result<SelectionState> {
        Ok(self.read_book()?.selection(view, user))
    }

    fn save_selection(&mut self, view: ViewKind, user: &str, selection: &SelectionState) -> Result<()> {
        let mut book = self.read_book()?;
        book.set_selection(view, user, selection);
        self.write_book(&book)
    }

    fn load_criteria(&self, view: ViewKind, user: &str) -> Result<FilterCriteria> {
        Ok(self.read_book()?.criteria(view, user))
    }

    fn save_criteria(&mut self, view: ViewKind, user: &str, criteria: &FilterCriteria) -> Result<bool> {
        let mut book = self.read_book()?;
        let changed = book.set_criteria(view, user, criteria);
        if changed {
            self.write_book(&book)?;
        }
        Ok(changed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::dimension::DimensionKey;

    fn selection() -> SelectionState {
        let mut s = SelectionState::new();
        s.set(DimensionKey::Host, "10084");
        s
    }

    #[test]
    fn memory_store_is_scoped_by_view_and_user() {
        let mut store = MemoryProfileStore::new();
        store.save_selection(ViewKind::Latest, "Admin", &selection()).unwrap();

        assert_eq!(store.load_selection(ViewKind::Latest, "Admin").unwrap(), selection());
        assert!(store.load_selection(ViewKind::Charts, "Admin").unwrap().is_empty());
        assert!(store.load_selection(ViewKind::Latest, "guest").unwrap().is_empty());
    }

    #[test]
    fn changing_criteria_clears_selection() {
        let mut store = MemoryProfileStore::new();
        store.save_selection(ViewKind::Items, "Admin", &selection()).unwrap();

        let criteria = FilterCriteria {
            name: Some("cpu".to_string()),
            ..Default::default()
        };
        assert!(store.save_criteria(ViewKind::Items, "Admin", &criteria).unwrap());
        assert!(store.load_selection(ViewKind::Items, "Admin").unwrap().is_empty());
        assert_eq!(store.load_criteria(ViewKind::Items, "Admin").unwrap(), criteria);
    }

    #[test]
    fn saving_identical_criteria_keeps_selection() {
        let mut store = MemoryProfileStore::new();
        store.save_selection(ViewKind::Items, "Admin", &selection()).unwrap();
        assert!(!store.save_criteria(ViewKind::Items, "Admin", &FilterCriteria::default()).unwrap());
        assert_eq!(store.load_selection(ViewKind::Items, "Admin").unwrap(), selection());
    }

    #[test]
    fn json_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonProfileStore::new(dir.path().join("nested").join("profiles.json"));
        assert!(store.load_selection(ViewKind::Latest, "Admin").unwrap().is_empty());
    }

    #[test]
    fn json_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("profiles.json");

        let mut store = JsonProfileStore::new(&path);
        store.save_selection(ViewKind::Latest, "Admin", &selection()).unwrap();

        let reopened = JsonProfileStore::new(&path);
        assert_eq!(reopened.load_selection(ViewKind::Latest, "Admin").unwrap(), selection());
        let book = reopened.read_book().unwrap();
        assert!(book.get(ViewKind::Latest, "Admin").unwrap().updated_at.is_some());
    }

    #[test]
    fn json_store_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.json");
        fs::write(&path, "{ not json").unwrap();

        let store = JsonProfileStore::new(&path);
        let err = store.load_selection(ViewKind::Latest, "Admin").unwrap_err();
        assert!(matches!(err, SubfilterError::Json { .. }));
    }
}
