/// Configuration schema and defaults for subfilter.
///
/// Sections: `[general]`, `[display]`, `[selection]`, `[source]`, `[store]`,
/// `[server]` and `[logging]`. Every field has a built-in default.
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::engine::{EngineSettings, RenderOptions};
use crate::view::{UserKind, ViewKind};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Maps to `~/.subfilter/config.toml` and `.subfilter.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubfilterConfig {
    pub general: GeneralConfig,
    pub display: DisplayConfig,
    pub selection: SelectionConfig,
    pub source: SourceConfig,
    pub store: StoreConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

impl SubfilterConfig {
    /// Engine settings derived from `[display]` and `[selection]`.
    pub fn engine_settings(&self) -> EngineSettings {
        let cap = |n: usize| (n > 0).then_some(n);
        EngineSettings {
            render: RenderOptions {
                min_distinct_values: self.display.min_distinct_values,
                empty_label: self.display.empty_label.clone(),
                ellipsis: self.display.ellipsis.clone(),
            },
            tag_value_cap: cap(self.display.tag_value_cap),
            value_cap: cap(self.display.value_cap),
            sort_by_name: self.display.sort_by_name,
            reset_when_nothing_matches: self.selection.reset_when_nothing_matches,
        }
    }
}

// ---------------------------------------------------------------------------
// [general]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Profile owner for CLI and dashboard requests.
    pub user: String,
    pub user_kind: UserKind,
    pub default_view: ViewKind,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            user: "Admin".to_string(),
            user_kind: UserKind::SuperAdmin,
            default_view: ViewKind::Latest,
        }
    }
}

// ---------------------------------------------------------------------------
// [display]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Values shown per tag-value dimension before the ellipsis; `0` shows all.
    pub tag_value_cap: usize,
    /// Same for every other dimension.
    pub value_cap: usize,
    /// Dimensions with fewer values and no selection are hidden.
    pub min_distinct_values: usize,
    pub empty_label: String,
    pub ellipsis: String,
    /// Order values by name instead of first appearance.
    pub sort_by_name: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            tag_value_cap: 5,
            value_cap: 0,
            min_distinct_values: 2,
            empty_label: "None".to_string(),
            ellipsis: "...".to_string(),
            sort_by_name: false,
        }
    }
}

// ---------------------------------------------------------------------------
// [selection]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub reset_when_nothing_matches: bool,
}

// ---------------------------------------------------------------------------
// [source] / [store]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// JSON array of records. `~` is expanded to the home directory.
    pub records_path: String,
}

impl SourceConfig {
    pub fn resolved_path(&self) -> Option<PathBuf> {
        (!self.records_path.is_empty()).then(|| expand_tilde(&self.records_path))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub profiles_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            profiles_path: "~/.subfilter/profiles.json".to_string(),
        }
    }
}

impl StoreConfig {
    pub fn resolved_path(&self) -> PathBuf {
        expand_tilde(&self.profiles_path)
    }
}

// ---------------------------------------------------------------------------
// [server]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:9747".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// [logging]
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Whether selection changes are written to the audit log.
    pub enabled: bool,
    /// Audit log path. `~` is expanded to the home directory.
    pub path: String,
    /// Diagnostic level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "~/.subfilter/selection-log.jsonl".to_string(),
            level: "warn".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn resolved_path(&self) -> PathBuf {
        expand_tilde(&self.path)
    }
}

/// Expand a leading `~` to the home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    match path.strip_prefix("~/").or_else(|| path.strip_prefix('~')) {
        Some(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => PathBuf::from(path),
        },
        None => PathBuf::from(path),
    }
}

// ---------------------------------------------------------------------------
// Default TOML
// ---------------------------------------------------------------------------

impl SubfilterConfig {
    /// Annotated default config written by `subfilter config init`.
    pub fn default_toml() -> String {
        r#"# subfilter configuration
#
# Configuration hierarchy (highest precedence wins):
#   1. Environment variables (SUBFILTER_*)
#   2. Project config (.subfilter.toml in current directory)
#   3. User global config (~/.subfilter/config.toml)
#   4. Built-in defaults

[general]
user = "Admin"
user_kind = "super-admin"     # user | admin | super-admin
default_view = "latest"       # latest | charts | items | hosts | problems

[display]
tag_value_cap = 5             # 0 shows every value
value_cap = 0
min_distinct_values = 2       # hide dimensions with fewer values (unless selected)
empty_label = "None"
ellipsis = "..."
sort_by_name = false

[selection]
reset_when_nothing_matches = false

[source]
records_path = ""             # JSON array of records

[store]
profiles_path = "~/.subfilter/profiles.json"

[server]
addr = "127.0.0.1:9747"

[logging]
enabled = true
path = "~/.subfilter/selection-log.jsonl"
level = "warn"                # SUBFILTER_LOG overrides
"#
        .to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_toml_parses_back_to_defaults() {
        let config: SubfilterConfig = toml::from_str(&SubfilterConfig::default_toml()).unwrap();
        assert_eq!(config, SubfilterConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config: SubfilterConfig = toml::from_str("[display]\ntag_value_cap = 3\n").unwrap();
        assert_eq!(config.display.tag_value_cap, 3);
        assert_eq!(config.display.min_distinct_values, 2);
        assert_eq!(config.general.user, "Admin");
    }

    #[test]
    fn zero_cap_means_unlimited() {
        let mut config = SubfilterConfig::default();
        config.display.tag_value_cap = 0;
        let settings = config.engine_settings();
        assert_eq!(settings.tag_value_cap, None);
        assert_eq!(settings.value_cap, None);
    }

    #[test]
    fn engine_settings_follow_display_section() {
        let mut config = SubfilterConfig::default();
        config.display.empty_label = "(empty)".to_string();
        config.selection.reset_when_nothing_matches = true;
        let settings = config.engine_settings();
        assert_eq!(settings.render.empty_label, "(empty)");
        assert_eq!(settings.tag_value_cap, Some(5));
        assert!(settings.reset_when_nothing_matches);
    }

    #[test]
    fn expand_tilde_joins_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/.subfilter/x.json"), home.join(".subfilter/x.json"));
        }
        assert_eq!(expand_tilde("/tmp/x.json"), PathBuf::from("/tmp/x.json"));
    }

    #[test]
    fn empty_records_path_is_unset() {
        assert_eq!(SourceConfig::default().resolved_path(), None);
    }
}
