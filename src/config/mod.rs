/// Configuration system for subfilter.
///
/// Provides a layered configuration hierarchy:
///
/// 1. **Built-in defaults**: [`schema::SubfilterConfig::default()`]
/// 2. **User global config**: `~/.subfilter/config.toml`
/// 3. **Project local config**: `.subfilter.toml` in the current directory
/// 4. **Environment variables**: `SUBFILTER_*` overrides (highest precedence)
///
/// # Usage
///
/// ```rust,ignore
/// use subfilter::config;
///
/// let cfg = config::load();
/// let settings = cfg.engine_settings();
/// ```
pub mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;

pub use schema::SubfilterConfig;

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved configuration: defaults → global TOML → project
/// TOML → env vars.
pub fn load() -> SubfilterConfig {
    let layers = [global_config_path(), project_config_path()];
    let mut config = load_layers(layers.into_iter().flatten());
    apply_env_overrides(&mut config);
    config
}

/// Merge TOML layers key by key, later files winning, then deserialize once
/// over the built-in defaults.
fn load_layers(paths: impl IntoIterator<Item = PathBuf>) -> SubfilterConfig {
    let mut merged = toml::Value::Table(toml::Table::new());
    for path in paths {
        if let Some(layer) = load_toml_layer(&path) {
            merge_values(&mut merged, layer);
        }
    }

    match merged.try_into() {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "merged config is invalid; using defaults");
            SubfilterConfig::default()
        }
    }
}

/// Read one TOML layer. Missing files yield `None`; malformed ones are
/// reported and skipped.
fn load_toml_layer(path: &Path) -> Option<toml::Value> {
    let content = fs::read_to_string(path).ok()?;
    let layer = toml::from_str::<toml::Value>(&content)
        .map_err(|e| e.to_string())
        .and_then(|value| {
            value
                .clone()
                .try_into::<SubfilterConfig>()
                .map(|_| value)
                .map_err(|e| e.to_string())
        });
    match layer {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring malformed config file");
            None
        }
    }
}

/// Overlay `layer` onto `base`: tables merge recursively, anything else
/// replaces.
fn merge_values(base: &mut toml::Value, layer: toml::Value) {
    match (base, layer) {
        (toml::Value::Table(base), toml::Value::Table(layer)) => {
            for (key, value) in layer {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, layer) => *base = layer,
    }
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".subfilter").join("config.toml"))
}

fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".subfilter.toml"))
}

pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Supported variables:
/// - `SUBFILTER_USER`, `SUBFILTER_USER_KIND`, `SUBFILTER_VIEW`
/// - `SUBFILTER_RECORDS`: record export path
/// - `SUBFILTER_PROFILES`: profile store path
/// - `SUBFILTER_ADDR`: dashboard bind address
/// - `SUBFILTER_TAG_VALUE_CAP`: values per tag-value dimension
/// - `SUBFILTER_RESET_WHEN_NOTHING_MATCHES`
/// - `SUBFILTER_AUDIT`: audit log on/off
fn apply_env_overrides(config: &mut SubfilterConfig) {
    apply_overrides(config, |key| std::env::var(key).ok());
}

fn apply_overrides(config: &mut SubfilterConfig, var: impl Fn(&str) -> Option<String>) {
    if let Some(val) = var("SUBFILTER_USER")
        && !val.is_empty()
    {
        config.general.user = val;
    }
    if let Some(val) = var("SUBFILTER_USER_KIND")
        && let Ok(kind) = val.parse()
    {
        config.general.user_kind = kind;
    }
    if let Some(val) = var("SUBFILTER_VIEW")
        && let Ok(view) = val.parse()
    {
        config.general.default_view = view;
    }
    if let Some(val) = var("SUBFILTER_RECORDS")
        && !val.is_empty()
    {
        config.source.records_path = val;
    }
    if let Some(val) = var("SUBFILTER_PROFILES")
        && !val.is_empty()
    {
        config.store.profiles_path = val;
    }
    if let Some(val) = var("SUBFILTER_ADDR")
        && !val.is_empty()
    {
        config.server.addr = val;
    }
    if let Some(val) = var("SUBFILTER_TAG_VALUE_CAP")
        && let Ok(cap) = val.parse::<usize>()
    {
        config.display.tag_value_cap = cap;
    }
    if let Some(val) = var("SUBFILTER_RESET_WHEN_NOTHING_MATCHES") {
        config.selection.reset_when_nothing_matches = is_truthy(&val);
    }
    if let Some(val) = var("SUBFILTER_AUDIT") {
        config.logging.enabled = is_truthy(&val);
    }
}

fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// ---------------------------------------------------------------------------
// Config init / set / reset
// ---------------------------------------------------------------------------

/// Write the default annotated config to `~/.subfilter/config.toml`.
///
/// Fails if the file exists, unless `force` is set.
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create ~/.subfilter/ directory")?;
    }

    fs::write(&path, SubfilterConfig::default_toml()).context("failed to write config file")?;

    Ok(path)
}

/// Set one dotted key (e.g. `display.tag_value_cap`) in the global config
/// file, starting from defaults if the file does not exist yet.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;

    let content = if path.exists() {
        fs::read_to_string(&path).context("failed to read config file")?
    } else {
        toml::to_string_pretty(&SubfilterConfig::default())
            .context("failed to serialize default config")?
    };

    let mut root: toml::Value =
        toml::from_str(&content).context("failed to parse config as TOML value")?;
    set_toml_value(&mut root, key, value)?;

    let output = toml::to_string_pretty(&root).context("failed to serialize updated config")?;
    let _: SubfilterConfig = toml::from_str(&output)
        .with_context(|| format!("invalid value '{value}' for '{key}'"))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(&path, output).context("failed to write config file")?;

    Ok(())
}

/// Set a value in a TOML tree by dotted key, keeping the existing type.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let Some((sections, leaf)) = key.rsplit_once('.') else {
        anyhow::bail!("config key must be SECTION.KEY, got '{key}'");
    };

    let mut current = root;
    for part in sections.split('.') {
        current = current
            .get_mut(part)
            .with_context(|| format!("config key not found: section '{part}' in '{key}'"))?;
    }

    let table = current
        .as_table_mut()
        .with_context(|| format!("expected table at '{sections}'"))?;

    let new_value = match table.get(leaf) {
        Some(toml::Value::Boolean(_)) => toml::Value::Boolean(is_truthy(raw_value)),
        Some(toml::Value::Integer(_)) => {
            let n: i64 = raw_value
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
            toml::Value::Integer(n)
        }
        Some(_) => toml::Value::String(raw_value.to_string()),
        None => anyhow::bail!("config key not found: '{key}'"),
    };

    table.insert(leaf.to_string(), new_value);
    Ok(())
}

/// Reset the global config to defaults.
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// The effective config as TOML.
pub fn show_effective_config() -> Result<String> {
    let config = load();
    toml::to_string_pretty(&config).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::view::{UserKind, ViewKind};

    fn overrides(pairs: &[(&str, &str)]) -> SubfilterConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let mut config = SubfilterConfig::default();
        apply_overrides(&mut config, |key| vars.get(key).cloned());
        config
    }

    #[test]
    fn is_truthy_accepts_variants() {
        for yes in ["1", "true", "TRUE", "yes", "on"] {
            assert!(is_truthy(yes));
        }
        for no in ["0", "false", "no", "off", ""] {
            assert!(!is_truthy(no));
        }
    }

    #[test]
    fn env_overrides_apply() {
        let config = overrides(&[
            ("SUBFILTER_USER", "guest"),
            ("SUBFILTER_USER_KIND", "user"),
            ("SUBFILTER_VIEW", "problems"),
            ("SUBFILTER_TAG_VALUE_CAP", "10"),
            ("SUBFILTER_RESET_WHEN_NOTHING_MATCHES", "yes"),
        ]);
        assert_eq!(config.general.user, "guest");
        assert_eq!(config.general.user_kind, UserKind::User);
        assert_eq!(config.general.default_view, ViewKind::Problems);
        assert_eq!(config.display.tag_value_cap, 10);
        assert!(config.selection.reset_when_nothing_matches);
    }

    #[test]
    fn invalid_env_values_are_ignored() {
        let config = overrides(&[("SUBFILTER_VIEW", "dashboards"), ("SUBFILTER_TAG_VALUE_CAP", "many")]);
        assert_eq!(config.general.default_view, ViewKind::Latest);
        assert_eq!(config.display.tag_value_cap, 5);
    }

    #[test]
    fn set_toml_value_keeps_types() {
        let mut root: toml::Value = toml::from_str(
            "[display]\ntag_value_cap = 5\nsort_by_name = false\nempty_label = \"None\"\n",
        )
        .unwrap();
        set_toml_value(&mut root, "display.tag_value_cap", "8").unwrap();
        set_toml_value(&mut root, "display.sort_by_name", "on").unwrap();
        set_toml_value(&mut root, "display.empty_label", "-").unwrap();

        let display = root["display"].as_table().unwrap();
        assert_eq!(display["tag_value_cap"].as_integer(), Some(8));
        assert_eq!(display["sort_by_name"].as_bool(), Some(true));
        assert_eq!(display["empty_label"].as_str(), Some("-"));
    }

    #[test]
    fn set_toml_value_rejects_unknown_keys() {
        let mut root: toml::Value = toml::from_str("[display]\ntag_value_cap = 5\n").unwrap();
        assert!(set_toml_value(&mut root, "nonexistent.key", "1").is_err());
        assert!(set_toml_value(&mut root, "display.nope", "1").is_err());
        assert!(set_toml_value(&mut root, "display", "1").is_err());
        assert!(set_toml_value(&mut root, "display.tag_value_cap", "lots").is_err());
    }

    #[test]
    fn project_layer_keeps_global_settings() {
        let dir = tempfile::tempdir().unwrap();
        let global = dir.path().join("config.toml");
        let project = dir.path().join(".subfilter.toml");
        fs::write(&global, "[display]\ntag_value_cap = 10\n\n[general]\nuser = \"ops\"\n").unwrap();
        fs::write(&project, "[server]\naddr = \"0.0.0.0:1\"\n\n[general]\ndefault_view = \"problems\"\n").unwrap();

        let config = load_layers([global, project]);
        assert_eq!(config.server.addr, "0.0.0.0:1");
        assert_eq!(config.display.tag_value_cap, 10);
        assert_eq!(config.general.user, "ops");
        assert_eq!(config.general.default_view, ViewKind::Problems);
        assert_eq!(config.display.min_distinct_values, 2);
    }

    #[test]
    fn later_layer_overrides_same_key() {
        let dir = tempfile::tempdir().unwrap();
        let global = dir.path().join("config.toml");
        let project = dir.path().join(".subfilter.toml");
        fs::write(&global, "[display]\ntag_value_cap = 10\nsort_by_name = true\n").unwrap();
        fs::write(&project, "[display]\ntag_value_cap = 3\n").unwrap();

        let config = load_layers([global, project]);
        assert_eq!(config.display.tag_value_cap, 3);
        assert!(config.display.sort_by_name);
    }

    #[test]
    fn malformed_layer_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let global = dir.path().join("config.toml");
        let project = dir.path().join(".subfilter.toml");
        fs::write(&global, "[display]\ntag_value_cap = 10\n").unwrap();
        fs::write(&project, "[display]\ntag_value_cap = \"lots\"\n").unwrap();

        let config = load_layers([global, project, dir.path().join("missing.toml")]);
        assert_eq!(config.display.tag_value_cap, 10);
    }

    #[test]
    fn show_effective_config_round_trips() {
        let toml_str = show_effective_config().unwrap();
        let _: SubfilterConfig = toml::from_str(&toml_str).unwrap();
    }
}
