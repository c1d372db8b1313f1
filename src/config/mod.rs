/// Configuration system for minerdash.
///
/// Provides a layered configuration hierarchy:
///
/// 1. **Built-in defaults**: [`schema::MinerdashConfig::default()`]
/// 2. **User global config**: `~/.minerdash/config.toml`
/// 3. **Project local config**: `.minerdash.toml` in the current directory
/// 4. **Environment variables**: `MINERDASH_*` overrides (highest precedence)
///
/// File layers are merged key by key, so a file only needs the keys it
/// changes and never resets keys set by a lower layer.
pub mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub use schema::MinerdashConfig;

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved configuration.
///
/// Merges all layers in order: defaults → global TOML → project TOML → env
/// vars.
pub fn load() -> MinerdashConfig {
    let mut config = load_layers(&[global_config_path(), project_config_path()]);
    apply_env_overrides(&mut config);
    config
}

/// Merge TOML files over the defaults, lowest precedence first.
///
/// A missing, unparseable or ill-typed file is skipped on its own; the
/// other layers still apply.
fn load_layers(paths: &[Option<PathBuf>]) -> MinerdashConfig {
    let Ok(mut merged) = toml::Value::try_from(MinerdashConfig::default()) else {
        return MinerdashConfig::default();
    };

    for layer in paths.iter().flatten().filter_map(|path| read_layer(path)) {
        merge_toml(&mut merged, layer);
    }

    merged.try_into().unwrap_or_default()
}

/// Read one config file as a TOML tree, if it exists and fits the schema.
fn read_layer(path: &Path) -> Option<toml::Value> {
    let content = fs::read_to_string(path).ok()?;
    toml::from_str::<MinerdashConfig>(&content).ok()?;
    toml::from_str(&content).ok()
}

/// Deep-merge `overlay` into `base`. Tables merge per key; anything else in
/// `overlay` replaces the value in `base`.
fn merge_toml(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// Directory holding the global config and the activity log.
pub fn data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".minerdash"))
}

fn global_config_path() -> Option<PathBuf> {
    data_dir().map(|dir| dir.join("config.toml"))
}

fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".minerdash.toml"))
}

/// Return the path to the global config file for display/init purposes.
pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

/// Return the path to the project config file for display purposes.
pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides (highest precedence layer).
///
/// Supported variables:
/// - `MINERDASH_URL`: backend base URL
/// - `MINERDASH_POLL_MS`: stats refresh period
/// - `MINERDASH_TIMEOUT_MS`: stats/health request timeout
/// - `MINERDASH_CHAT_TIMEOUT_MS`: chat request timeout (`0` = none)
/// - `MINERDASH_MAX_MESSAGE_CHARS`: longest chat message sent
/// - `MINERDASH_LOG`: activity log on/off (`1`/`true`/`yes`/`on`)
pub(crate) fn apply_env_overrides(config: &mut MinerdashConfig) {
    if let Ok(val) = std::env::var("MINERDASH_URL")
        && !val.trim().is_empty()
    {
        config.backend.base_url = val.trim().to_string();
    }
    if let Ok(val) = std::env::var("MINERDASH_POLL_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.poller.interval_ms = ms;
    }
    if let Ok(val) = std::env::var("MINERDASH_TIMEOUT_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.backend.request_timeout_ms = ms;
    }
    if let Ok(val) = std::env::var("MINERDASH_CHAT_TIMEOUT_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.backend.chat_timeout_ms = ms;
    }
    if let Ok(val) = std::env::var("MINERDASH_MAX_MESSAGE_CHARS")
        && let Ok(chars) = val.parse::<usize>()
    {
        config.chat.max_message_chars = chars;
    }
    if let Ok(val) = std::env::var("MINERDASH_LOG") {
        config.logging.enabled = is_truthy(&val);
    }
}

/// Check if a string value represents a truthy boolean.
fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// ---------------------------------------------------------------------------
// Config init / set / reset
// ---------------------------------------------------------------------------

/// Write the default annotated config to `~/.minerdash/config.toml`.
///
/// Returns an error if the file already exists and `force` is not set.
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create ~/.minerdash/ directory")?;
    }

    fs::write(&path, MinerdashConfig::default_toml()).context("failed to write config file")?;

    Ok(path)
}

/// Set a single dotted config key (e.g. `poller.interval_ms`) in the global
/// config file, creating the file from defaults if needed.
pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let path = global_config_path().context("could not determine home directory")?;

    let content = if path.exists() {
        fs::read_to_string(&path).context("failed to read config file")?
    } else {
        toml::to_string_pretty(&MinerdashConfig::default())
            .context("failed to serialize default config")?
    };

    let mut root: toml::Value =
        toml::from_str(&content).context("failed to parse config as TOML value")?;
    set_toml_value(&mut root, key, value)?;

    // Reject edits that no longer deserialize into the schema.
    let updated = toml::to_string_pretty(&root).context("failed to serialize config")?;
    toml::from_str::<MinerdashConfig>(&updated)
        .with_context(|| format!("invalid value for '{key}': {value}"))?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(&path, updated).context("failed to write config file")?;

    Ok(())
}

/// Set a value in a TOML value tree using a dotted key path.
///
/// The type of the existing value decides how `raw_value` is parsed.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let Some((section_path, leaf)) = key.rsplit_once('.') else {
        anyhow::bail!("config key must look like 'section.key', got '{key}'");
    };

    let mut current = root;
    for part in section_path.split('.') {
        current = current
            .get_mut(part)
            .with_context(|| format!("config key not found: section '{part}' in '{key}'"))?;
    }

    let table = current
        .as_table_mut()
        .with_context(|| format!("expected table at '{section_path}'"))?;

    let new_value = match table.get(leaf) {
        Some(toml::Value::Boolean(_)) => toml::Value::Boolean(is_truthy(raw_value)),
        Some(toml::Value::Integer(_)) => {
            let n: i64 = raw_value
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
            toml::Value::Integer(n)
        }
        Some(toml::Value::Float(_)) => {
            let f: f64 = raw_value
                .parse()
                .with_context(|| format!("expected float for '{key}', got '{raw_value}'"))?;
            toml::Value::Float(f)
        }
        Some(_) => toml::Value::String(raw_value.to_string()),
        None => anyhow::bail!("unknown config key '{key}'"),
    };

    table.insert(leaf.to_string(), new_value);
    Ok(())
}

/// Reset the global config to defaults (overwrite the file).
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// Show the effective (fully resolved) config as TOML.
pub fn show_effective_config() -> Result<String> {
    let config = load();
    toml::to_string_pretty(&config).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
