//! Export configuration.
//!
//! Handles loading, validating, and fingerprinting `config.toml`. The file
//! lives in the source root and is optional: stock defaults are used for
//! every key it leaves out.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! site_name = "Notes"       # Shown in page titles and the navigation bundle
//! incremental = true        # Skip unchanged inputs when a previous export exists
//! assets_dir = "assets"     # Copied verbatim into the site (fonts, favicons)
//! exclude = []              # Source path prefixes that are never exported
//!
//! [icons]
//! enabled = true
//! default_page = "file-text"
//! default_attachment = "paperclip"
//! default_folder = "folder"
//!
//! [icons.overrides]         # Per-path icon names, consulted after frontmatter
//! # "projects/roadmap.md" = "map"
//! ```
//!
//! Unknown keys are rejected to catch typos early.
//!
//! ## Fingerprint
//!
//! Settings shape every page, so an export made with different settings
//! can't be patched incrementally. [`ExportConfig::fingerprint`] hashes the
//! effective configuration; the export index stores it and a mismatch
//! forces a full export.

use crate::index::IncrementalPolicy;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Export configuration loaded from `config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    /// Site name used in page titles and the navigation bundle.
    pub site_name: String,
    /// Allow incremental exports. `false` always regenerates everything.
    pub incremental: bool,
    /// Directory (relative to the source root) copied verbatim into the site.
    pub assets_dir: String,
    /// Source path prefixes excluded from export.
    pub exclude: Vec<String>,
    /// Icon display settings.
    pub icons: IconsConfig,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            site_name: "Notes".to_string(),
            incremental: true,
            assets_dir: "assets".to_string(),
            exclude: Vec::new(),
            icons: IconsConfig::default(),
        }
    }
}

/// Icon display settings for the navigation bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IconsConfig {
    /// Resolve and publish icons at all.
    pub enabled: bool,
    /// Fallback icon for rendered documents.
    pub default_page: String,
    /// Fallback icon for attachments.
    pub default_attachment: String,
    /// Fallback icon for folders.
    pub default_folder: String,
    /// Icon names by source path.
    pub overrides: BTreeMap<String, String>,
}

impl Default for IconsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_page: "file-text".to_string(),
            default_attachment: "paperclip".to_string(),
            default_folder: "folder".to_string(),
            overrides: BTreeMap::new(),
        }
    }
}

impl ExportConfig {
    /// Validate config values are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.site_name.trim().is_empty() {
            return Err(ConfigError::Validation("site_name must not be empty".into()));
        }
        if !is_plain_relative(&self.assets_dir) {
            return Err(ConfigError::Validation(
                "assets_dir must be a relative path inside the source root".into(),
            ));
        }
        if self.exclude.iter().any(|e| e.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "exclude entries must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// SHA-256 of the settings that affect output, as a hex string.
    ///
    /// `incremental` itself is left out: turning it off and on again
    /// shouldn't cost an extra full export.
    pub fn fingerprint(&self) -> String {
        let mut shaping = self.clone();
        shaping.incremental = true;
        let mut hasher = Sha256::new();
        hasher.update(b"export-config\0");
        // Serializing plain strings, bools and BTreeMaps cannot fail.
        hasher.update(serde_json::to_vec(&shaping).unwrap_or_default());
        format!("{:x}", hasher.finalize())
    }

    pub fn incremental_policy(&self) -> IncrementalPolicy {
        IncrementalPolicy {
            enabled: self.incremental,
            config_fingerprint: self.fingerprint(),
        }
    }

    /// True if a source path falls under one of the `exclude` prefixes.
    pub fn is_excluded(&self, relative_path: &str) -> bool {
        self.exclude.iter().any(|prefix| {
            let prefix = prefix.trim_matches('/');
            relative_path == prefix
                || relative_path
                    .strip_prefix(prefix)
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }
}

fn is_plain_relative(path: &str) -> bool {
    let p = Path::new(path);
    !path.is_empty() && p.components().all(|c| matches!(c, Component::Normal(_)))
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ExportConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no `config.toml`.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Load config from `config.toml` in the source root.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<ExportConfig, ConfigError> {
    let merged = match load_raw_config(root)? {
        Some(overlay) => merge_toml(stock_defaults_value(), overlay),
        None => stock_defaults_value(),
    };
    let config: ExportConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `config.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# webpage-export configuration
# ============================
# All settings are optional. Values shown below are the defaults.
# Place this file at the root of the folder you export.
# Unknown keys will cause an error.

# Site name, used in page titles and the navigation bundle.
site_name = "Notes"

# Skip documents that haven't changed since the previous export.
# Set to false to regenerate everything on every run.
incremental = true

# Folder copied verbatim into the site (fonts, favicons, images).
assets_dir = "assets"

# Source path prefixes that are never exported.
exclude = []

# ---------------------------------------------------------------------------
# Icons shown next to entries in the navigation tree
# ---------------------------------------------------------------------------
[icons]
enabled = true
default_page = "file-text"
default_attachment = "paperclip"
default_folder = "folder"

# Per-path icon names. Frontmatter `icon` still wins over these.
[icons.overrides]
# "projects/roadmap.md" = "map"
"##
}
