//! Sync configuration.
//!
//! Handles loading, validating, and layering `sync.toml`. Stock defaults are
//! the base layer; a `sync.toml` in the site root (or a file passed with
//! `--config`) is merged on top; environment variables override both.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [notion]
//! database_id = ""            # Overridden by NOTION_DATABASE_ID
//! title_property = "Name"     # Falls back to any property of type "title"
//! type_property = "Type"      # Select/text property holding Home/Page/...
//! api_version = "2022-06-28"  # Notion-Version header
//! page_size = 100             # Results per API request (1-100)
//! max_retries = 3             # Retries on 429 and 5xx responses
//! retry_base_ms = 500         # First retry delay, doubled each attempt
//!
//! [output]
//! home_file = "index.md"      # Where the Home page is written
//! pages_dir = "_pages"        # Where every other page is written
//!
//! [front_matter]
//! layout = "default"          # `layout:` key in every generated file
//!
//! [render]
//! title_heading = false       # Start each body with `# <title>`
//! ```
//!
//! The API token is never read from the file; it comes from `NOTION_TOKEN`.
//!
//! ## Ownership
//!
//! `output.home_file` and `output.pages_dir` define everything the tool owns.
//! Markdown files directly inside `pages_dir`, and the home file, are
//! regenerated or deleted on every run. Nothing else is touched.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Name of the config file looked up in the site root.
pub const CONFIG_FILENAME: &str = "sync.toml";

pub const TOKEN_ENV: &str = "NOTION_TOKEN";
pub const DATABASE_ID_ENV: &str = "NOTION_DATABASE_ID";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Sync configuration loaded from `sync.toml`.
///
/// All fields have defaults. User files need only specify the values they
/// want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    /// Remote database access.
    pub notion: NotionConfig,
    /// Managed output locations.
    pub output: OutputConfig,
    /// Static front matter values.
    pub front_matter: FrontMatterConfig,
    /// Body rendering switches.
    pub render: RenderConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NotionConfig {
    pub database_id: String,
    pub title_property: String,
    pub type_property: String,
    pub api_version: String,
    pub page_size: u32,
    pub max_retries: u32,
    pub retry_base_ms: u64,
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            database_id: String::new(),
            title_property: "Name".to_string(),
            type_property: "Type".to_string(),
            api_version: "2022-06-28".to_string(),
            page_size: 100,
            max_retries: 3,
            retry_base_ms: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub home_file: String,
    pub pages_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            home_file: "index.md".to_string(),
            pages_dir: "_pages".to_string(),
        }
    }
}

impl OutputConfig {
    /// Home file relative to the site root, without `.` components.
    pub fn home_path(&self) -> PathBuf {
        normalized(&self.home_file)
    }

    /// Pages directory relative to the site root, without `.` components.
    pub fn pages_path(&self) -> PathBuf {
        normalized(&self.pages_dir)
    }
}

/// Drop `.` components so `./_pages` and `_pages` name the same managed
/// paths.
fn normalized(value: &str) -> PathBuf {
    Path::new(value)
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FrontMatterConfig {
    pub layout: String,
}

impl Default for FrontMatterConfig {
    fn default() -> Self {
        Self {
            layout: "default".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    pub title_heading: bool,
}

impl SyncConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.notion.page_size) {
            return Err(ConfigError::Validation(
                "notion.page_size must be 1-100".into(),
            ));
        }
        if self.notion.title_property.trim().is_empty() {
            return Err(ConfigError::Validation(
                "notion.title_property must not be empty".into(),
            ));
        }
        validate_relative("output.home_file", &self.output.home_file)?;
        validate_relative("output.pages_dir", &self.output.pages_dir)?;
        if !self.output.home_file.ends_with(".md") {
            return Err(ConfigError::Validation(
                "output.home_file must be a .md file".into(),
            ));
        }
        if self.output.home_path().starts_with(self.output.pages_path()) {
            return Err(ConfigError::Validation(
                "output.home_file must not live inside output.pages_dir".into(),
            ));
        }
        Ok(())
    }

    /// Apply `NOTION_DATABASE_ID` on top of file values.
    pub fn apply_env(&mut self) {
        if let Ok(id) = std::env::var(DATABASE_ID_ENV)
            && !id.trim().is_empty()
        {
            self.notion.database_id = id.trim().to_string();
        }
    }
}

/// Managed paths must stay inside the site root.
fn validate_relative(key: &str, value: &str) -> Result<(), ConfigError> {
    let path = Path::new(value);
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{key} must not be empty")));
    }
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(ConfigError::Validation(format!(
            "{key} must be a relative path inside the site root"
        )));
    }
    if normalized(value).as_os_str().is_empty() {
        return Err(ConfigError::Validation(format!(
            "{key} must name a path below the site root, not the root itself"
        )));
    }
    Ok(())
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SyncConfig::default()).expect("default config must serialize")
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

/// Read a config file as a raw TOML value. `Ok(None)` when it doesn't exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto the stock defaults, then deserialize and
/// validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<SyncConfig, ConfigError> {
    let base = stock_defaults_value();
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SyncConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config for a site.
///
/// Reads `explicit` when given (it must exist), otherwise `sync.toml` in the
/// site root if present. Environment overrides are applied last.
pub fn load_config(site_root: &Path, explicit: Option<&Path>) -> Result<SyncConfig, ConfigError> {
    let overlay = match explicit {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            Some(toml::from_str::<toml::Value>(&content)?)
        }
        None => load_raw_config(&site_root.join(CONFIG_FILENAME))?,
    };
    let mut config = resolve_config(overlay)?;
    config.apply_env();
    Ok(config)
}

/// Read the API token from the environment.
pub fn notion_token() -> Result<String, ConfigError> {
    std::env::var(TOKEN_ENV)
        .ok()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ConfigError::Validation(format!("{TOKEN_ENV} is not set")))
}

/// Returns a fully-commented stock `sync.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# notion-site-sync configuration
# ==============================
# All settings are optional. Values shown below are the defaults.
# Unknown keys cause an error.
#
# The API token is read from the NOTION_TOKEN environment variable only.

[notion]
# Database to mirror. NOTION_DATABASE_ID overrides this value.
database_id = ""
# Property holding the page title. When missing, the first property of
# type "title" is used instead.
title_property = "Name"
# Property holding the page type. "Home" becomes the homepage, "Page"
# appears in navigation, anything else is generated but hidden.
type_property = "Type"
# Notion-Version header sent with every request.
api_version = "2022-06-28"
# Results requested per API call (1-100).
page_size = 100
# Retries on rate limiting (429) and server errors (5xx).
max_retries = 3
# Delay before the first retry in milliseconds; doubles on each attempt.
# A Retry-After header from the API takes precedence.
retry_base_ms = 500

[output]
# Homepage file, relative to the site root.
home_file = "index.md"
# Directory for every other page, relative to the site root.
# Every .md file directly inside it is owned by this tool and is deleted
# when its page disappears from the database.
pages_dir = "_pages"

[front_matter]
# Value of the `layout:` key in every generated file.
layout = "default"

[render]
# Start every page body with a `# <title>` heading.
title_heading = false
"##
}
