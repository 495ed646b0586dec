//! Application configuration for OutputKit.
//!
//! User config lives at `~/.outputkit/outputkit.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{OutputKitError, Result};
use crate::schema::{OutputSchema, SchemaPreset};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "outputkit.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".outputkit";

// ---------------------------------------------------------------------------
// Config structs (matching outputkit.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Validation settings.
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Rendering settings.
    #[serde(default)]
    pub formatter: FormatterConfig,

    /// Consolidation settings.
    #[serde(default)]
    pub aggregation: AggregationConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Default render format.
    #[serde(default = "default_format")]
    pub format: String,

    /// Characters shown in content previews.
    #[serde(default = "default_preview_length")]
    pub preview_length: usize,

    /// Display name for aggregated workflows.
    #[serde(default = "default_workflow_name")]
    pub workflow_name: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            preview_length: default_preview_length(),
            workflow_name: default_workflow_name(),
        }
    }
}

fn default_format() -> String {
    "markdown".into()
}
fn default_preview_length() -> usize {
    100
}
fn default_workflow_name() -> String {
    "Agent Workflow".into()
}

/// `[validation]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Escalate warning-only rule failures to errors.
    #[serde(default)]
    pub strict_mode: bool,

    /// Reference schema applied to every output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<SchemaPreset>,

    /// Optional content-quality rule added to the built-in set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_quality: Option<ContentQualityConfig>,
}

impl ValidationConfig {
    /// Resolve the configured preset into a schema.
    pub fn output_schema(&self) -> Option<OutputSchema> {
        self.schema.map(|preset| preset.schema())
    }
}

/// `[validation.content_quality]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentQualityConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_word_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_word_count: Option<usize>,
    #[serde(default)]
    pub required_keywords: Vec<String>,
    #[serde(default)]
    pub forbidden_words: Vec<String>,
}

/// `[formatter]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatterConfig {
    /// JSON indent width.
    #[serde(default = "default_indent")]
    pub indent: usize,

    /// Embed the stylesheet in HTML output.
    #[serde(default = "default_true")]
    pub include_css: bool,

    /// Render the metadata block.
    #[serde(default = "default_true")]
    pub include_metadata: bool,

    /// Directory of named templates (`<name>.j2` / `<name>.html` / ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_dir: Option<String>,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            indent: default_indent(),
            include_css: true,
            include_metadata: true,
            template_dir: None,
        }
    }
}

fn default_indent() -> usize {
    2
}
fn default_true() -> bool {
    true
}

/// `[aggregation]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Consolidation strategy: `merge`, `summary` or `best`.
    #[serde(default = "default_strategy")]
    pub strategy: String,

    /// Agent role assigned to consolidated outputs.
    #[serde(default = "default_target_role")]
    pub target_role: String,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            target_role: default_target_role(),
        }
    }
}

fn default_strategy() -> String {
    "merge".into()
}
fn default_target_role() -> String {
    "Consolidated Agent".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.outputkit/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| OutputKitError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.outputkit/outputkit.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| OutputKitError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| OutputKitError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| OutputKitError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| OutputKitError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| OutputKitError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
