//! Hierarchical JSON/TOML configuration with `${VAR}` expansion.
//!
//! Lookup order when no file is given explicitly: `.atlasrc` then
//! `atlas.toml` in the start directory and each of its parents, then
//! `~/.atlasrc`, then `~/.config/atlas.toml`. Missing files mean defaults.

use crate::error::{IngestError, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// File names searched in every directory, in priority order
pub const CONFIG_FILE_NAMES: [&str; 2] = [".atlasrc", "atlas.toml"];

static ENV_VAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{([^}]+)\}|\$([A-Za-z_][A-Za-z0-9_]*)").expect("env var pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AtlasConfig {
    pub ingestion: IngestionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// Glob patterns matched against root-relative paths
    pub patterns: Vec<String>,
    pub follow_symlinks: bool,
    pub max_file_size_mb: f64,
    /// Records per sink write
    pub batch_size: usize,
    /// Per-file parse deadline; no deadline when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_timeout_ms: Option<u64>,
    /// Files parsed concurrently
    pub max_concurrency: usize,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            patterns: vec!["**/*.py".to_string()],
            follow_symlinks: false,
            max_file_size_mb: 10.0,
            batch_size: 100,
            file_timeout_ms: None,
            max_concurrency: default_concurrency(),
        }
    }
}

/// Available parallelism clamped to 2..=8
fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .clamp(2, 8)
}

impl IngestionConfig {
    pub fn max_file_size_bytes(&self) -> u64 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            (self.max_file_size_mb * 1024.0 * 1024.0) as u64
        }
    }

    pub fn validate(&self) -> Result<()> {
        let ingestion = self;
        if ingestion.patterns.is_empty() {
            return Err(IngestError::InvalidConfig(
                "ingestion.patterns must not be empty".to_string(),
            ));
        }
        for pattern in &ingestion.patterns {
            globset::Glob::new(pattern).map_err(|e| {
                IngestError::InvalidConfig(format!("ingestion.patterns: bad glob '{pattern}': {e}"))
            })?;
        }
        if !ingestion.max_file_size_mb.is_finite() || ingestion.max_file_size_mb <= 0.0 {
            return Err(IngestError::InvalidConfig(format!(
                "ingestion.max_file_size_mb must be positive, got {}",
                ingestion.max_file_size_mb
            )));
        }
        if ingestion.batch_size == 0 {
            return Err(IngestError::InvalidConfig(
                "ingestion.batch_size must be at least 1".to_string(),
            ));
        }
        if ingestion.max_concurrency == 0 {
            return Err(IngestError::InvalidConfig(
                "ingestion.max_concurrency must be at least 1".to_string(),
            ));
        }
        if ingestion.file_timeout_ms == Some(0) {
            return Err(IngestError::InvalidConfig(
                "ingestion.file_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Human,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `env_logger` filter level (`error` .. `trace`)
    pub level: String,
    pub format: LogFormat,
    /// Append log records here instead of stderr
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Human,
            file: None,
        }
    }
}

impl AtlasConfig {
    /// Build a config from raw parsed data, expanding environment variables first
    pub fn from_value(value: Value, source: &Path) -> Result<Self> {
        let expanded = expand_env_vars(value);
        serde_json::from_value(expanded).map_err(|e| IngestError::config(source, e.to_string()))
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        self.ingestion.validate()?;
        log::LevelFilter::from_str(&self.logging.level).map_err(|_| {
            IngestError::InvalidConfig(format!("logging.level: unknown level '{}'", self.logging.level))
        })?;
        Ok(())
    }
}

/// Replace `${VAR}` and `$VAR` in every string; unknown variables stay as written
pub fn expand_env_vars(value: Value) -> Value {
    match value {
        Value::String(text) => Value::String(expand_str(&text)),
        Value::Array(items) => Value::Array(items.into_iter().map(expand_env_vars).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key, expand_env_vars(value)))
                .collect(),
        ),
        other => other,
    }
}

fn expand_str(text: &str) -> String {
    ENV_VAR
        .replace_all(text, |caps: &Captures<'_>| {
            let name = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map_or("", |m| m.as_str());
            std::env::var(name).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

/// Search for a config file starting at `start_dir` (default: current directory)
pub fn find_config_file(start_dir: Option<&Path>) -> Option<PathBuf> {
    let start = match start_dir {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir().ok()?,
    };

    for dir in start.ancestors() {
        for name in CONFIG_FILE_NAMES {
            let candidate = dir.join(name);
            if candidate.is_file() {
                log::info!("Found config file: {}", candidate.display());
                return Some(candidate);
            }
        }
    }

    let home = dirs::home_dir()?;
    [home.join(".atlasrc"), home.join(".config").join("atlas.toml")]
        .into_iter()
        .find(|candidate| candidate.is_file())
        .inspect(|found| log::info!("Found config file: {}", found.display()))
}

/// Read a config file into raw data.
///
/// `.atlasrc` and `.json` files are JSON with a TOML fallback, `.toml` files
/// are TOML.
pub fn load_config_file(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Err(IngestError::config(path, "config file not found"));
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| IngestError::config(path, format!("failed to read: {e}")))?;

    let is_rc = path.file_name().is_some_and(|name| name == ".atlasrc");
    let extension = path.extension().and_then(|ext| ext.to_str());
    match extension {
        Some("toml") => parse_toml(path, &content),
        Some("json") => parse_json_or_toml(path, &content),
        _ if is_rc => parse_json_or_toml(path, &content),
        _ => Err(IngestError::config(path, "unsupported config file format")),
    }
}

fn parse_toml(path: &Path, content: &str) -> Result<Value> {
    let toml_value: toml::Value = toml::from_str(content)
        .map_err(|e| IngestError::config(path, format!("TOML parse error: {e}")))?;
    serde_json::to_value(toml_value)
        .map_err(|e| IngestError::config(path, format!("failed to convert TOML: {e}")))
}

fn parse_json_or_toml(path: &Path, content: &str) -> Result<Value> {
    match serde_json::from_str(content) {
        Ok(value) => Ok(value),
        Err(json_err) => parse_toml(path, content).map_err(|toml_err| {
            IngestError::config(
                path,
                format!("not valid JSON ({json_err}) or TOML ({toml_err})"),
            )
        }),
    }
}

/// Load the effective configuration.
///
/// An explicit file must exist; otherwise the hierarchical search runs from
/// `search_path` and falls back to defaults when nothing is found.
pub fn load_config(config_file: Option<&Path>, search_path: Option<&Path>) -> Result<AtlasConfig> {
    let path = match config_file {
        Some(path) => Some(path.to_path_buf()),
        None => find_config_file(search_path),
    };

    let config = match path {
        Some(path) => {
            let value = load_config_file(&path)?;
            let config = AtlasConfig::from_value(value, &path)?;
            log::info!("Loaded configuration from {}", path.display());
            config
        }
        None => {
            log::info!("No config file found, using defaults");
            AtlasConfig::default()
        }
    };

    config.validate()?;
    Ok(config)
}

/// Output format of [`generate_config_template`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateFormat {
    Json,
    Toml,
}

impl FromStr for TemplateFormat {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "toml" => Ok(Self::Toml),
            other => Err(IngestError::InvalidConfig(format!(
                "unsupported template format '{other}' (expected json or toml)"
            ))),
        }
    }
}

/// Config file pre-filled with the defaults
pub fn generate_config_template(format: TemplateFormat) -> Result<String> {
    let config = AtlasConfig::default();
    match format {
        TemplateFormat::Json => {
            let mut value = serde_json::to_value(&config)
                .map_err(|e| IngestError::Other(format!("template serialization failed: {e}")))?;
            if let Value::Object(map) = &mut value {
                map.insert(
                    "_comment".to_string(),
                    Value::String("Code Atlas configuration (.atlasrc)".to_string()),
                );
            }
            serde_json::to_string_pretty(&value)
                .map_err(|e| IngestError::Other(format!("template serialization failed: {e}")))
        }
        TemplateFormat::Toml => {
            let body = toml::to_string_pretty(&config)
                .map_err(|e| IngestError::Other(format!("template serialization failed: {e}")))?;
            Ok(format!(
                "# Code Atlas configuration (atlas.toml)\n\
                 #\n\
                 # Place in your project root, ~/.atlasrc or ~/.config/atlas.toml.\n\
                 # Values may reference environment variables as ${{VAR}} or $VAR.\n\n\
                 {body}"
            ))
        }
    }
}
