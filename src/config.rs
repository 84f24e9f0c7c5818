//! Configuration module.
//!
//! Handles loading, validating, and merging `dualscale.toml`. Stock defaults
//! are overridden by the user file, and command-line flags override both.
//!
//! ## Config File Location
//!
//! `--config PATH` names the file explicitly. Without it, `dualscale.toml` in
//! the working directory is used when present; otherwise the stock defaults
//! apply.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [engine]
//! concurrency = 4           # Engine worker threads (omit for auto = CPU cores)
//! cache_max = 1000          # Cached operation results
//! cache_max_files = 100     # Cached open sources
//! cache_max_memory = 104857600  # Bytes of cached pixels
//!
//! [pipeline]
//! quality = 85              # Lossy encode quality (1-100)
//! scaler = "bilinear"       # Software-backend resampling kernel
//! fast_resize = false       # Integer pre-shrink before the final resample
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::engine::{
    DEFAULT_CACHE_MAX, DEFAULT_CACHE_MAX_FILES, DEFAULT_CACHE_MAX_MEMORY, EngineConfig,
};
use crate::imaging::Scaler;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File looked up in the working directory when `--config` is not given.
pub const CONFIG_FILE_NAME: &str = "dualscale.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Settings loaded from `dualscale.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Accelerated engine globals.
    pub engine: EngineSettings,
    /// Defaults for pipeline flags.
    pub pipeline: PipelineSettings,
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.pipeline.quality) {
            return Err(ConfigError::Validation(
                "pipeline.quality must be 1-100".into(),
            ));
        }
        if self.engine.concurrency == Some(0) {
            return Err(ConfigError::Validation(
                "engine.concurrency must be at least 1 (omit it for auto)".into(),
            ));
        }
        Ok(())
    }
}

/// Engine settings, applied through [`crate::engine::configure`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineSettings {
    /// Worker threads. When absent, one per CPU core.
    /// Values larger than the core count are clamped down.
    pub concurrency: Option<usize>,
    pub cache_max: usize,
    pub cache_max_files: usize,
    pub cache_max_memory: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            concurrency: None,
            cache_max: DEFAULT_CACHE_MAX,
            cache_max_files: DEFAULT_CACHE_MAX_FILES,
            cache_max_memory: DEFAULT_CACHE_MAX_MEMORY,
        }
    }
}

impl EngineSettings {
    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig {
            concurrency: effective_concurrency(self),
            cache_max: self.cache_max,
            cache_max_files: self.cache_max_files,
            cache_max_memory: self.cache_max_memory,
        }
    }
}

/// Defaults for the pipeline flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineSettings {
    pub quality: u32,
    pub scaler: Scaler,
    pub fast_resize: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            quality: 85,
            scaler: Scaler::default(),
            fast_resize: false,
        }
    }
}

/// Resolve the engine thread count.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_concurrency(settings: &EngineSettings) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    settings.concurrency.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(Config::default())?)
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

/// Merge an optional overlay onto the stock defaults, then deserialize and
/// validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<Config, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load an explicitly named config file. The file must exist.
pub fn load_config_file(path: &Path) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    tracing::debug!(path = %path.display(), "config loaded");
    resolve_config(Some(value))
}

/// Load `dualscale.toml` from `dir` if it exists, else the stock defaults.
pub fn load_config(dir: &Path) -> Result<Config, ConfigError> {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return resolve_config(None);
    }
    load_config_file(&path)
}
