//! Loader configuration.
//!
//! Handles loading, validating, and merging `loader.toml`. Stock defaults are
//! overridden by a `loader.toml` in the source folder, or by the file given
//! with `--config`.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [images]
//! extensions = ["jpg", "tif", "png", "jp2", "img", "bmp", "gif", "crf", "bip"]
//! quality = 75              # JPEG quality of the derivatives (1-100)
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse, override just the values you want:
//!
//! ```toml
//! [images]
//! quality = 60
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

pub const CONFIG_FILE_NAME: &str = "loader.toml";

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

/// Loader configuration loaded from `loader.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderConfig {
    /// Recognized raster extensions and derivative quality.
    pub images: ImagesConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl LoaderConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.images.quality) {
            return Err(ConfigError::Validation(
                "images.quality must be 1-100".into(),
            ));
        }
        if self.images.extensions.is_empty() {
            return Err(ConfigError::Validation(
                "images.extensions must not be empty".into(),
            ));
        }
        if let Some(bad) = self
            .images
            .extensions
            .iter()
            .find(|e| e.is_empty() || e.starts_with('.'))
        {
            return Err(ConfigError::Validation(format!(
                "images.extensions entries are bare extensions without a dot, got {bad:?}"
            )));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Raster recognition and derivative settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// File extensions treated as rasters (case-insensitive, no dot).
    pub extensions: Vec<String>,
    /// JPEG quality of the reduced derivatives (1 = worst, 100 = best).
    pub quality: u32,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            extensions: ["jpg", "tif", "png", "jp2", "img", "bmp", "gif", "crf", "bip"]
                .into_iter()
                .map(String::from)
                .collect(),
            quality: 75,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of workers for pixel conversion.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Worker count for the raster engine's pixel stretch.
///
/// `max_processes` caps it below the core count; it is never raised above.
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Initialize the global rayon pool from the processing config.
///
/// A pool that is already initialized is left as it is.
pub fn init_thread_pool(config: &ProcessingConfig) {
    let threads = effective_threads(config);
    if rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .is_ok()
    {
        log::debug!("Using {threads} worker thread(s)");
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Stock `[images]` and `[processing]` sections as a TOML table, the layer a
/// `loader.toml` is merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(LoaderConfig::default())?)
}

/// Overlay a `loader.toml` onto the stock table.
///
/// Sections merge key by key, so setting `images.quality` keeps the stock
/// `images.extensions`. Any other value, arrays included, replaces the stock
/// one outright: an `extensions` list is the full list.
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

/// Read a `loader.toml` without interpreting it. A missing file is `None`.
pub fn load_raw_config(config_path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Build a [`LoaderConfig`] from the stock table and an optional user file.
///
/// Unknown keys and invalid `[images]` values are rejected here.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<LoaderConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: LoaderConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the effective configuration for a run.
///
/// An explicit path must exist. Without one, `loader.toml` in `source` is used
/// when present, otherwise the stock defaults.
pub fn load_config(source: &Path, explicit: Option<&Path>) -> Result<LoaderConfig, ConfigError> {
    let overlay = match explicit {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            Some(toml::from_str(&content)?)
        }
        None => load_raw_config(&source.join(CONFIG_FILE_NAME))?,
    };
    resolve_config(stock_defaults_value()?, overlay)
}

/// Returns a fully-commented stock `loader.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Imagery Loader Configuration
# ============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Place this file as loader.toml in the source image folder, or pass it
# explicitly with --config. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Rasters and derivatives
# ---------------------------------------------------------------------------
[images]
# File extensions treated as rasters (case-insensitive, without the dot).
# Everything else in the source tree (world files, .prj, notes) is ignored.
extensions = ["jpg", "tif", "png", "jp2", "img", "bmp", "gif", "crf", "bip"]

# JPEG quality of the reduced derivatives (1 = worst, 100 = best).
quality = 75

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers for pixel conversion.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
