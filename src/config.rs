//! Service configuration module.
//!
//! Handles loading, validating, and merging TOML config files. Stock
//! defaults are overridden by whatever the operator's file sets; everything
//! is optional.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [server]
//! host = "0.0.0.0"
//! port = 10000
//!
//! [animation]
//! target_width = 300        # Output frame size in pixels
//! target_height = 300
//! frame_count = 10
//! frame_delay_ms = 100      # GIF stores delays in 10 ms steps
//! zoom_factor = 1.3         # Last frame crop relative to first (> 1.0)
//! loop_count = 0            # 0 = loop forever
//!
//! [encoding]
//! speed = 10                # GIF quantizer speed, 1 (best) to 30 (fastest)
//!
//! [limits]
//! max_upload_bytes = 20971520
//! max_source_pixels = 40000000
//! # Largest image after scaling the source to cover the widest frame. Thin
//! # strips and tiny images are enlarged by that step; this bounds the memory.
//! max_scaled_pixels = 40000000
//!
//! [processing]
//! max_processes = 4         # Max parallel frame workers (omit for auto = CPU cores)
//!
//! [logging]
//! level = "info"            # Overridden by RUST_LOG when set
//! ```
//!
//! Unknown keys are rejected to catch typos early. The animation values are
//! fixed for clients; only the operator can change them here.

use crate::imaging::AnimationConfig;
use crate::imaging::operations::{DEFAULT_ENCODE_SPEED, DEFAULT_MAX_SCALED_PIXELS, RenderOptions};
use crate::imaging::rust_backend::DEFAULT_MAX_SOURCE_PIXELS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
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

/// Service configuration loaded from a TOML file.
///
/// All fields have defaults. Config files need only specify the values they
/// want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Listen address.
    pub server: ServerConfig,
    /// Ken Burns animation parameters.
    pub animation: AnimationConfig,
    /// GIF encoder settings.
    pub encoding: EncodingConfig,
    /// Upload and decode limits.
    pub limits: LimitsConfig,
    /// Parallel frame rendering settings.
    pub processing: ProcessingConfig,
    /// Log filter settings.
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.animation
            .validate()
            .map_err(|e| ConfigError::Validation(format!("animation: {e}")))?;
        if self.animation.frame_delay_ms % 10 != 0 {
            return Err(ConfigError::Validation(format!(
                "animation.frame_delay_ms must be a multiple of 10 (GIF delay resolution), got {}",
                self.animation.frame_delay_ms
            )));
        }
        if !(1..=30).contains(&self.encoding.speed) {
            return Err(ConfigError::Validation(
                "encoding.speed must be 1-30".into(),
            ));
        }
        if self.limits.max_upload_bytes == 0 {
            return Err(ConfigError::Validation(
                "limits.max_upload_bytes must be non-zero".into(),
            ));
        }
        if self.limits.max_source_pixels == 0 {
            return Err(ConfigError::Validation(
                "limits.max_source_pixels must be non-zero".into(),
            ));
        }
        if self.limits.max_scaled_pixels == 0 {
            return Err(ConfigError::Validation(
                "limits.max_scaled_pixels must be non-zero".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Render options for the pipeline.
    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            animation: self.animation.clone(),
            encode_speed: self.encoding.speed,
            max_scaled_pixels: self.limits.max_scaled_pixels,
        }
    }
}

/// Listen address.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 10000,
        }
    }
}

impl ServerConfig {
    /// `host:port` string suitable for binding.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// GIF encoder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodingConfig {
    /// NeuQuant speed: 1 = best palette, 30 = fastest.
    pub speed: i32,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            speed: DEFAULT_ENCODE_SPEED,
        }
    }
}

/// Upload and decode limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitsConfig {
    /// Largest accepted request body in bytes.
    pub max_upload_bytes: usize,
    /// Largest accepted source image (width × height) before decoding.
    pub max_source_pixels: u64,
    /// Largest source after the cover-fit pre-scale (width × height).
    pub max_scaled_pixels: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 20 * 1024 * 1024,
            max_source_pixels: DEFAULT_MAX_SOURCE_PIXELS,
            max_scaled_pixels: DEFAULT_MAX_SCALED_PIXELS,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel frame workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Log filter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(ServiceConfig::default())
        .map_err(|e| ConfigError::Validation(format!("cannot serialize defaults: {e}")))
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

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<ServiceConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ServiceConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a TOML file.
///
/// A missing file yields the validated stock defaults. A file that exists but
/// has invalid TOML, unknown keys, or out-of-range values is an error.
pub fn load_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    if !path.exists() {
        return resolve_config(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    resolve_config(Some(value))
}

/// Returns a fully-commented stock config file with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Ken Burns GIF Service Configuration
# ===================================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# HTTP listener
# ---------------------------------------------------------------------------
[server]
host = "0.0.0.0"
port = 10000

# ---------------------------------------------------------------------------
# Animation (applies to every request; clients cannot change these)
# ---------------------------------------------------------------------------
[animation]
# Output frame size in pixels.
target_width = 300
target_height = 300

# Number of frames and how long each is shown.
# GIF stores delays in 10 ms steps, so frame_delay_ms must be a multiple of 10.
frame_count = 10
frame_delay_ms = 100

# Widest crop relative to the first frame. Must be greater than 1.0.
# Frame 0 is the tightest view, the last frame the widest (zoom out).
zoom_factor = 1.3

# Replays after the first playback. 0 loops forever.
loop_count = 0

# ---------------------------------------------------------------------------
# GIF encoding
# ---------------------------------------------------------------------------
[encoding]
# Palette quantizer speed: 1 = best quality, 30 = fastest.
speed = 10

# ---------------------------------------------------------------------------
# Limits
# ---------------------------------------------------------------------------
[limits]
# Largest accepted upload in bytes (20 MiB).
max_upload_bytes = 20971520

# Largest accepted source image in pixels (width x height).
max_source_pixels = 40000000

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel frame workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# ---------------------------------------------------------------------------
# Logging
# ---------------------------------------------------------------------------
[logging]
# tracing filter directive; RUST_LOG takes precedence when set.
level = "info"
"##
}
