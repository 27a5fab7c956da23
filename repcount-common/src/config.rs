//! Configuration loading and config file resolution
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. `REPCOUNT_CONFIG` environment variable
//! 3. `<config_dir>/repcount/config.toml` if it exists
//! 4. Compiled defaults (fallback)
//!
//! A missing file never stops startup: a warning is logged and the compiled
//! defaults are used. A file that exists but fails to parse or validate is a
//! configuration error.

use crate::counter::Thresholds;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "REPCOUNT_CONFIG";

/// Complete TOML configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Rep counting and frame acceptance
    #[serde(default)]
    pub counter: CounterConfig,

    /// Session plumbing
    #[serde(default)]
    pub session: SessionConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Rep counting configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterConfig {
    /// Elbow angle above which the arm counts as extended (degrees)
    #[serde(default = "default_extended_threshold")]
    pub extended_threshold_deg: f64,

    /// Elbow angle below which the arm counts as flexed (degrees)
    #[serde(default = "default_flexed_threshold")]
    pub flexed_threshold_deg: f64,

    /// Minimum landmark visibility for a joint to be used
    #[serde(default = "default_min_visibility")]
    pub min_visibility: f32,

    /// Segments shorter than this make the frame degenerate
    #[serde(default = "default_min_segment_length")]
    pub min_segment_length: f64,
}

/// Session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Event bus buffer size
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_extended_threshold() -> f64 {
    Thresholds::DEFAULT_EXTENDED_DEG
}

fn default_flexed_threshold() -> f64 {
    Thresholds::DEFAULT_FLEXED_DEG
}

fn default_min_visibility() -> f32 {
    0.5
}

fn default_min_segment_length() -> f64 {
    1e-4
}

fn default_event_capacity() -> usize {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            extended_threshold_deg: default_extended_threshold(),
            flexed_threshold_deg: default_flexed_threshold(),
            min_visibility: default_min_visibility(),
            min_segment_length: default_min_segment_length(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            event_capacity: default_event_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl CounterConfig {
    pub fn validate(&self) -> Result<()> {
        let in_range = |v: f64| v.is_finite() && (0.0..=180.0).contains(&v);

        if !in_range(self.extended_threshold_deg) {
            return Err(Error::Config(format!(
                "extended_threshold_deg must be within 0-180, got {}",
                self.extended_threshold_deg
            )));
        }
        if !in_range(self.flexed_threshold_deg) {
            return Err(Error::Config(format!(
                "flexed_threshold_deg must be within 0-180, got {}",
                self.flexed_threshold_deg
            )));
        }
        if self.flexed_threshold_deg >= self.extended_threshold_deg {
            return Err(Error::Config(format!(
                "flexed_threshold_deg ({}) must be below extended_threshold_deg ({})",
                self.flexed_threshold_deg, self.extended_threshold_deg
            )));
        }
        if !(0.0..=1.0).contains(&self.min_visibility) {
            return Err(Error::Config(format!(
                "min_visibility must be within 0.0-1.0, got {}",
                self.min_visibility
            )));
        }
        if !(self.min_segment_length >= 0.0 && self.min_segment_length.is_finite()) {
            return Err(Error::Config(format!(
                "min_segment_length must be a non-negative number, got {}",
                self.min_segment_length
            )));
        }
        Ok(())
    }
}

impl TomlConfig {
    /// Parse and validate TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Resolve the config file and load it, degrading to defaults when absent
    pub fn load_or_default(cli_arg: Option<&Path>) -> Result<Self> {
        let Some(path) = resolve_config_path(cli_arg) else {
            info!("No config file found, using compiled defaults");
            return Ok(Self::default());
        };

        if !path.exists() {
            warn!(
                "Config file {} does not exist, using compiled defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let config = Self::load(&path)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.counter.validate()?;
        if self.session.event_capacity == 0 {
            return Err(Error::Config("event_capacity must be greater than 0".to_string()));
        }
        Ok(())
    }
}

/// Pick the config file path following the resolution priority
///
/// Returns `None` only when neither the CLI nor the environment names a file
/// and no file exists in the platform config directory.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    default_config_path().filter(|path| path.exists())
}

/// `<config_dir>/repcount/config.toml` for the current platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("repcount").join("config.toml"))
}
