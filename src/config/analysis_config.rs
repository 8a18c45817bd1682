//! Analysis Configuration - detection thresholds and statistics parameters as TOML values
//!
//! Each struct implements `Default` with the values in [`super::defaults`],
//! so a missing file or a partial file yields a fully usable configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use super::defaults;
use crate::processing::SpectrumPolicy;

/// Environment variable naming a config file.
pub const CONFIG_ENV_VAR: &str = "SST_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "sst_config.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub topout: TopoutConfig,

    #[serde(default)]
    pub airtime: AirtimeConfig,

    #[serde(default)]
    pub velocity: VelocityConfig,

    #[serde(default)]
    pub spectrum: SpectrumConfig,

    #[serde(default)]
    pub balance: BalanceConfig,

    #[serde(default)]
    pub render: RenderConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,
}

impl AnalysisConfig {
    /// Load configuration using the standard search order.
    ///
    /// Files that fail to load are skipped with a warning.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded analysis config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config, falling back");
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded analysis config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No config file found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parse and validate TOML text. Unknown keys are logged, never fatal.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate every parameter, reporting all problems at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let t = &self.topout;
        if !(t.threshold_fraction.is_finite()
            && t.threshold_fraction > 0.0
            && t.threshold_fraction < 1.0)
        {
            errors.push(format!(
                "topout.threshold_fraction = {} must be in (0, 1)",
                t.threshold_fraction
            ));
        }
        Self::check_positive(t.min_dwell_s, "topout.min_dwell_s", &mut errors);
        if !t.gap_tolerance_s.is_finite() || t.gap_tolerance_s < 0.0 {
            errors.push(format!(
                "topout.gap_tolerance_s = {} must be >= 0",
                t.gap_tolerance_s
            ));
        }

        Self::check_positive(
            self.airtime.impact_velocity_mm_s,
            "airtime.impact_velocity_mm_s",
            &mut errors,
        );
        Self::check_positive(
            self.airtime.check_window_s,
            "airtime.check_window_s",
            &mut errors,
        );
        Self::check_positive(
            self.velocity.high_speed_threshold_mm_s,
            "velocity.high_speed_threshold_mm_s",
            &mut errors,
        );

        if let Some(f) = self.spectrum.max_frequency_hz {
            Self::check_positive(f, "spectrum.max_frequency_hz", &mut errors);
        }

        if self.balance.bins == 0 {
            errors.push("balance.bins must be >= 1".to_string());
        }
        if self.render.lod == 0 {
            errors.push("render.lod must be >= 1".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_positive(value: f64, name: &str, errors: &mut Vec<String>) {
        if !value.is_finite() || value <= 0.0 {
            errors.push(format!("{name} = {value} must be a positive number"));
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Config parse error ({}): {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Config serialization error: {0}")]
    Serialize(toml::ser::Error),

    #[error("Config validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

// ============================================================================
// Sections
// ============================================================================

/// Topout (near-full-extension dwell) detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopoutConfig {
    /// A sample is at rest when within this fraction of max travel from full extension
    #[serde(default = "default_threshold_fraction")]
    pub threshold_fraction: f64,

    /// Runs shorter than this are discarded (seconds)
    #[serde(default = "default_min_dwell_s")]
    pub min_dwell_s: f64,

    /// Runs separated by a gap no longer than this are merged (seconds)
    #[serde(default = "default_gap_tolerance_s")]
    pub gap_tolerance_s: f64,
}

fn default_threshold_fraction() -> f64 {
    defaults::TOPOUT_THRESHOLD_FRACTION
}
fn default_min_dwell_s() -> f64 {
    defaults::TOPOUT_MIN_DWELL_S
}
fn default_gap_tolerance_s() -> f64 {
    defaults::TOPOUT_GAP_TOLERANCE_S
}

impl Default for TopoutConfig {
    fn default() -> Self {
        Self {
            threshold_fraction: default_threshold_fraction(),
            min_dwell_s: default_min_dwell_s(),
            gap_tolerance_s: default_gap_tolerance_s(),
        }
    }
}

/// Airtime classification of combined topouts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirtimeConfig {
    /// Front or rear velocity magnitude that marks a landing (mm/s)
    #[serde(default = "default_impact_velocity")]
    pub impact_velocity_mm_s: f64,

    /// Window after the candidate's end searched for the landing (seconds)
    #[serde(default = "default_check_window")]
    pub check_window_s: f64,
}

fn default_impact_velocity() -> f64 {
    defaults::AIRTIME_IMPACT_VELOCITY_MM_S
}
fn default_check_window() -> f64 {
    defaults::AIRTIME_CHECK_WINDOW_S
}

impl Default for AirtimeConfig {
    fn default() -> Self {
        Self {
            impact_velocity_mm_s: default_impact_velocity(),
            check_window_s: default_check_window(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VelocityConfig {
    /// High-speed threshold (mm/s)
    #[serde(default = "default_hst")]
    pub high_speed_threshold_mm_s: f64,
}

fn default_hst() -> f64 {
    defaults::HIGH_SPEED_THRESHOLD_MM_S
}

impl Default for VelocityConfig {
    fn default() -> Self {
        Self {
            high_speed_threshold_mm_s: default_hst(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpectrumConfig {
    /// How a non-contiguous selection is turned into a signal
    #[serde(default)]
    pub policy: SpectrumPolicy,

    /// Drop spectrum bins above this frequency (Hz)
    #[serde(default)]
    pub max_frequency_hz: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceConfig {
    /// Bins per axis of the joint front/rear distribution
    #[serde(default = "default_balance_bins")]
    pub bins: usize,
}

fn default_balance_bins() -> usize {
    defaults::BALANCE_BINS
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            bins: default_balance_bins(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Level of detail: downsampling factor for rendered traces only
    #[serde(default = "default_lod")]
    pub lod: usize,
}

fn default_lod() -> usize {
    defaults::LEVEL_OF_DETAIL
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self { lod: default_lod() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the serve mode listens on for session ids.
    ///
    /// Can be overridden by the `--address` CLI flag.
    #[serde(default = "default_queue_addr")]
    pub queue_addr: String,
}

fn default_queue_addr() -> String {
    defaults::QUEUE_ADDR.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            queue_addr: default_queue_addr(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_database")]
    pub database: PathBuf,
}

fn default_database() -> PathBuf {
    PathBuf::from(defaults::DATABASE_PATH)
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.render.lod, 5);
        assert!((config.velocity.high_speed_threshold_mm_s - 350.0).abs() < f64::EPSILON);
        assert_eq!(config.spectrum.policy, SpectrumPolicy::LongestRun);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = AnalysisConfig::from_toml_str(
            r#"
[topout]
min_dwell_s = 0.1

[spectrum]
policy = "concatenate"
max_frequency_hz = 10.0
"#,
        )
        .unwrap();
        assert!((config.topout.min_dwell_s - 0.1).abs() < f64::EPSILON);
        assert!((config.topout.threshold_fraction - 0.04).abs() < f64::EPSILON);
        assert_eq!(config.spectrum.policy, SpectrumPolicy::Concatenate);
        assert_eq!(config.spectrum.max_frequency_hz, Some(10.0));
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let mut config = AnalysisConfig::default();
        config.topout.threshold_fraction = 1.5;
        config.render.lod = 0;
        config.airtime.impact_velocity_mm_s = f64::NAN;
        match config.validate() {
            Err(ConfigError::Validation(errors)) => assert_eq!(errors.len(), 3),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = AnalysisConfig::default();
        let text = config.to_toml().unwrap();
        let parsed = AnalysisConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_load_from_missing_file_is_io_error() {
        let err = AnalysisConfig::load_from_file(Path::new("/nonexistent/sst.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
