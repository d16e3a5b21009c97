//! Service Configuration - dataset, schema, training and forest settings as TOML
//!
//! Each struct implements `Default` with the values from `defaults`, so the
//! service behaves identically with or without a config file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;

/// Environment variable naming a config file.
pub const CONFIG_ENV_VAR: &str = "SPOILAGE_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "spoilage.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a service deployment.
///
/// Load with `ServiceConfig::load()` which searches:
/// 1. `$SPOILAGE_CONFIG` env var
/// 2. `./spoilage.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Dataset location and column roles
    #[serde(default)]
    pub dataset: DatasetConfig,

    /// Feature schema derivation
    #[serde(default)]
    pub schema: SchemaConfig,

    /// Split, imputation and robustness settings
    #[serde(default)]
    pub training: TrainingConfig,

    /// Random forest settings
    #[serde(default)]
    pub forest: ForestConfig,
}

impl ServiceConfig {
    /// Load configuration using the standard search order:
    /// 1. `$SPOILAGE_CONFIG` environment variable
    /// 2. `./spoilage.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded service config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
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
                    info!("Loaded service config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate all settings for internal consistency.
    ///
    /// Rules:
    /// - Target column must be non-empty and not excluded
    /// - Test fraction must lie strictly between 0 and 1
    /// - Noise standard deviation must be finite and non-negative
    /// - Tree count, depth and min-samples-split must be positive
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let target = self.dataset.target_column.trim();
        if target.is_empty() {
            errors.push("dataset.target_column: must not be empty".to_string());
        } else if self.dataset.excluded_columns.iter().any(|c| c == target) {
            errors.push(format!(
                "dataset.target_column: '{target}' is also listed in dataset.excluded_columns"
            ));
        }

        if self.dataset.path.trim().is_empty() {
            errors.push("dataset.path: must not be empty".to_string());
        }

        let tf = self.training.test_fraction;
        if !tf.is_finite() || tf <= 0.0 || tf >= 1.0 {
            errors.push(format!(
                "training.test_fraction: must be in (0, 1) (got {tf})"
            ));
        }

        let sd = self.training.noise_std_dev;
        if !sd.is_finite() || sd < 0.0 {
            errors.push(format!(
                "training.noise_std_dev: must be finite and >= 0 (got {sd})"
            ));
        }

        let max = usize::from(u16::MAX);
        if self.forest.n_estimators == 0 || self.forest.n_estimators > max {
            errors.push(format!(
                "forest.n_estimators: must be in 1..={max} (got {})",
                self.forest.n_estimators
            ));
        }
        if self.forest.max_depth == 0 || self.forest.max_depth > max {
            errors.push(format!(
                "forest.max_depth: must be in 1..={max} (got {})",
                self.forest.max_depth
            ));
        }
        if self.forest.min_samples_split < 2 {
            errors.push(format!(
                "forest.min_samples_split: must be >= 2 (got {})",
                self.forest.min_samples_split
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

/// Errors from loading or validating config.
#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Server Config
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server bind address.
    ///
    /// Can be overridden by `SPOILAGE_SERVER_ADDR` env var or `--addr` CLI flag.
    #[serde(default = "default_server_addr")]
    pub addr: String,
}

fn default_server_addr() -> String {
    defaults::SERVER_ADDR.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_server_addr(),
        }
    }
}

// ============================================================================
// Dataset Config
// ============================================================================

/// Dataset location and column roles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Logical dataset path without extension. `<path>.xlsx` is tried
    /// first, then `<path>.csv`.
    #[serde(default = "default_dataset_path")]
    pub path: String,

    /// Outcome column.
    #[serde(default = "default_target_column")]
    pub target_column: String,

    /// Columns that are never model inputs.
    #[serde(default = "default_excluded_columns")]
    pub excluded_columns: Vec<String>,

    /// Columns ending in this suffix are excluded as well. Empty disables the rule.
    #[serde(default = "default_auxiliary_suffix")]
    pub auxiliary_suffix: String,
}

fn default_dataset_path() -> String {
    defaults::DATASET_STEM.to_string()
}
fn default_target_column() -> String {
    defaults::TARGET_COLUMN.to_string()
}
fn default_excluded_columns() -> Vec<String> {
    defaults::EXCLUDED_COLUMNS.iter().map(|s| (*s).to_string()).collect()
}
fn default_auxiliary_suffix() -> String {
    defaults::AUXILIARY_SUFFIX.to_string()
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: default_dataset_path(),
            target_column: default_target_column(),
            excluded_columns: default_excluded_columns(),
            auxiliary_suffix: default_auxiliary_suffix(),
        }
    }
}

// ============================================================================
// Schema Config
// ============================================================================

/// How the sensor-channel allow-list restricts the feature set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllowListMode {
    /// Restrict to the allow-listed channels that are present; fall back to
    /// all candidates when none are.
    #[default]
    Intersect,
    /// Every allow-listed channel must be present.
    Strict,
    /// Use all candidate columns in file order.
    Disabled,
}

/// Feature schema derivation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// Recognized sensor channels, in canonical feature order.
    #[serde(default = "default_sensor_channels")]
    pub sensor_channels: Vec<String>,

    #[serde(default)]
    pub allow_list_mode: AllowListMode,
}

fn default_sensor_channels() -> Vec<String> {
    defaults::SENSOR_CHANNELS.iter().map(|s| (*s).to_string()).collect()
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            sensor_channels: default_sensor_channels(),
            allow_list_mode: AllowListMode::default(),
        }
    }
}

// ============================================================================
// Training Config
// ============================================================================

/// What the imputer does with a feature that has no observed training values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyFeaturePolicy {
    /// Keep the undefined (NaN) mean.
    #[default]
    Nan,
    /// Fill with 0.0.
    Zero,
    /// Fail the training run.
    Reject,
}

/// Split, imputation and robustness settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Fraction of rows held out for evaluation.
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,

    /// Seed for the train/test shuffle.
    #[serde(default = "default_split_seed")]
    pub split_seed: u64,

    /// Gaussian noise standard deviation for the robustness score.
    #[serde(default = "default_noise_std_dev")]
    pub noise_std_dev: f64,

    /// Seed for the robustness-score noise.
    #[serde(default = "default_noise_seed")]
    pub noise_seed: u64,

    #[serde(default)]
    pub empty_feature_policy: EmptyFeaturePolicy,
}

fn default_test_fraction() -> f64 {
    defaults::TEST_FRACTION
}
fn default_split_seed() -> u64 {
    defaults::SPLIT_SEED
}
fn default_noise_std_dev() -> f64 {
    defaults::NOISE_STD_DEV
}
fn default_noise_seed() -> u64 {
    defaults::NOISE_SEED
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_fraction: default_test_fraction(),
            split_seed: default_split_seed(),
            noise_std_dev: default_noise_std_dev(),
            noise_seed: default_noise_seed(),
            empty_feature_policy: EmptyFeaturePolicy::default(),
        }
    }
}

// ============================================================================
// Forest Config
// ============================================================================

/// Number of candidate features examined at each split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaxFeatures {
    /// `floor(sqrt(n_features))`, at least 1
    #[default]
    Sqrt,
    /// Every feature
    All,
}

/// Random forest settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestConfig {
    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,

    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,

    #[serde(default)]
    pub max_features: MaxFeatures,

    #[serde(default = "default_forest_seed")]
    pub seed: u64,
}

fn default_n_estimators() -> usize {
    defaults::N_ESTIMATORS
}
fn default_max_depth() -> usize {
    defaults::MAX_DEPTH
}
fn default_min_samples_split() -> usize {
    defaults::MIN_SAMPLES_SPLIT
}
fn default_forest_seed() -> u64 {
    defaults::FOREST_SEED
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: default_n_estimators(),
            max_depth: default_max_depth(),
            min_samples_split: default_min_samples_split(),
            max_features: MaxFeatures::default(),
            seed: default_forest_seed(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
