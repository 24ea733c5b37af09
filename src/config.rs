//! Pipeline configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `CREDITRISK_*` environment variables. Binaries apply their command-line
//! flags last.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::ml::forest::{ForestOptions, MaxFeatures};

/// Environment variable naming a TOML config file.
pub const CONFIG_PATH_ENV: &str = "CREDITRISK_CONFIG";
pub const RAW_DATA_ENV: &str = "CREDITRISK_RAW_DATA";
pub const PROCESSED_DATA_ENV: &str = "CREDITRISK_PROCESSED_DATA";
pub const MODEL_PATH_ENV: &str = "CREDITRISK_MODEL_PATH";
pub const TARGET_COLUMN_ENV: &str = "CREDITRISK_TARGET_COLUMN";
pub const LOG_LEVEL_ENV: &str = "CREDITRISK_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "CREDITRISK_LOG_DIR";

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

/// Full configuration for both pipeline stages.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub paths: PathsConfig,
    pub features: FeatureConfig,
    pub training: TrainConfig,
    pub logging: LogConfig,
}

/// Input and output locations.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Raw CSV read by the processing stage.
    pub raw_data: PathBuf,
    /// Processed CSV written by the processing stage and read by training.
    pub processed_data: PathBuf,
    /// Serialized model artifact.
    pub model: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            raw_data: PathBuf::from("data/raw/data.csv"),
            processed_data: PathBuf::from("data/processed/data.csv"),
            model: PathBuf::from("models/rf_model.json"),
        }
    }
}

/// What to do with a numeric column that has no values to average.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllNullPolicy {
    /// Keep the nulls.
    #[default]
    LeaveNull,
    /// Fail feature engineering with an imputation error.
    Fail,
}

/// Feature engineering settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub timestamp_column: String,
    pub hour_column: String,
    pub day_column: String,
    /// Fail instead of skipping calendar features when the timestamp column is absent.
    pub require_timestamp: bool,
    pub all_null_policy: AllNullPolicy,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            timestamp_column: "TransactionStartTime".to_string(),
            hour_column: "Transaction_Hour".to_string(),
            day_column: "Transaction_Day".to_string(),
            require_timestamp: false,
            all_null_policy: AllNullPolicy::LeaveNull,
        }
    }
}

/// Training settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    pub target_column: String,
    /// Dropped from the features when present.
    pub timestamp_column: String,
    pub test_fraction: f64,
    pub seed: u64,
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        let forest = ForestOptions::default();
        Self {
            target_column: "FraudResult".to_string(),
            timestamp_column: "TransactionStartTime".to_string(),
            test_fraction: 0.2,
            seed: forest.seed,
            n_trees: forest.n_trees,
            max_depth: forest.max_depth,
            min_samples_split: forest.min_samples_split,
            max_features: forest.max_features,
            bootstrap: forest.bootstrap,
        }
    }
}

impl TrainConfig {
    pub fn forest_options(&self) -> ForestOptions {
        ForestOptions {
            n_trees: self.n_trees,
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            max_features: self.max_features,
            bootstrap: self.bootstrap,
            seed: self.seed,
        }
    }
}

/// Logging settings passed to [`crate::logging::init`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter level; `RUST_LOG` takes precedence.
    pub level: String,
    /// When set, each run also writes a log file here.
    pub log_dir: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl PipelineConfig {
    /// Parse a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }

    /// Defaults, then the given file (or `CREDITRISK_CONFIG`), then environment overrides.
    pub fn resolve(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let from_env = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        let mut config = match config_path.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::load_file(&path)?,
            None => Self::default(),
        };
        config.apply_overrides_from(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `CREDITRISK_*` overrides using `lookup` to read variables.
    pub fn apply_overrides_from(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(value) = lookup(RAW_DATA_ENV) {
            self.paths.raw_data = PathBuf::from(value);
        }
        if let Some(value) = lookup(PROCESSED_DATA_ENV) {
            self.paths.processed_data = PathBuf::from(value);
        }
        if let Some(value) = lookup(MODEL_PATH_ENV) {
            self.paths.model = PathBuf::from(value);
        }
        if let Some(value) = lookup(TARGET_COLUMN_ENV) {
            self.training.target_column = value;
        }
        if let Some(value) = lookup(LOG_LEVEL_ENV) {
            self.logging.level = value;
        }
        if let Some(value) = lookup(LOG_DIR_ENV) {
            self.logging.log_dir = Some(PathBuf::from(value));
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |key: &str, reason: String| ConfigError::InvalidValue {
            key: key.to_string(),
            reason,
        };
        let training = &self.training;
        if !(training.test_fraction > 0.0 && training.test_fraction < 1.0) {
            return Err(invalid(
                "training.test_fraction",
                format!("{} is not in (0, 1)", training.test_fraction),
            ));
        }
        if training.n_trees == 0 {
            return Err(invalid("training.n_trees", "must be at least 1".to_string()));
        }
        if training.min_samples_split < 2 {
            return Err(invalid(
                "training.min_samples_split",
                "must be at least 2".to_string(),
            ));
        }
        if training.max_features == MaxFeatures::Count(0) {
            return Err(invalid(
                "training.max_features",
                "count must be at least 1".to_string(),
            ));
        }
        if training.target_column.is_empty() {
            return Err(invalid("training.target_column", "must not be empty".to_string()));
        }
        if training.timestamp_column != self.features.timestamp_column {
            return Err(invalid(
                "training.timestamp_column",
                format!(
                    "{} differs from features.timestamp_column {}; set both to the same column",
                    training.timestamp_column, self.features.timestamp_column
                ),
            ));
        }
        let level = self.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(invalid(
                "logging.level",
                format!("{} is not one of {}", self.logging.level, LOG_LEVELS.join(", ")),
            ));
        }
        Ok(())
    }
}
