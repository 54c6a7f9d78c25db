//! Configuration for the activity pipeline.

use crate::core::features::{FeatureFunction, DEFAULT_FEATURES};
use crate::core::selection::{FeatureSelector, SelectionStrategy};
use crate::core::windowing::WindowSpec;
use crate::metrics::MetricsConfig;
use crate::model::search::{GridSearch, ParamGrid};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration for a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sampling rate of the accelerometer
    pub sample_rate_hz: u32,

    /// Duration of each feature window
    #[serde(with = "duration_serde")]
    pub window_length: Duration,

    /// Overlap between consecutive windows
    #[serde(with = "duration_serde")]
    pub window_overlap: Duration,

    /// Feature functions applied to every axis, in column order
    pub features: Vec<FeatureFunction>,

    pub selection: SelectionConfig,

    pub search: SearchConfig,

    pub metrics: MetricsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sample_rate_hz: 50,
            window_length: Duration::from_secs(10),
            window_overlap: Duration::from_secs(1),
            features: DEFAULT_FEATURES.to_vec(),
            selection: SelectionConfig::default(),
            search: SearchConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        let config: Config =
            serde_json::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let config_path = Self::config_path();
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    /// Save configuration to an explicit file.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("accel-activity")
            .join("config.json")
    }

    /// Window length and overlap converted to sample counts.
    pub fn window_spec(&self) -> crate::error::Result<WindowSpec> {
        WindowSpec::from_seconds(
            self.sample_rate_hz,
            self.window_length.as_secs(),
            self.window_overlap.as_secs(),
        )
    }

    /// Duration of one window step, i.e. one metrics epoch.
    pub fn epoch(&self) -> Duration {
        self.window_length.saturating_sub(self.window_overlap)
    }

    /// Check every setting a run depends on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate_hz == 0 {
            return Err(ConfigError::InvalidError(
                "sample_rate_hz must be positive".to_string(),
            ));
        }
        self.window_spec()
            .map_err(|e| ConfigError::InvalidError(e.to_string()))?;
        if self.features.is_empty() {
            return Err(ConfigError::InvalidError(
                "at least one feature function is required".to_string(),
            ));
        }
        if self.selection.strategy == SelectionStrategy::TopK(0) {
            return Err(ConfigError::InvalidError(
                "selection.strategy top_k must keep at least one column".to_string(),
            ));
        }
        if self.selection.n_estimators == 0 {
            return Err(ConfigError::InvalidError(
                "selection.n_estimators must be positive".to_string(),
            ));
        }
        self.search
            .grid
            .validate()
            .map_err(|e| ConfigError::InvalidError(e.to_string()))?;
        if self.search.cv_folds < 2 || self.search.holdout_folds < 2 {
            return Err(ConfigError::InvalidError(
                "cv_folds and holdout_folds must be at least 2".to_string(),
            ));
        }
        self.metrics
            .tz()
            .map_err(|e| ConfigError::InvalidError(e.to_string()))?;
        Ok(())
    }
}

/// Feature selection settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub strategy: SelectionStrategy,
    /// Trees in the ranking ensemble
    pub n_estimators: usize,
    pub seed: u64,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            strategy: SelectionStrategy::TopK(12),
            n_estimators: 50,
            seed: 0,
        }
    }
}

impl SelectionConfig {
    pub fn selector(&self) -> FeatureSelector {
        FeatureSelector::new(self.strategy)
            .with_estimators(self.n_estimators)
            .with_seed(self.seed)
    }
}

/// Classifier search settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub grid: ParamGrid,
    /// Folds used to score each grid candidate
    pub cv_folds: usize,
    /// Folds of the train/test split; the first is held out
    pub holdout_folds: usize,
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            grid: ParamGrid::default(),
            cv_folds: 5,
            holdout_folds: 2,
            bootstrap: true,
            seed: 0,
        }
    }
}

impl SearchConfig {
    pub fn grid_search(&self) -> GridSearch {
        GridSearch::new(self.grid.clone(), self.cv_folds)
            .with_bootstrap(self.bootstrap)
            .with_seed(self.seed)
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    InvalidError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::InvalidError(e) => write!(f, "Invalid config: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for whole-second durations.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.sample_rate_hz, 50);
        assert_eq!(config.window_length, Duration::from_secs(10));
        assert_eq!(config.features.len(), 9);
        assert_eq!(config.selection.strategy, SelectionStrategy::TopK(12));
        assert_eq!(config.search.grid.candidates().len(), 12);
        assert_eq!(config.metrics.sitting_label, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_window_spec_in_samples() {
        let spec = Config::default().window_spec().unwrap();
        assert_eq!(spec.length(), 500);
        assert_eq!(spec.overlap(), 50);
        assert_eq!(spec.step(), 450);
        assert_eq!(Config::default().epoch(), Duration::from_secs(9));
    }

    #[test]
    fn test_validation_failures() {
        let mut config = Config::default();
        config.window_overlap = Duration::from_secs(10);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.features.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.search.cv_folds = 1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.metrics.timezone = "Nowhere/Special".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.selection.strategy = SelectionStrategy::TopK(0);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("top_k"));

        let mut config = Config::default();
        config.selection.strategy = SelectionStrategy::TopK(1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"sample_rate_hz": 25, "search": {"cv_folds": 3}}"#).unwrap();
        assert_eq!(config.sample_rate_hz, 25);
        assert_eq!(config.search.cv_folds, 3);
        assert_eq!(config.search.holdout_folds, 2);
        assert_eq!(config.window_overlap, Duration::from_secs(1));
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir()
            .join(format!("accel-activity-config-{}", std::process::id()))
            .join("config.json");
        let mut config = Config::default();
        config.metrics.timezone = "Europe/London".to_string();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_error_display() {
        let err = ConfigError::InvalidError("bad".to_string());
        assert_eq!(err.to_string(), "Invalid config: bad");
    }
}
