use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Which prediction fallback the engine is built with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictorKind {
    /// Learn from the trained-case log (default)
    Cases,
    /// Stateless attribute/XPath/role templates
    Templates,
    /// No prediction stage
    None,
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Strategy store file
    pub store_path: PathBuf,

    /// Prediction model / training log file
    pub model_path: PathBuf,

    /// Wait for stored and original selectors (ms)
    pub store_timeout_ms: u64,

    /// Wait for heuristic and predicted candidates (ms)
    pub candidate_timeout_ms: u64,

    /// How many ranked candidates a stage attempts before giving up
    pub max_candidate_attempts: usize,

    /// Upper bound on candidates returned by a predictor
    pub max_predictions: usize,

    /// Age threshold used by `prune` when no explicit value is given (days)
    pub stale_days: u64,

    pub predictor: PredictorKind,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("locator_db.json"),
            model_path: PathBuf::from("model_data.json"),
            store_timeout_ms: 5000,
            candidate_timeout_ms: 2000,
            max_candidate_attempts: 5,
            max_predictions: 10,
            stale_days: 30,
            predictor: PredictorKind::Cases,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load from default locations:
    /// 1. ./lumi-healer.yaml
    /// 2. ~/.lumi-healer/config.yaml
    /// 3. Default configuration
    pub fn load_default() -> Result<Config, ConfigError> {
        let local_config = PathBuf::from("./lumi-healer.yaml");
        if local_config.exists() {
            return Self::load_from(&local_config);
        }

        if let Some(home) = dirs::home_dir() {
            let home_config = home.join(".lumi-healer").join("config.yaml");
            if home_config.exists() {
                return Self::load_from(&home_config);
            }
        }

        Ok(Config::default())
    }

    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Config, ConfigError> {
        let config: Config = serde_yaml::from_str(content)?;
        Ok(config)
    }
}
