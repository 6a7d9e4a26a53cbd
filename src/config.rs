use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable naming the deployment environment.
pub const ENV_VAR: &str = "APP_ENV";

pub const DEFAULT_SLOW_QUERY_THRESHOLD_MS: u64 = 100;
pub const DEFAULT_N_PLUS_ONE_THRESHOLD: usize = 3;
/// Smallest repeat count that can meaningfully be called N+1.
pub const MIN_N_PLUS_ONE_THRESHOLD: usize = 2;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("n_plus_one_threshold must be at least 2, got {0}")]
    InvalidNPlusOneThreshold(usize),
    #[error("could not determine config directory")]
    NoConfigDir,
}

/// Deployment environment, read once from [`ENV_VAR`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
    Other(String),
    Unset,
}

impl Environment {
    pub fn from_env() -> Self {
        match std::env::var(ENV_VAR) {
            Ok(value) => Self::parse(&value),
            Err(_) => Self::Unset,
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "" => Self::Unset,
            "development" | "dev" => Self::Development,
            "test" | "testing" => Self::Test,
            "production" | "prod" => Self::Production,
            other => Self::Other(other.to_string()),
        }
    }

    /// Only development and test runs get the analyzer by default.
    pub fn enables_analyzer(&self) -> bool {
        matches!(self, Self::Development | Self::Test)
    }
}

/// Analyzer settings as written in `config.toml`.
///
/// Missing keys fall back to the defaults; `enabled` left unset means
/// "decide from the environment".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub slow_query_threshold_ms: u64,
    pub n_plus_one_threshold: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            slow_query_threshold_ms: DEFAULT_SLOW_QUERY_THRESHOLD_MS,
            n_plus_one_threshold: DEFAULT_N_PLUS_ONE_THRESHOLD,
            enabled: None,
        }
    }
}

impl AnalyzerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_slow_query_threshold_ms(mut self, ms: u64) -> Self {
        self.slow_query_threshold_ms = ms;
        self
    }

    pub fn with_n_plus_one_threshold(mut self, count: usize) -> Self {
        self.n_plus_one_threshold = count;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Explicit `enabled` wins; otherwise ask the environment.
    pub fn resolve_enabled(&self) -> bool {
        self.enabled
            .unwrap_or_else(|| Environment::from_env().enables_analyzer())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_plus_one_threshold < MIN_N_PLUS_ONE_THRESHOLD {
            return Err(ConfigError::InvalidNPlusOneThreshold(self.n_plus_one_threshold));
        }
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("querywatch").join("config.toml"))
    }

    /// Load from the user config directory, or defaults if no file exists.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AnalyzerConfig =
            toml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }
}
