//! YAML configuration for the lost-and-found matcher.
//!
//! One file configures the embedding client, the matcher defaults and logging.
//! Every section is optional; missing keys take their defaults.
//!
//! ## Example YAML Configuration
//!
//! ```yaml
//! version: "1.0"
//! name: "campus production"
//!
//! semantic:
//!   mode: "api"
//!   provider: "openai"
//!   model_name: "text-embedding-3-small"
//!   api_timeout_secs: 30
//!   retry:
//!     max_retries: 2
//!     base_delay: 200      # milliseconds
//!   circuit_breaker:
//!     failure_threshold: 5
//!     reset_timeout: 30000
//!   rate_limit:
//!     requests_per_second: 5.0
//!     burst_size: 10
//!
//! matcher:
//!   batch_size: 10
//!   default_limit: 20
//!   default_min_score: 0.3
//!
//! logging:
//!   filter: "info,matcher=debug"
//!   json: true
//! ```
//!
//! Credentials do not belong in the file. [`LostFoundConfig::load`] overlays
//! `LOSTFOUND_EMBEDDING_API_KEY` (or `OPENAI_API_KEY`) and
//! `LOSTFOUND_EMBEDDING_API_URL` after parsing.

use std::fs;
use std::path::Path;

use matcher::MatchConfig;
use semantic::SemanticConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Errors that can occur when loading YAML configuration files
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("unsupported config version: {0}")]
    UnsupportedVersion(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LostFoundConfig {
    /// Configuration format version
    #[serde(default = "default_version")]
    pub version: String,

    /// Optional configuration name/description
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub semantic: SemanticConfig,

    #[serde(default)]
    pub matcher: MatchConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl LostFoundConfig {
    /// Read, parse and validate `path`, then apply environment overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load a YAML configuration file from the given path
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse YAML configuration from a string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigLoadError> {
        let config: LostFoundConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay embedding credential and endpoint from the environment.
    pub fn apply_env_overrides(&mut self) {
        self.semantic.apply_env_overrides();
    }

    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        match self.version.as_str() {
            "1.0" | "1" => Ok(()),
            v => Err(ConfigLoadError::UnsupportedVersion(v.to_string())),
        }?;

        self.semantic
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("semantic: {e}")))?;
        self.matcher
            .validate()
            .map_err(|e| ConfigLoadError::Validation(format!("matcher: {e}")))?;
        self.logging.validate()?;
        Ok(())
    }
}

impl Default for LostFoundConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            name: None,
            semantic: SemanticConfig::default(),
            matcher: MatchConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Log output settings used by [`init_tracing`](crate::init_tracing).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive string, e.g. `"info,matcher=debug"`.
    pub filter: String,
    /// Emit JSON lines instead of the human-readable format.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json: false,
        }
    }
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), ConfigLoadError> {
        EnvFilter::try_new(&self.filter)
            .map(|_| ())
            .map_err(|e| ConfigLoadError::Validation(format!("logging.filter: {e}")))
    }
}

fn default_version() -> String {
    "1.0".to_string()
}
