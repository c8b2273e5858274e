use serde::{Deserialize, Serialize};

use crate::error::SemanticError;
use crate::resilience::{CircuitBreakerConfig, RateLimitConfig, RetryConfig};
use crate::types::{ApiProvider, EmbedderMode};

/// Endpoint used when the provider is OpenAI and no `api_url` is configured.
pub const OPENAI_EMBEDDINGS_URL: &str = "https://api.openai.com/v1/embeddings";

/// Model requested from the provider unless overridden.
pub const DEFAULT_MODEL_NAME: &str = "text-embedding-3-small";

/// Primary env var holding the provider credential.
pub const ENV_API_KEY: &str = "LOSTFOUND_EMBEDDING_API_KEY";
/// Consulted when [`ENV_API_KEY`] is unset.
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
/// Overrides `api_url`.
pub const ENV_API_URL: &str = "LOSTFOUND_EMBEDDING_API_URL";

/// Runtime configuration for the embedding provider.
///
/// Nothing is read from the environment unless [`SemanticConfig::from_env`] or
/// [`SemanticConfig::apply_env_overrides`] is called.
///
/// # Example
/// ```
/// use semantic::{SemanticConfig, EmbedderMode};
///
/// let cfg = SemanticConfig {
///     api_key: Some("sk-test".into()),
///     ..Default::default()
/// };
/// assert_eq!(cfg.mode, EmbedderMode::Api);
/// assert!(cfg.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SemanticConfig {
    /// `"api"` (remote HTTP) or `"stub"` (offline feature hashing).
    pub mode: EmbedderMode,
    /// Wire dialect of the remote provider.
    pub provider: ApiProvider,
    /// Model requested from the provider; also reported in logs.
    pub model_name: String,
    /// Embedding endpoint. Falls back to [`OPENAI_EMBEDDINGS_URL`] for OpenAI.
    pub api_url: Option<String>,
    /// Bearer credential. Absent means every API call fails with
    /// [`SemanticError::MissingCredential`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Per-request timeout in seconds.
    pub api_timeout_secs: u64,
    /// Vector width produced by the stub embedder.
    pub stub_dim: usize,
    /// Retry policy for transient provider failures.
    pub retry: RetryConfig,
    /// Circuit breaker guarding the provider.
    pub circuit_breaker: CircuitBreakerConfig,
    /// Client-side request budget.
    pub rate_limit: RateLimitConfig,
    /// Turn retry, circuit breaker and rate limiting on or off as a group.
    pub enable_resilience: bool,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            mode: EmbedderMode::Api,
            provider: ApiProvider::OpenAi,
            model_name: DEFAULT_MODEL_NAME.into(),
            api_url: None,
            api_key: None,
            api_timeout_secs: 30,
            stub_dim: 384,
            retry: RetryConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            rate_limit: RateLimitConfig::default(),
            enable_resilience: true,
        }
    }
}

impl SemanticConfig {
    /// Offline configuration backed by the deterministic stub embedder.
    pub fn stub() -> Self {
        Self {
            mode: EmbedderMode::Stub,
            ..Self::default()
        }
    }

    /// Default configuration with credential and endpoint taken from the
    /// environment (see [`SemanticConfig::apply_env_overrides`]).
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.apply_env_overrides();
        cfg
    }

    /// Overlay `LOSTFOUND_EMBEDDING_API_KEY` (or `OPENAI_API_KEY`) and
    /// `LOSTFOUND_EMBEDDING_API_URL` onto this config. Unset or blank
    /// variables leave the current values alone.
    pub fn apply_env_overrides(&mut self) {
        let key = env_non_blank(ENV_API_KEY).or_else(|| env_non_blank(ENV_OPENAI_API_KEY));
        if key.is_some() {
            self.api_key = key;
        }
        if let Some(url) = env_non_blank(ENV_API_URL) {
            self.api_url = Some(url);
        }
    }

    /// Endpoint to call, resolving the OpenAI default.
    pub fn resolved_api_url(&self) -> Option<&str> {
        match self.api_url.as_deref() {
            Some(url) if !url.trim().is_empty() => Some(url),
            _ if self.provider == ApiProvider::OpenAi => Some(OPENAI_EMBEDDINGS_URL),
            _ => None,
        }
    }

    /// Check structural invariants. A missing credential is not
    /// reported here: it surfaces per call as [`SemanticError::MissingCredential`].
    pub fn validate(&self) -> Result<(), SemanticError> {
        if self.model_name.trim().is_empty() {
            return Err(SemanticError::InvalidConfig(
                "model_name must not be empty".into(),
            ));
        }
        match self.mode {
            EmbedderMode::Api => {
                if self.resolved_api_url().is_none() {
                    return Err(SemanticError::InvalidConfig(format!(
                        "api_url is required for provider '{}'",
                        self.provider.as_str()
                    )));
                }
                if self.api_timeout_secs == 0 {
                    return Err(SemanticError::InvalidConfig(
                        "api_timeout_secs must be greater than zero".into(),
                    ));
                }
            }
            EmbedderMode::Stub => {
                if self.stub_dim == 0 {
                    return Err(SemanticError::InvalidConfig(
                        "stub_dim must be greater than zero".into(),
                    ));
                }
            }
        }
        let rps = self.rate_limit.requests_per_second;
        if !(rps.is_finite() && rps > 0.0) {
            return Err(SemanticError::InvalidConfig(
                "rate_limit.requests_per_second must be a positive finite number".into(),
            ));
        }
        if self.rate_limit.burst_size == 0 {
            return Err(SemanticError::InvalidConfig(
                "rate_limit.burst_size must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn env_non_blank(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
