//! Lost-and-found embedding provider client
//!
//! This crate turns item descriptions into vectors for the matcher. Everything
//! goes through one seam, [`TextEmbedder`]: hand it a handful of strings, get
//! one vector per string back, in the same order.
//!
//! Two implementations ship here:
//!
//! - [`ApiEmbedder`] - Calls a remote HTTP endpoint (OpenAI by default, Hugging
//!   Face and a plain custom JSON dialect also understood). Retries transient
//!   failures, trips a circuit breaker when the provider keeps failing, and
//!   paces itself with a token bucket.
//! - [`StubEmbedder`] - Deterministic feature hashing. No network, no key.
//!   Good for tests and for running the app locally.
//!
//! ## Errors
//!
//! Every failure is a [`SemanticError`], and every [`SemanticError`] is either
//! [`ErrorKind::Configuration`] (no credential, bad endpoint; somebody has to
//! fix the deployment) or [`ErrorKind::Provider`] (network, HTTP status,
//! garbage body, rate limit, open circuit; worth degrading around).
//!
//! ## Quick example
//!
//! ```no_run
//! use semantic::{build_embedder, SemanticConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let cfg = SemanticConfig {
//!         api_key: Some("sk-...".into()),
//!         ..Default::default()
//!     };
//!     let embedder = build_embedder(&cfg).unwrap();
//!     let vectors = embedder
//!         .embed_texts(&["Red Wallet. Color: red".to_string()])
//!         .await
//!         .unwrap();
//!     assert_eq!(vectors.len(), 1);
//! }
//! ```
//!
//! ## Env vars to know
//!
//! - `LOSTFOUND_EMBEDDING_API_KEY` - Provider credential (`OPENAI_API_KEY` is
//!   consulted when unset)
//! - `LOSTFOUND_EMBEDDING_API_URL` - Override the endpoint

pub mod config;
pub mod error;
pub mod resilience;
pub mod types;
mod serde_millis;

mod api;
mod stub;

use std::sync::Arc;

use async_trait::async_trait;

pub use crate::api::ApiEmbedder;
pub use crate::config::SemanticConfig;
pub use crate::error::{ErrorKind, SemanticError};
pub use crate::stub::StubEmbedder;
pub use crate::types::{ApiProvider, EmbedderMode, EmbeddingVector};

/// Source of text embeddings.
///
/// Implementations return exactly one vector per input, in input order, and
/// all vectors from one embedder share a dimensionality.
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    /// Embed a batch of texts.
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>, SemanticError>;

    /// Model identifier, for logs.
    fn model_name(&self) -> &str;

    /// Embed a single text.
    async fn embed_text(&self, text: &str) -> Result<EmbeddingVector, SemanticError> {
        let vectors = self.embed_texts(&[text.to_string()]).await?;
        let [vector]: [EmbeddingVector; 1] =
            vectors
                .try_into()
                .map_err(|rest: Vec<EmbeddingVector>| SemanticError::CountMismatch {
                    expected: 1,
                    returned: rest.len(),
                })?;
        Ok(vector)
    }
}

/// Build the embedder selected by `cfg.mode`.
pub fn build_embedder(cfg: &SemanticConfig) -> Result<Arc<dyn TextEmbedder>, SemanticError> {
    match cfg.mode {
        EmbedderMode::Api => Ok(Arc::new(ApiEmbedder::new(cfg.clone())?)),
        EmbedderMode::Stub => Ok(Arc::new(StubEmbedder::from_config(cfg)?)),
    }
}
