use serde::{Deserialize, Serialize};

/// One embedding as returned by a provider. Dimensionality is fixed per model.
pub type EmbeddingVector = Vec<f32>;

/// Which embedder [`build_embedder`](crate::build_embedder) constructs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderMode {
    /// Remote HTTP provider.
    #[default]
    Api,
    /// Deterministic in-process feature hashing; no network, no credential.
    Stub,
}

/// Request/response dialect spoken by the remote provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ApiProvider {
    /// `{"input": [...], "model": m}` → `{"data": [{"embedding": [...]}]}`
    #[default]
    #[serde(alias = "open_ai")]
    OpenAi,
    /// `{"inputs": [...]}` → `[[...], ...]`
    #[serde(alias = "hf")]
    HuggingFace,
    /// `{"texts": [...]}` → `{"embeddings": [[...], ...]}`
    Custom,
}

impl ApiProvider {
    /// Stable lowercase name used in logs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiProvider::OpenAi => "openai",
            ApiProvider::HuggingFace => "huggingface",
            ApiProvider::Custom => "custom",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_names_are_stable() {
        assert_eq!(ApiProvider::OpenAi.as_str(), "openai");
        assert_eq!(ApiProvider::HuggingFace.as_str(), "huggingface");
        assert_eq!(ApiProvider::Custom.as_str(), "custom");
    }

    #[test]
    fn provider_aliases_deserialize() {
        let p: ApiProvider = serde_json::from_str("\"hf\"").unwrap();
        assert_eq!(p, ApiProvider::HuggingFace);
        let p: ApiProvider = serde_json::from_str("\"openai\"").unwrap();
        assert_eq!(p, ApiProvider::OpenAi);
    }

    #[test]
    fn mode_defaults_to_api() {
        assert_eq!(EmbedderMode::default(), EmbedderMode::Api);
        let m: EmbedderMode = serde_json::from_str("\"stub\"").unwrap();
        assert_eq!(m, EmbedderMode::Stub);
    }
}
