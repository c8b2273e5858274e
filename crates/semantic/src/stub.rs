use async_trait::async_trait;
use fxhash::hash64;

use crate::types::EmbeddingVector;
use crate::{SemanticConfig, SemanticError, TextEmbedder};

/// Deterministic offline embedder.
///
/// Feature hashing over lowercase alphanumeric tokens: every token adds ±1 to
/// one of `dim` buckets chosen by its hash, and the result is L2-normalized.
/// Equal texts give equal vectors (cosine 1.0) and texts sharing words score
/// higher than unrelated ones, which is enough for tests and local demos. It
/// has no notion of synonyms.
#[derive(Debug, Clone)]
pub struct StubEmbedder {
    dim: usize,
    model_name: String,
}

impl StubEmbedder {
    pub fn new(dim: usize) -> Self {
        Self {
            dim: dim.max(1),
            model_name: format!("stub-hash-{}", dim.max(1)),
        }
    }

    pub fn from_config(cfg: &SemanticConfig) -> Result<Self, SemanticError> {
        if cfg.stub_dim == 0 {
            return Err(SemanticError::InvalidConfig(
                "stub_dim must be greater than zero".into(),
            ));
        }
        Ok(Self::new(cfg.stub_dim))
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Embed a single text synchronously.
    pub fn embed_one(&self, text: &str) -> EmbeddingVector {
        let mut v = vec![0f32; self.dim];
        let lowered = text.to_lowercase();
        for token in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let h = hash64(token.as_bytes());
            let bucket = (h % self.dim as u64) as usize;
            let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
            v[bucket] += sign;
        }
        l2_normalize_in_place(&mut v);
        v
    }
}

#[async_trait]
impl TextEmbedder for StubEmbedder {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>, SemanticError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

fn l2_normalize_in_place(v: &mut [f32]) {
    let norm_sq: f32 = v.iter().map(|x| x * x).sum();
    if norm_sq > 0.0 {
        let inv = norm_sq.sqrt().recip();
        v.iter_mut().for_each(|x| *x *= inv);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn same_text_same_vector() {
        let stub = StubEmbedder::new(64);
        assert_eq!(stub.embed_one("Red Wallet"), stub.embed_one("Red Wallet"));
    }

    #[test]
    fn case_and_punctuation_insensitive() {
        let stub = StubEmbedder::new(64);
        assert_eq!(stub.embed_one("Red Wallet."), stub.embed_one("red wallet"));
    }

    #[test]
    fn output_is_unit_length() {
        let stub = StubEmbedder::new(128);
        let v = stub.embed_one("black backpack near the student union");
        let norm = dot(&v, &v).sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        assert_eq!(v.len(), 128);
    }

    #[test]
    fn shared_words_score_higher_than_unrelated() {
        let stub = StubEmbedder::new(384);
        let q = stub.embed_one("red wallet with cards");
        let wallet = stub.embed_one("Red Wallet");
        let pen = stub.embed_one("Blue Pen");
        assert!(dot(&q, &wallet) > dot(&q, &pen));
    }

    #[test]
    fn empty_text_is_zero_vector() {
        let stub = StubEmbedder::new(8);
        assert!(stub.embed_one("  ...  ").iter().all(|x| *x == 0.0));
    }

    #[test]
    fn zero_dim_config_rejected() {
        let cfg = SemanticConfig {
            stub_dim: 0,
            ..SemanticConfig::stub()
        };
        assert!(StubEmbedder::from_config(&cfg).is_err());
    }

    #[tokio::test]
    async fn batch_preserves_order() {
        let stub = StubEmbedder::new(32);
        let inputs = vec!["first".to_string(), "second".to_string()];
        let out = stub.embed_texts(&inputs).await.unwrap();
        assert_eq!(out[0], stub.embed_one("first"));
        assert_eq!(out[1], stub.embed_one("second"));
        assert_eq!(stub.model_name(), "stub-hash-32");
    }
}
