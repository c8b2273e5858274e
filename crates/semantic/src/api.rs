use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::resilience::{retry_async, CircuitBreaker, RetryOutcome, TokenBucket};
use crate::types::{ApiProvider, EmbeddingVector};
use crate::{SemanticConfig, SemanticError, TextEmbedder};

/// Longest provider error body kept in [`SemanticError::Status`].
const MAX_ERROR_BODY: usize = 512;

/// Embedder backed by a remote HTTP embedding endpoint.
///
/// Owns its HTTP client (connection pool), circuit breaker and token bucket.
/// Build one per provider and share it behind an `Arc`.
pub struct ApiEmbedder {
    cfg: SemanticConfig,
    client: reqwest::Client,
    breaker: CircuitBreaker,
    limiter: TokenBucket,
}

impl std::fmt::Debug for ApiEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiEmbedder")
            .field("provider", &self.cfg.provider)
            .field("model_name", &self.cfg.model_name)
            .field("api_url", &self.cfg.resolved_api_url())
            .field("has_credential", &self.cfg.api_key.is_some())
            .finish()
    }
}

impl ApiEmbedder {
    /// Validate `cfg` and build the HTTP client. A missing credential is not an
    /// error here; it is reported by every call instead.
    pub fn new(cfg: SemanticConfig) -> Result<Self, SemanticError> {
        cfg.validate()?;
        let timeout = Duration::from_secs(cfg.api_timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .pool_max_idle_per_host(8)
            .build()
            .map_err(|e| SemanticError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            breaker: CircuitBreaker::new(cfg.circuit_breaker),
            limiter: TokenBucket::new(cfg.rate_limit),
            client,
            cfg,
        })
    }

    pub fn config(&self) -> &SemanticConfig {
        &self.cfg
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    fn credential(&self) -> Result<&str, SemanticError> {
        match self.cfg.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(SemanticError::MissingCredential(format!(
                "no API key configured for provider '{}'; set {} or {}",
                self.cfg.provider.as_str(),
                crate::config::ENV_API_KEY,
                crate::config::ENV_OPENAI_API_KEY,
            ))),
        }
    }

    async fn send(&self, url: &str, key: &str, payload: &Value) -> Result<Value, SemanticError> {
        let response = self
            .client
            .post(url)
            .bearer_auth(key)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let cut = (0..=MAX_ERROR_BODY)
                    .rev()
                    .find(|&i| body.is_char_boundary(i))
                    .unwrap_or(0);
                body.truncate(cut);
            }
            return Err(SemanticError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| SemanticError::MalformedResponse(e.to_string()))
    }
}

#[async_trait]
impl TextEmbedder for ApiEmbedder {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<EmbeddingVector>, SemanticError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let key = self.credential()?;
        let url = self.cfg.resolved_api_url().ok_or_else(|| {
            SemanticError::InvalidConfig(format!(
                "api_url is required for provider '{}'",
                self.cfg.provider.as_str()
            ))
        })?;
        let provider = self.cfg.provider.as_str();
        let resilient = self.cfg.enable_resilience;

        if resilient {
            if !self.breaker.allow_request() {
                return Err(SemanticError::CircuitOpen(provider.to_string()));
            }
            if !self.limiter.acquire().await {
                return Err(SemanticError::RateLimited(provider.to_string()));
            }
        }

        let start = Instant::now();
        let payload = build_payload(self.cfg.provider, texts, &self.cfg.model_name);
        let payload = &payload;

        let outcome: RetryOutcome<Value, SemanticError> = if resilient {
            retry_async(&self.cfg.retry, SemanticError::is_retryable, |attempt| async move {
                if attempt > 0 {
                    warn!(provider, attempt, "embedding_retry");
                }
                self.send(url, key, payload).await
            })
            .await
        } else {
            RetryOutcome {
                result: self.send(url, key, payload).await,
                attempts: 1,
                total_duration: start.elapsed(),
            }
        };

        let attempts = outcome.attempts;
        let result = outcome
            .into_result()
            .and_then(|value| parse_embeddings(value, texts.len()));

        match &result {
            Ok(vectors) => {
                if resilient {
                    self.breaker.record_success();
                }
                debug!(
                    provider,
                    inputs = texts.len(),
                    dim = vectors.first().map(Vec::len).unwrap_or(0),
                    attempts,
                    elapsed_micros = start.elapsed().as_micros() as u64,
                    "embedding_success"
                );
            }
            Err(err) => {
                if resilient {
                    // A refused credential still proves the provider is up.
                    if err.is_configuration() {
                        self.breaker.record_success();
                    } else {
                        self.breaker.record_failure();
                    }
                }
                warn!(
                    provider,
                    inputs = texts.len(),
                    attempts,
                    error = %err,
                    elapsed_micros = start.elapsed().as_micros() as u64,
                    "embedding_failure"
                );
            }
        }

        result
    }

    fn model_name(&self) -> &str {
        &self.cfg.model_name
    }
}

/// Request body in the provider's dialect. Inputs are always sent as a list,
/// including single-text calls, so one response shape covers both.
fn build_payload(provider: ApiProvider, texts: &[String], model_name: &str) -> Value {
    match provider {
        ApiProvider::OpenAi => json!({ "input": texts, "model": model_name }),
        ApiProvider::HuggingFace => json!({ "inputs": texts }),
        ApiProvider::Custom => json!({ "texts": texts, "model": model_name }),
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiDatum {
    embedding: Vec<f32>,
    #[serde(default)]
    index: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EmbeddingResponse {
    OpenAi { data: Vec<OpenAiDatum> },
    Custom { embeddings: Vec<Vec<f32>> },
    Batch(Vec<Vec<f32>>),
    Single(Vec<f32>),
}

/// Decode any supported response shape into one vector per input, in input order.
fn parse_embeddings(value: Value, expected: usize) -> Result<Vec<EmbeddingVector>, SemanticError> {
    let response: EmbeddingResponse = serde_json::from_value(value).map_err(|e| {
        SemanticError::MalformedResponse(format!("unsupported embedding response shape: {e}"))
    })?;

    let vectors = match response {
        EmbeddingResponse::OpenAi { mut data } => {
            if data.iter().all(|d| d.index.is_some()) {
                data.sort_by_key(|d| d.index);
            }
            data.into_iter().map(|d| d.embedding).collect()
        }
        EmbeddingResponse::Custom { embeddings } => embeddings,
        EmbeddingResponse::Batch(batch) => batch,
        EmbeddingResponse::Single(vector) => vec![vector],
    };

    if vectors.len() != expected {
        return Err(SemanticError::CountMismatch {
            expected,
            returned: vectors.len(),
        });
    }
    if let Some(pos) = vectors.iter().position(|v| v.is_empty()) {
        return Err(SemanticError::MalformedResponse(format!(
            "embedding {pos} is empty"
        )));
    }
    Ok(vectors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::{CircuitBreakerConfig, CircuitState, RetryConfig};
    use crate::ErrorKind;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    /// Answer the next `connections` requests on a local port with a fixed
    /// response. Returns the endpoint URL.
    fn serve_canned(status_line: &'static str, body: &'static str, connections: usize) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            for stream in listener.incoming().take(connections) {
                let mut stream = stream.unwrap();
                drain_request(&mut stream);
                let response = format!(
                    "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(response.as_bytes()).unwrap();
            }
        });
        format!("http://{addr}/v1/embeddings")
    }

    fn drain_request(stream: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
                let body_len = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + body_len {
                    return;
                }
            }
        }
    }

    fn local_config(url: String) -> SemanticConfig {
        SemanticConfig {
            api_url: Some(url),
            ..unreachable_config()
        }
    }

    /// Nothing listens on port 1 locally, so connects fail fast without DNS.
    fn unreachable_config() -> SemanticConfig {
        SemanticConfig {
            api_url: Some("http://127.0.0.1:1/v1/embeddings".into()),
            api_key: Some("sk-test".into()),
            api_timeout_secs: 2,
            retry: RetryConfig::default()
                .with_max_retries(0)
                .with_base_delay(Duration::ZERO),
            ..SemanticConfig::default()
        }
    }

    #[test]
    fn openai_payload_shape() {
        let payload = build_payload(ApiProvider::OpenAi, &texts(&["a", "b"]), "m");
        assert_eq!(payload, json!({ "input": ["a", "b"], "model": "m" }));
    }

    #[test]
    fn huggingface_and_custom_payload_shapes() {
        let hf = build_payload(ApiProvider::HuggingFace, &texts(&["a"]), "m");
        assert_eq!(hf, json!({ "inputs": ["a"] }));
        let custom = build_payload(ApiProvider::Custom, &texts(&["a"]), "m");
        assert_eq!(custom, json!({ "texts": ["a"], "model": "m" }));
    }

    #[test]
    fn parses_openai_response_in_index_order() {
        let value = json!({
            "object": "list",
            "data": [
                { "object": "embedding", "index": 1, "embedding": [0.0, 1.0] },
                { "object": "embedding", "index": 0, "embedding": [1.0, 0.0] }
            ],
            "model": "text-embedding-3-small"
        });
        let vectors = parse_embeddings(value, 2).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn parses_custom_batch_and_single_shapes() {
        let custom = parse_embeddings(json!({ "embeddings": [[1.0], [2.0]] }), 2).unwrap();
        assert_eq!(custom, vec![vec![1.0], vec![2.0]]);

        let batch = parse_embeddings(json!([[1.0, 2.0], [3.0, 4.0]]), 2).unwrap();
        assert_eq!(batch.len(), 2);

        let single = parse_embeddings(json!([0.5, 0.25]), 1).unwrap();
        assert_eq!(single, vec![vec![0.5, 0.25]]);
    }

    #[test]
    fn count_mismatch_is_provider_error() {
        let err = parse_embeddings(json!([[1.0], [2.0]]), 3).unwrap_err();
        assert_eq!(
            err,
            SemanticError::CountMismatch {
                expected: 3,
                returned: 2
            }
        );
        assert_eq!(err.kind(), ErrorKind::Provider);
    }

    #[test]
    fn unsupported_shape_is_malformed() {
        let err = parse_embeddings(json!({ "error": "nope" }), 1).unwrap_err();
        assert!(matches!(err, SemanticError::MalformedResponse(_)));
        let err = parse_embeddings(json!([["x"]]), 1).unwrap_err();
        assert!(matches!(err, SemanticError::MalformedResponse(_)));
    }

    #[test]
    fn empty_vector_rejected() {
        let err = parse_embeddings(json!({ "embeddings": [[]] }), 1).unwrap_err();
        assert!(matches!(err, SemanticError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn missing_credential_is_configuration_error() {
        let embedder = ApiEmbedder::new(SemanticConfig::default()).unwrap();
        let err = embedder.embed_texts(&texts(&["wallet"])).await.unwrap_err();
        assert!(matches!(err, SemanticError::MissingCredential(_)));
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn blank_credential_counts_as_missing() {
        let embedder = ApiEmbedder::new(SemanticConfig {
            api_key: Some("   ".into()),
            ..SemanticConfig::default()
        })
        .unwrap();
        let err = embedder.embed_texts(&texts(&["wallet"])).await.unwrap_err();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn empty_input_makes_no_call() {
        let embedder = ApiEmbedder::new(SemanticConfig::default()).unwrap();
        assert!(embedder.embed_texts(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unreachable_provider_is_provider_error() {
        let embedder = ApiEmbedder::new(unreachable_config()).unwrap();
        let err = embedder.embed_texts(&texts(&["wallet"])).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Provider, "{err}");
    }

    #[tokio::test]
    async fn embeds_against_local_endpoint() {
        let url = serve_canned(
            "200 OK",
            r#"{"data":[{"index":1,"embedding":[0.0,1.0]},{"index":0,"embedding":[1.0,0.0]}]}"#,
            1,
        );
        let embedder = ApiEmbedder::new(local_config(url)).unwrap();
        let vectors = embedder.embed_texts(&texts(&["a", "b"])).await.unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn rejected_key_is_configuration_error() {
        let url = serve_canned(
            "401 Unauthorized",
            r#"{"error":{"message":"Incorrect API key provided: sk-bad","type":"invalid_request_error","code":"invalid_api_key"}}"#,
            1,
        );
        let embedder = ApiEmbedder::new(SemanticConfig {
            api_key: Some("sk-bad".into()),
            circuit_breaker: CircuitBreakerConfig::default().with_failure_threshold(1),
            ..local_config(url)
        })
        .unwrap();

        let err = embedder.embed_texts(&texts(&["wallet"])).await.unwrap_err();
        assert!(matches!(err, SemanticError::Status { status: 401, .. }), "{err}");
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("Incorrect API key"));
        assert_eq!(embedder.circuit_breaker().current_state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn breaker_opens_after_repeated_failures() {
        let embedder = ApiEmbedder::new(SemanticConfig {
            circuit_breaker: CircuitBreakerConfig::default()
                .with_failure_threshold(1)
                .with_reset_timeout(Duration::from_secs(60)),
            ..unreachable_config()
        })
        .unwrap();

        let first = embedder.embed_texts(&texts(&["a"])).await.unwrap_err();
        assert!(!matches!(first, SemanticError::CircuitOpen(_)));
        assert_eq!(embedder.circuit_breaker().current_state(), CircuitState::Open);

        let second = embedder.embed_texts(&texts(&["a"])).await.unwrap_err();
        assert_eq!(second, SemanticError::CircuitOpen("openai".into()));
    }

    #[tokio::test]
    async fn disabled_resilience_skips_breaker() {
        let embedder = ApiEmbedder::new(SemanticConfig {
            enable_resilience: false,
            circuit_breaker: CircuitBreakerConfig::default().with_failure_threshold(1),
            ..unreachable_config()
        })
        .unwrap();

        for _ in 0..2 {
            let err = embedder.embed_texts(&texts(&["a"])).await.unwrap_err();
            assert!(!matches!(err, SemanticError::CircuitOpen(_)));
        }
        assert_eq!(embedder.circuit_breaker().current_state(), CircuitState::Closed);
    }

    #[test]
    fn invalid_config_rejected_at_construction() {
        let err = ApiEmbedder::new(SemanticConfig {
            provider: ApiProvider::Custom,
            ..SemanticConfig::default()
        })
        .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn debug_output_hides_credential() {
        let embedder = ApiEmbedder::new(SemanticConfig {
            api_key: Some("sk-secret".into()),
            ..SemanticConfig::default()
        })
        .unwrap();
        let rendered = format!("{embedder:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("has_credential: true"));
    }
}
