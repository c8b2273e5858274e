use thiserror::Error;

/// Coarse classification of a [`SemanticError`].
///
/// Only [`ErrorKind::Provider`] failures may be recovered locally; a
/// [`ErrorKind::Configuration`] failure has to reach the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The embedder is not usable as configured (no credential, no endpoint,
    /// or a credential the provider refuses).
    Configuration,
    /// The provider was reached (or tried) and failed.
    Provider,
}

/// Errors surfaced by [`TextEmbedder`](crate::TextEmbedder) implementations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SemanticError {
    /// No API credential is available for the configured provider.
    #[error("embedding provider credential missing: {0}")]
    MissingCredential(String),
    /// Configuration is inconsistent (e.g. api mode without an endpoint).
    #[error("invalid semantic config: {0}")]
    InvalidConfig(String),
    /// Transport-level failure: DNS, connect, TLS, timeout.
    #[error("http request failed: {0}")]
    Http(String),
    /// The provider answered with a non-success status. 401 and 403 mean the
    /// credential was refused and classify as configuration errors.
    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    /// The response body could not be interpreted as embeddings.
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),
    /// The provider returned a different number of vectors than inputs.
    #[error("provider returned {returned} embeddings for {expected} inputs")]
    CountMismatch { expected: usize, returned: usize },
    /// The local token bucket had no capacity within the configured wait.
    #[error("rate limit exceeded for provider '{0}'")]
    RateLimited(String),
    /// The circuit breaker is open after repeated failures.
    #[error("circuit breaker is open for provider '{0}'")]
    CircuitOpen(String),
}

impl SemanticError {
    /// Map the error onto the configuration/provider split.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SemanticError::MissingCredential(_) | SemanticError::InvalidConfig(_) => {
                ErrorKind::Configuration
            }
            SemanticError::Status { status, .. } if is_credential_rejection(*status) => {
                ErrorKind::Configuration
            }
            SemanticError::Http(_)
            | SemanticError::Status { .. }
            | SemanticError::MalformedResponse(_)
            | SemanticError::CountMismatch { .. }
            | SemanticError::RateLimited(_)
            | SemanticError::CircuitOpen(_) => ErrorKind::Provider,
        }
    }

    /// Shorthand for `kind() == ErrorKind::Configuration`.
    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }

    /// Whether another attempt against the provider could succeed.
    ///
    /// Transport failures, 408, 429 and 5xx are transient. Other 4xx answers,
    /// unparseable bodies and configuration problems are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            SemanticError::Http(_) => true,
            SemanticError::Status { status, .. } => {
                matches!(*status, 408 | 429) || (500..=599).contains(status)
            }
            SemanticError::RateLimited(_) => true,
            SemanticError::MissingCredential(_)
            | SemanticError::InvalidConfig(_)
            | SemanticError::MalformedResponse(_)
            | SemanticError::CountMismatch { .. }
            | SemanticError::CircuitOpen(_) => false,
        }
    }
}

fn is_credential_rejection(status: u16) -> bool {
    matches!(status, 401 | 403)
}

impl From<reqwest::Error> for SemanticError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SemanticError::MalformedResponse(err.to_string())
        } else {
            SemanticError::Http(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_variants_classified() {
        assert_eq!(
            SemanticError::MissingCredential("openai".into()).kind(),
            ErrorKind::Configuration
        );
        assert!(SemanticError::InvalidConfig("api_url".into()).is_configuration());
    }

    #[test]
    fn provider_variants_classified() {
        let variants = vec![
            SemanticError::Http("connection refused".into()),
            SemanticError::Status {
                status: 503,
                body: String::new(),
            },
            SemanticError::MalformedResponse("not json".into()),
            SemanticError::CountMismatch {
                expected: 3,
                returned: 2,
            },
            SemanticError::RateLimited("openai".into()),
            SemanticError::CircuitOpen("openai".into()),
        ];

        for err in variants {
            assert_eq!(err.kind(), ErrorKind::Provider, "{err}");
            assert!(!err.is_configuration());
        }
    }

    #[test]
    fn rejected_credential_is_configuration() {
        for status in [401u16, 403] {
            let err = SemanticError::Status {
                status,
                body: "Incorrect API key provided: sk-bad".into(),
            };
            assert_eq!(err.kind(), ErrorKind::Configuration, "{status}");
            assert!(!err.is_retryable());
        }
        let err = SemanticError::Status {
            status: 404,
            body: String::new(),
        };
        assert_eq!(err.kind(), ErrorKind::Provider);
    }

    #[test]
    fn retryable_statuses() {
        for status in [408u16, 429, 500, 502, 503, 504] {
            let err = SemanticError::Status {
                status,
                body: String::new(),
            };
            assert!(err.is_retryable(), "{status} should be retryable");
        }
        for status in [400u16, 401, 403, 404, 422] {
            let err = SemanticError::Status {
                status,
                body: String::new(),
            };
            assert!(!err.is_retryable(), "{status} should not be retryable");
        }
    }

    #[test]
    fn credential_errors_never_retried() {
        assert!(!SemanticError::MissingCredential("openai".into()).is_retryable());
        assert!(SemanticError::Http("timeout".into()).is_retryable());
    }

    #[test]
    fn display_includes_context() {
        let err = SemanticError::CountMismatch {
            expected: 10,
            returned: 9,
        };
        assert_eq!(err.to_string(), "provider returned 9 embeddings for 10 inputs");

        let err = SemanticError::Status {
            status: 401,
            body: "bad key".into(),
        };
        assert!(err.to_string().contains("401"));
        assert!(err.to_string().contains("bad key"));
    }
}
