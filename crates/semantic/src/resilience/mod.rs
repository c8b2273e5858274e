//! Resilience around the remote embedding provider: retry with backoff, a
//! circuit breaker, and client-side rate limiting.
//!
//! Each [`ApiEmbedder`](crate::ApiEmbedder) owns its own breaker and bucket, so
//! two matchers configured against different providers never share state.

mod circuit_breaker;
mod rate_limit;
mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use rate_limit::{RateLimitConfig, TokenBucket};
pub use retry::{retry_async, RetryConfig, RetryOutcome};
