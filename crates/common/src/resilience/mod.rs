//! Resilience patterns for transient failures
//!
//! Currently provides a single pattern: bounded retry with exponential
//! backoff and jitter, parameterised by a retry policy. The executor is
//! generic over the error type; HTTP-specific classification lives with the
//! API client in `shoplink-infra`.

pub mod retry;

// Re-export retry types
pub use retry::{
    policies, retry_with_policy, Jitter, RetryConfig, RetryConfigBuilder, RetryConfigError,
    RetryExecutor, RetryOutcome, RetryPolicy,
};
