//! Bounded retry with exponential backoff and additive jitter
//!
//! An operation runs at most `max_retries + 1` times. Between attempts the
//! executor sleeps `min(base_delay * 2^attempt, max_delay)` plus a uniformly
//! random jitter. The policy is consulted after every failure except the
//! last one; a `false` answer stops immediately without sleeping.
//!
//! The error returned on failure is always the error produced by the final
//! attempt, unwrapped, so callers see the same type they would see without
//! retry.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

/// Invalid retry configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid retry configuration: {message}")]
pub struct RetryConfigError {
    pub message: String,
}

/// Randomisation added on top of the backoff delay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Jitter {
    /// No jitter (deterministic delays)
    None,
    /// Uniform random value in `[0, max)` added to the delay
    Additive(Duration),
}

impl Default for Jitter {
    fn default() -> Self {
        Self::Additive(Duration::from_millis(1000))
    }
}

impl Jitter {
    /// Apply jitter to a computed backoff delay
    pub fn apply(&self, delay: Duration) -> Duration {
        match self {
            Self::None => delay,
            Self::Additive(max) => {
                let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
                if max_ms == 0 {
                    return delay;
                }
                let extra = rand::thread_rng().gen_range(0..max_ms);
                delay.saturating_add(Duration::from_millis(extra))
            }
        }
    }
}

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry, doubled for every subsequent one
    pub base_delay: Duration,
    /// Cap applied to the doubled delay (jitter is added after the cap)
    pub max_delay: Duration,
    pub jitter: Jitter,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
            jitter: Jitter::default(),
        }
    }
}

impl RetryConfig {
    /// Create a configuration builder
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }

    /// Validate the configuration
    ///
    /// # Errors
    /// Returns an error when `max_delay` is smaller than `base_delay`.
    pub fn validate(&self) -> Result<(), RetryConfigError> {
        if self.max_delay < self.base_delay {
            return Err(RetryConfigError {
                message: format!(
                    "max_delay ({:?}) must not be smaller than base_delay ({:?})",
                    self.max_delay, self.base_delay
                ),
            });
        }
        Ok(())
    }

    /// Total attempts this configuration allows
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Backoff delay after the failed attempt `attempt` (0-based), before
    /// jitter.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let base_ms = u64::try_from(self.base_delay.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(self.max_delay.as_millis()).unwrap_or(u64::MAX);
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        Duration::from_millis(base_ms.saturating_mul(factor).min(max_ms))
    }
}

/// Builder for RetryConfig with fluent API
#[derive(Debug, Default)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    pub fn new() -> Self {
        Self { config: RetryConfig::default() }
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.config.base_delay = delay;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.config.max_delay = delay;
        self
    }

    pub fn jitter(mut self, jitter: Jitter) -> Self {
        self.config.jitter = jitter;
        self
    }

    pub fn no_jitter(self) -> Self {
        self.jitter(Jitter::None)
    }

    pub fn build(self) -> Result<RetryConfig, RetryConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Decides whether a failed attempt should be retried
pub trait RetryPolicy<E> {
    /// `attempt` is the 0-based index of the attempt that just failed
    fn should_retry(&self, error: &E, attempt: u32) -> bool;
}

/// Outcome of a retry execution including result and summary statistics.
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    pub result: Result<T, E>,
    pub attempts: u32,
    /// Sum of the delays slept between attempts
    pub total_delay: Duration,
    pub started_at: Instant,
}

impl<T, E> RetryOutcome<T, E> {
    /// Consume the outcome and return only the result.
    pub fn into_result(self) -> Result<T, E> {
        self.result
    }

    /// Time elapsed since the first attempt started.
    pub fn total_elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

/// The main retry executor
#[derive(Debug, Clone)]
pub struct RetryExecutor<P> {
    config: RetryConfig,
    policy: P,
}

impl<P> RetryExecutor<P> {
    /// Create a new retry executor with the given configuration and policy
    pub fn new(config: RetryConfig, policy: P) -> Self {
        Self { config, policy }
    }

    /// Create with default configuration
    pub fn with_policy(policy: P) -> Self {
        Self::new(RetryConfig::default(), policy)
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Execute an operation with retry logic
    #[instrument(skip(self, operation), fields(max_retries = self.config.max_retries))]
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_with_outcome(operation).await.into_result()
    }

    /// Execute an operation with retry logic and return outcome statistics.
    pub async fn execute_with_outcome<F, Fut, T, E>(&self, mut operation: F) -> RetryOutcome<T, E>
    where
        P: RetryPolicy<E>,
        E: fmt::Debug,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let started_at = Instant::now();
        let mut total_delay = Duration::ZERO;
        let mut attempt: u32 = 0;

        loop {
            debug!(
                attempt = attempt + 1,
                max_attempts = self.config.max_attempts(),
                "Executing operation"
            );

            let error = match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(retries = attempt, "Operation succeeded after retries");
                    }
                    return RetryOutcome {
                        result: Ok(value),
                        attempts: attempt + 1,
                        total_delay,
                        started_at,
                    };
                }
                Err(error) => error,
            };

            if attempt >= self.config.max_retries {
                warn!(attempts = attempt + 1, error = ?error, "All retry attempts exhausted");
                return RetryOutcome {
                    result: Err(error),
                    attempts: attempt + 1,
                    total_delay,
                    started_at,
                };
            }

            if !self.policy.should_retry(&error, attempt) {
                debug!(error = ?error, "Retry policy declined to retry");
                return RetryOutcome {
                    result: Err(error),
                    attempts: attempt + 1,
                    total_delay,
                    started_at,
                };
            }

            let delay = self.config.jitter.apply(self.config.backoff_delay(attempt));
            warn!(attempt = attempt + 1, ?delay, error = ?error, "Operation failed, retrying");
            tokio::time::sleep(delay).await;
            total_delay += delay;
            attempt += 1;
        }
    }
}

/// Convenience function to create a retry executor and execute an operation
pub async fn retry_with_policy<F, Fut, T, E, P>(
    config: RetryConfig,
    policy: P,
    operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: RetryPolicy<E>,
    E: fmt::Debug,
{
    RetryExecutor::new(config, policy).execute(operation).await
}

/// Pre-defined retry policies for common scenarios
pub mod policies {
    use super::RetryPolicy;

    /// Always retry policy - retries on any error
    #[derive(Debug, Clone, Copy)]
    pub struct AlwaysRetry;

    impl<E> RetryPolicy<E> for AlwaysRetry {
        fn should_retry(&self, _error: &E, _attempt: u32) -> bool {
            true
        }
    }

    /// Never retry policy - never retries
    #[derive(Debug, Clone, Copy)]
    pub struct NeverRetry;

    impl<E> RetryPolicy<E> for NeverRetry {
        fn should_retry(&self, _error: &E, _attempt: u32) -> bool {
            false
        }
    }

    /// Predicate-based retry policy
    #[derive(Clone)]
    pub struct PredicateRetry<F> {
        predicate: F,
    }

    impl<F> PredicateRetry<F> {
        pub fn new(predicate: F) -> Self {
            Self { predicate }
        }
    }

    impl<F> std::fmt::Debug for PredicateRetry<F> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("PredicateRetry").finish_non_exhaustive()
        }
    }

    impl<F, E> RetryPolicy<E> for PredicateRetry<F>
    where
        F: Fn(&E) -> bool,
    {
        fn should_retry(&self, error: &E, _attempt: u32) -> bool {
            (self.predicate)(error)
        }
    }
}
