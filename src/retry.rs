//! Retry logic with exponential backoff
//!
//! This module decides which faults are worth another attempt and how long to wait before
//! making it. The wait is exponential (`initial_delay * backoff_multiplier^attempt`, capped at
//! `max_delay`) with optional jitter so concurrent page fetches do not retry in lockstep. A
//! server that answers 429 with a `Retry-After` header gets exactly the wait it asked for.
//!
//! # Example
//!
//! ```no_run
//! use toprated::retry::{AttemptsExhausted, IsRetryable, RetryPolicy};
//! use toprated::config::RetryConfig;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Transient,
//!     Permanent,
//!     GaveUp,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{self:?}")
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Transient)
//!     }
//! }
//!
//! impl From<AttemptsExhausted> for MyError {
//!     fn from(_: AttemptsExhausted) -> Self {
//!         MyError::GaveUp
//!     }
//! }
//!
//! # async fn example() -> Result<(), MyError> {
//! let policy = RetryPolicy::new(RetryConfig::default());
//! let result = policy.run(|| async {
//!     // Your operation here
//!     Ok::<_, MyError>(())
//! }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::{Error, NetworkFaultKind};
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Largest share of the backoff delay added as jitter
const MAX_JITTER_FRACTION: f64 = 0.25;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (connection refused, timeouts, overloaded server) should return `true`.
/// Permanent failures (bad request, not found, undecodable body) should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;

    /// Wait requested by the remote side before the next attempt, if any
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Implementation of IsRetryable for our Error type
impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            // Connect, timeout and mid-stream I/O faults are transient; a request that
            // could not even be built will fail the same way next time
            Error::Network { kind, .. } => !matches!(kind, NetworkFaultKind::Request),
            // 500/502/503/504 only; the fetcher maps every other status to Http
            Error::Server { .. } => true,
            Error::RateLimited { .. } => true,
            Error::Http { .. } => false,
            // An empty page is a logical answer, not a glitch
            Error::EmptyPage { .. } => false,
            Error::Decode { .. } => false,
            Error::InconsistentPagination { .. } => false,
            Error::MaxAttemptsExceeded { .. } => false,
            Error::EmptyInput => false,
            Error::Config { .. } => false,
            Error::Transport(_) => false,
            Error::Io(_) => false,
            Error::Serialization(_) => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Error::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

/// Produced by [`RetryPolicy::run`] when it gives up without ever seeing a fault
///
/// Only reachable with `max_attempts == 0`, which configuration validation rejects.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttemptsExhausted {
    /// Number of attempts the policy allowed
    pub attempts: u32,
}

impl From<AttemptsExhausted> for Error {
    fn from(e: AttemptsExhausted) -> Self {
        Error::MaxAttemptsExceeded {
            attempts: e.attempts,
        }
    }
}

/// Retry strategy handed to every page fetch
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}

impl RetryPolicy {
    /// Create a policy from configuration
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// The configuration this policy applies
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Whether `error` deserves another attempt
    pub fn should_retry<E: IsRetryable>(&self, error: &E) -> bool {
        error.is_retryable()
    }

    /// Exponential backoff for the wait after `attempt` attempts, without jitter
    ///
    /// `attempt` is 1-based: the first retry waits `initial_delay * multiplier`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs =
            self.config.initial_delay.as_secs_f64() * self.config.backoff_multiplier.powi(exponent);
        let max_secs = self.config.max_delay.as_secs_f64();

        if !secs.is_finite() || secs >= max_secs {
            self.config.max_delay
        } else {
            Duration::from_secs_f64(secs.max(0.0))
        }
    }

    /// Wait before the attempt following `attempt`
    ///
    /// A server-provided `Retry-After` is used verbatim. Otherwise the exponential backoff
    /// is jittered (if enabled) and clamped to `max_delay`.
    pub fn next_delay<E: IsRetryable>(&self, error: &E, attempt: u32) -> Duration {
        if let Some(retry_after) = error.retry_after() {
            return retry_after;
        }

        let delay = self.backoff_delay(attempt);
        if self.config.jitter {
            add_jitter(delay).min(self.config.max_delay)
        } else {
            delay
        }
    }

    /// Execute an async operation, retrying transient failures
    ///
    /// Stops at the first success, the first non-retryable error, or after
    /// `max_attempts` attempts. On exhaustion the last error is returned unchanged, so the
    /// caller still sees what kind of fault kept happening.
    pub async fn run<F, Fut, T, E>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: IsRetryable + std::fmt::Display + From<AttemptsExhausted>,
    {
        let max_attempts = self.config.max_attempts;

        for attempt in 1..=max_attempts {
            match operation().await {
                Ok(result) => {
                    if attempt > 1 {
                        tracing::info!(attempts = attempt, "Operation succeeded after retry");
                    }
                    return Ok(result);
                }
                Err(e) if !self.should_retry(&e) => {
                    tracing::error!(
                        error = %e,
                        attempt = attempt,
                        "Operation failed with non-retryable error"
                    );
                    return Err(e);
                }
                Err(e) if attempt < max_attempts => {
                    let delay = self.next_delay(&e, attempt);

                    tracing::warn!(
                        error = %e,
                        attempt = attempt,
                        max_attempts = max_attempts,
                        delay_ms = delay.as_millis(),
                        server_directed = e.retry_after().is_some(),
                        "Operation failed, retrying"
                    );

                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        attempts = attempt,
                        "Operation failed after all retry attempts exhausted"
                    );
                    return Err(e);
                }
            }
        }

        Err(E::from(AttemptsExhausted {
            attempts: max_attempts,
        }))
    }
}

/// Add a small random jitter to a delay to prevent thundering herd
///
/// The result lies between `delay` and `delay * 1.25`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=MAX_JITTER_FRACTION);
    let jittered_secs = delay.as_secs_f64() * (1.0 + jitter_factor);
    Duration::from_secs_f64(jittered_secs)
}
