//! Retry policies and backoff strategies for outbound control-plane calls.
//!
//! Only transport-level failures are retried. A response that arrived, even
//! one carrying an error status, is never replayed.
//!
//! # Example
//!
//! ```
//! use rancher_broker::retry::{ExponentialBackoff, RetryConfig};
//! use std::time::Duration;
//!
//! let retry = RetryConfig::builder()
//!     .max_retries(3)
//!     .backoff(ExponentialBackoff::new(Duration::from_millis(100), Duration::from_secs(5)))
//!     .build();
//! assert_eq!(retry.max_retries, 3);
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::warn;

/// Defines a backoff strategy for retry delays.
pub trait BackoffStrategy: fmt::Debug + Send + Sync + 'static {
    /// Delay before the next attempt. `attempt` is 0 for the first retry.
    fn delay(&self, attempt: u32) -> Duration;
}

// =============================================================================
// No Backoff
// =============================================================================

/// No delay between retries.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBackoff;

impl BackoffStrategy for NoBackoff {
    fn delay(&self, _attempt: u32) -> Duration {
        Duration::ZERO
    }
}

// =============================================================================
// Exponential Backoff
// =============================================================================

/// Delay doubling per attempt, capped at `max_delay`.
///
/// A deterministic jitter of up to 25% is added on top of the capped delay.
#[derive(Debug, Clone, Copy)]
pub struct ExponentialBackoff {
    initial_delay: Duration,
    max_delay: Duration,
}

impl ExponentialBackoff {
    /// Create a new exponential backoff strategy.
    #[must_use]
    pub fn new(initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            initial_delay,
            max_delay,
        }
    }
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(Duration::from_millis(100), Duration::from_secs(5))
    }
}

impl BackoffStrategy for ExponentialBackoff {
    fn delay(&self, attempt: u32) -> Duration {
        let base_delay = self.initial_delay.as_millis() as f64 * 2f64.powi(attempt as i32);
        let capped_delay = base_delay.min(self.max_delay.as_millis() as f64);
        // zero on the first retry, bounded by 25% after that
        let jitter = (f64::from(attempt) * 0.1).sin().abs() * capped_delay * 0.25;
        Duration::from_millis((capped_delay + jitter) as u64)
    }
}

// =============================================================================
// Retryable errors
// =============================================================================

/// Classifies an error as transient (worth retrying) or permanent.
pub trait Retryable {
    /// `true` for connection-level faults that a fresh attempt may fix.
    fn is_transient(&self) -> bool;
}

impl Retryable for reqwest::Error {
    fn is_transient(&self) -> bool {
        !self.is_builder() && (self.is_connect() || self.is_timeout() || self.is_request())
    }
}

// =============================================================================
// Retry Configuration
// =============================================================================

/// Bounded retry loop: attempt count, backoff and total time budget.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Backoff strategy for calculating delays.
    pub backoff: Arc<dyn BackoffStrategy>,
    /// Maximum total time for all attempts.
    pub total_timeout: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Arc::new(ExponentialBackoff::default()),
            total_timeout: Some(Duration::from_secs(120)),
        }
    }
}

impl RetryConfig {
    /// Create a configuration builder.
    #[must_use]
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::default()
    }

    /// Run `operation` until it succeeds, fails permanently, or the retry
    /// budget is spent. The last error is returned on failure.
    pub async fn execute<T, E, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + fmt::Display,
    {
        let start = Instant::now();
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if !e.is_transient() || attempt >= self.max_retries {
                        return Err(e);
                    }

                    if let Some(timeout) = self.total_timeout {
                        if start.elapsed() >= timeout {
                            return Err(e);
                        }
                    }

                    let delay = self.backoff.delay(attempt);
                    attempt += 1;
                    warn!(
                        attempt,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Builder for [`RetryConfig`].
#[derive(Debug)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl Default for RetryConfigBuilder {
    fn default() -> Self {
        Self {
            config: RetryConfig::default(),
        }
    }
}

impl RetryConfigBuilder {
    /// Set maximum retry attempts.
    #[must_use]
    pub fn max_retries(mut self, max: u32) -> Self {
        self.config.max_retries = max;
        self
    }

    /// Set the backoff strategy.
    #[must_use]
    pub fn backoff(mut self, backoff: impl BackoffStrategy) -> Self {
        self.config.backoff = Arc::new(backoff);
        self
    }

    /// Set total timeout for all attempts.
    #[must_use]
    pub fn total_timeout(mut self, timeout: Duration) -> Self {
        self.config.total_timeout = Some(timeout);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> RetryConfig {
        self.config
    }
}
