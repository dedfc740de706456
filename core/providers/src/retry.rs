//! Bounded retry with configurable backoff for transient upstream errors.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, warn};

use vidrelay_common::{Error, Result};

/// How the wait between attempts grows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Backoff {
    /// `initial_delay * attempt_number`.
    Linear,
    /// `initial_delay * multiplier^(attempt_number - 1)`.
    Exponential { multiplier: f64 },
}

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    /// Base delay between attempts.
    pub initial_delay: Duration,
    /// Cap on any single delay.
    pub max_delay: Duration,
    /// Growth of the delay.
    pub backoff: Backoff,
    /// Whether to add jitter to delays.
    pub jitter: bool,
}

impl RetryConfig {
    /// Exponential backoff starting at one second.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff: Backoff::Exponential { multiplier: 2.0 },
            jitter: true,
        }
    }

    /// Linear backoff: wait `step`, then `2 * step`, and so on.
    pub fn linear(max_attempts: u32, step: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay: step,
            max_delay: Duration::from_secs(60),
            backoff: Backoff::Linear,
            jitter: false,
        }
    }

    /// Set initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set backoff growth.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Enable or disable jitter.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_after_attempt(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        let base = self.initial_delay.as_millis() as f64;

        let raw = match self.backoff {
            Backoff::Linear => base * attempt as f64,
            Backoff::Exponential { multiplier } => base * multiplier.powi(attempt as i32 - 1),
        };

        let capped = raw.min(self.max_delay.as_millis() as f64);

        let final_delay = if self.jitter {
            // +/- 25%
            let jitter_factor = 0.75 + (rand::random::<f64>() * 0.5);
            capped * jitter_factor
        } else {
            capped
        };

        Duration::from_millis(final_delay as u64)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Retry executor for running operations with retry logic.
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    /// Create a new retry executor.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Retry on transient errors only.
    pub async fn execute<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.execute_with_condition(operation, Error::is_transient)
            .await
    }

    /// Execute with a custom retry condition.
    ///
    /// Non-retryable errors are returned immediately. Once `max_attempts`
    /// is reached the last error is returned.
    pub async fn execute_with_condition<F, Fut, T, C>(
        &self,
        operation: F,
        should_retry: C,
    ) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
        C: Fn(&Error) -> bool,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            match operation().await {
                Ok(result) => {
                    if attempt > 1 {
                        debug!("Operation succeeded on attempt {}", attempt);
                    }
                    return Ok(result);
                }
                Err(err) => {
                    if !should_retry(&err) {
                        return Err(err);
                    }

                    if attempt >= max_attempts {
                        warn!("Operation failed after {} attempts: {}", attempt, err);
                        return Err(err);
                    }

                    let delay = self.config.delay_after_attempt(attempt);
                    warn!(
                        "Attempt {} failed: {}. Retrying in {:?}...",
                        attempt, err, delay
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_linear_delay_calculation() {
        let config = RetryConfig::linear(3, Duration::from_secs(2));

        assert_eq!(config.delay_after_attempt(1), Duration::from_secs(2));
        assert_eq!(config.delay_after_attempt(2), Duration::from_secs(4));
        assert_eq!(config.delay_after_attempt(3), Duration::from_secs(6));
    }

    #[test]
    fn test_exponential_delay_calculation() {
        let config = RetryConfig::new(3)
            .with_initial_delay(Duration::from_secs(1))
            .with_jitter(false);

        assert_eq!(config.delay_after_attempt(1), Duration::from_secs(1));
        assert_eq!(config.delay_after_attempt(2), Duration::from_secs(2));
        assert_eq!(config.delay_after_attempt(3), Duration::from_secs(4));
    }

    #[test]
    fn test_max_delay_cap() {
        let config = RetryConfig::new(10)
            .with_initial_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(10))
            .with_backoff(Backoff::Exponential { multiplier: 10.0 })
            .with_jitter(false);

        assert_eq!(config.delay_after_attempt(6), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_retry_on_transport_error() {
        let attempt_count = Arc::new(AtomicU32::new(0));
        let count_clone = attempt_count.clone();

        let executor = RetryExecutor::new(RetryConfig::linear(3, Duration::from_millis(1)));

        let result: Result<i32> = executor
            .execute(move || {
                let count = count_clone.clone();
                async move {
                    let current = count.fetch_add(1, Ordering::SeqCst);
                    if current < 2 {
                        Err(Error::UpstreamTransport("502 Bad Gateway".to_string()))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempt_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_logical_failure_not_retried() {
        let attempt_count = Arc::new(AtomicU32::new(0));
        let count_clone = attempt_count.clone();

        let executor = RetryExecutor::new(RetryConfig::linear(3, Duration::from_millis(1)));

        let result: Result<i32> = executor
            .execute(move || {
                let count = count_clone.clone();
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                    Err(Error::UpstreamLogical("Invalid key".to_string()))
                }
            })
            .await;

        assert!(matches!(result, Err(Error::UpstreamLogical(_))));
        assert_eq!(attempt_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_attempts_are_bounded() {
        let attempt_count = Arc::new(AtomicU32::new(0));
        let count_clone = attempt_count.clone();

        let executor = RetryExecutor::new(RetryConfig::linear(3, Duration::from_millis(1)));

        let result: Result<i32> = executor
            .execute(move || {
                let count = count_clone.clone();
                async move {
                    count.fetch_add(1, Ordering::SeqCst);
                    Err(Error::UpstreamTransport("Always fails".to_string()))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempt_count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_config_serde() {
        let config = RetryConfig::linear(3, Duration::from_secs(2));
        let json = serde_json::to_string(&config).unwrap();
        let back: RetryConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
