//! Retry strategies for API calls.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::FetchError;

/// Default number of attempts.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Fixed wait after a rate-limited attempt.
pub const RATE_LIMIT_DELAY: Duration = Duration::from_secs(5);

// ============================================================================
// Retryable Errors
// ============================================================================

/// Errors that can tell whether they were caused by rate limiting.
pub trait RetryableError: Display {
    /// Returns true if the failure was a rate limit.
    ///
    /// The default looks for `429` or `rate limit` in the message.
    fn is_rate_limit(&self) -> bool {
        message_signals_rate_limit(&self.to_string())
    }
}

/// Message heuristic for rate-limit failures.
pub fn message_signals_rate_limit(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("429") || lower.contains("rate limit")
}

impl RetryableError for FetchError {
    fn is_rate_limit(&self) -> bool {
        self.is_rate_limited() || message_signals_rate_limit(&self.to_string())
    }
}

impl RetryableError for String {}

impl RetryableError for &str {}

// ============================================================================
// Retry Strategy
// ============================================================================

/// Strategy for retrying failed calls.
#[derive(Debug, Clone)]
pub struct RetryStrategy {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub base_delay: Duration,
    /// Delay after a rate-limited attempt.
    pub rate_limit_delay: Duration,
    /// Whether to use exponential backoff.
    pub exponential_backoff: bool,
    /// Maximum delay between attempts.
    pub max_delay: Duration,
}

impl RetryStrategy {
    /// Creates a strategy with `max_attempts` attempts (at least one).
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::from_secs(1),
            rate_limit_delay: RATE_LIMIT_DELAY,
            exponential_backoff: true,
            max_delay: Duration::from_secs(60),
        }
    }

    /// Disables retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            rate_limit_delay: Duration::ZERO,
            exponential_backoff: false,
            max_delay: Duration::ZERO,
        }
    }

    /// Sets the base delay.
    #[must_use]
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Sets the delay used after rate-limited attempts.
    #[must_use]
    pub fn with_rate_limit_delay(mut self, delay: Duration) -> Self {
        self.rate_limit_delay = delay;
        self
    }

    /// Enables or disables exponential backoff.
    #[must_use]
    pub fn with_exponential_backoff(mut self, enabled: bool) -> Self {
        self.exponential_backoff = enabled;
        self
    }

    /// Calculates the delay after failed attempt `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = if self.exponential_backoff {
            let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
            self.base_delay.saturating_mul(factor)
        } else {
            self.base_delay
        };

        delay.min(self.max_delay)
    }

    /// Delay after failed attempt `attempt`, given the error it produced.
    pub fn delay_after<E: RetryableError>(&self, attempt: u32, error: &E) -> Duration {
        if error.is_rate_limit() {
            self.rate_limit_delay
        } else {
            self.delay_for_attempt(attempt)
        }
    }

    /// Runs `op` until it succeeds or attempts run out.
    ///
    /// Returns the first success, or the last error. The first attempt runs
    /// immediately.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: RetryableError,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt >= self.max_attempts => {
                    warn!(attempt, error = %err, "Giving up after final attempt");
                    return Err(err);
                }
                Err(err) => {
                    let delay = self.delay_after(attempt, &err);
                    debug!(
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        rate_limited = err.is_rate_limit(),
                        error = %err,
                        "Attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

/// Runs `op` with the default delays and at most `max_retries` attempts.
pub async fn retry<T, E, F, Fut>(op: F, max_retries: u32) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RetryableError,
{
    RetryStrategy::new(max_retries).run(op).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    #[test]
    fn test_exponential_backoff() {
        let strategy = RetryStrategy::default();

        assert_eq!(strategy.delay_for_attempt(1), Duration::from_secs(1));
        assert_eq!(strategy.delay_for_attempt(2), Duration::from_secs(2));
        assert_eq!(strategy.delay_for_attempt(3), Duration::from_secs(4));
        assert_eq!(strategy.delay_for_attempt(4), Duration::from_secs(8));
    }

    #[test]
    fn test_max_delay_cap() {
        let strategy = RetryStrategy::new(10).with_base_delay(Duration::from_secs(10));

        // Should be capped at 60 seconds
        assert_eq!(strategy.delay_for_attempt(5), Duration::from_secs(60));
    }

    #[test]
    fn test_rate_limit_classification() {
        assert!(message_signals_rate_limit("HTTP 429 Too Many Requests"));
        assert!(message_signals_rate_limit("Rate Limit exceeded"));
        assert!(!message_signals_rate_limit("HTTP_500"));

        let structured = FetchError::from(ApiError::rate_limited());
        assert!(structured.is_rate_limit());
        assert_eq!(
            RetryStrategy::default().delay_after(1, &structured),
            RATE_LIMIT_DELAY
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_fail_fail_succeed() {
        let calls = &AtomicU32::new(0);
        let start = Instant::now();

        let result: Result<&str, String> = retry(
            move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 { Err(format!("boom {n}")) } else { Ok("done") }
            },
            3,
        )
        .await;

        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(start.elapsed() >= Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_returns_last_error() {
        let calls = &AtomicU32::new(0);

        let result: Result<(), String> = retry(
            move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Err(format!("failure {n}"))
            },
            3,
        )
        .await;

        assert_eq!(result, Err("failure 3".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_waits_fixed_delay() {
        let calls = &AtomicU32::new(0);
        let start = Instant::now();

        let result: Result<u8, FetchError> = retry(
            move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(FetchError::from(ApiError::rate_limited()))
                } else {
                    Ok(1)
                }
            },
            3,
        )
        .await;

        assert_eq!(result.unwrap(), 1);
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(5000));
        assert!(elapsed < Duration::from_millis(6000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_attempt_does_not_sleep() {
        let start = Instant::now();
        let result: Result<(), &str> = retry(|| async { Err("nope") }, 0).await;
        assert!(result.is_err());
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
