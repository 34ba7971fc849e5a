//! Retry with backoff
//!
//! Network-facing block fetches retry transient failures. The policy is a
//! plain value so it can be loaded from configuration and shared between
//! fetchers; the caller decides which errors are worth another attempt.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// How the delay grows between retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Every retry waits the initial delay
    Fixed,
    /// Retry `n` (zero based) waits `initial * (n + 1)`
    Linear,
    /// Retry `n` (zero based) waits `initial * 2^n`
    #[default]
    Exponential,
}

impl BackoffStrategy {
    /// Uncapped delay before retry `attempt`, counting from zero
    fn base_delay(self, attempt: u32, initial: Duration) -> Duration {
        match self {
            BackoffStrategy::Fixed => initial,
            BackoffStrategy::Linear => initial.saturating_mul(attempt.saturating_add(1)),
            BackoffStrategy::Exponential => initial.saturating_mul(2u32.saturating_pow(attempt)),
        }
    }
}

/// Bounded retries with a backoff schedule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; zero disables retrying
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Ceiling on any single delay
    pub max_delay: Duration,
    /// Growth of the delay between retries
    pub strategy: BackoffStrategy,
    /// Add up to a tenth of the delay at random
    pub jitter: bool,
}

impl RetryPolicy {
    /// Exponential backoff starting at 100ms, capped at 2s, three retries
    pub fn exponential() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            strategy: BackoffStrategy::Exponential,
            jitter: false,
        }
    }

    /// Three retries, each after `delay`
    pub fn fixed(delay: Duration) -> Self {
        Self {
            initial_delay: delay,
            max_delay: delay,
            strategy: BackoffStrategy::Fixed,
            ..Self::exponential()
        }
    }

    /// A policy that never retries
    pub fn none() -> Self {
        Self::fixed(Duration::ZERO).with_max_attempts(0)
    }

    /// Replace the retry budget
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Replace the first delay
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Replace the delay ceiling
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Replace the backoff schedule
    pub fn with_strategy(mut self, strategy: BackoffStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Toggle random jitter
    pub fn with_jitter(mut self, enable: bool) -> Self {
        self.jitter = enable;
        self
    }

    /// Delay before retry `attempt`; `0` is the first retry
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        use rand::Rng;

        let mut delay = self.strategy.base_delay(attempt, self.initial_delay);
        if self.jitter {
            let spread = delay.as_millis() as f64 * 0.1 * rand::thread_rng().gen::<f64>();
            delay = delay.saturating_add(Duration::from_millis(spread as u64));
        }
        delay.min(self.max_delay)
    }

    /// Run `operation`, retrying the failures `retryable` accepts
    ///
    /// An error the predicate rejects is returned immediately, whatever the
    /// remaining attempt budget.
    pub async fn execute_if<F, Fut, T, E, P>(&self, mut operation: F, retryable: P) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
    {
        let mut attempt = 0;
        loop {
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if attempt >= self.max_attempts || !retryable(&err) {
                return Err(err);
            }

            let delay = self.calculate_delay(attempt);
            tracing::debug!(
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                "retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::exponential()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_exponential_backoff_is_capped() {
        let policy = RetryPolicy::exponential();
        assert_eq!(policy.calculate_delay(0), Duration::from_millis(100));
        assert_eq!(policy.calculate_delay(1), Duration::from_millis(200));
        assert_eq!(policy.calculate_delay(2), Duration::from_millis(400));
        assert_eq!(policy.calculate_delay(10), Duration::from_secs(2));
    }

    #[test]
    fn test_linear_and_fixed_schedules() {
        let linear = RetryPolicy::exponential().with_strategy(BackoffStrategy::Linear);
        assert_eq!(linear.calculate_delay(0), Duration::from_millis(100));
        assert_eq!(linear.calculate_delay(2), Duration::from_millis(300));
        assert_eq!(linear.calculate_delay(40), Duration::from_secs(2));

        let fixed = RetryPolicy::fixed(Duration::from_millis(30));
        assert_eq!(fixed.calculate_delay(0), fixed.calculate_delay(7));
    }

    #[test]
    fn test_jitter_stays_within_bound() {
        let policy = RetryPolicy::exponential().with_jitter(true);
        for _ in 0..32 {
            let delay = policy.calculate_delay(1);
            assert!(delay >= Duration::from_millis(200));
            assert!(delay <= Duration::from_millis(220));
        }
    }

    #[test]
    fn test_jitter_respects_ceiling() {
        let policy = RetryPolicy::fixed(Duration::from_millis(50)).with_jitter(true);
        for _ in 0..16 {
            assert_eq!(policy.calculate_delay(3), Duration::from_millis(50));
        }
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::fixed(Duration::from_millis(1));

        let result: Result<u32, &str> = policy
            .execute_if(
                || async {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        Err("transient")
                    } else {
                        Ok(n)
                    }
                },
                |_| true,
            )
            .await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_budget() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::fixed(Duration::from_millis(1)).with_max_attempts(2);

        let result: Result<(), &str> = policy
            .execute_if(
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("down")
                },
                |_| true,
            )
            .await;

        assert_eq!(result, Err("down"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_returns_immediately() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::fixed(Duration::from_millis(1));

        let result: Result<(), &str> = policy
            .execute_if(
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("fatal")
                },
                |e| *e != "fatal",
            )
            .await;

        assert_eq!(result, Err("fatal"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
