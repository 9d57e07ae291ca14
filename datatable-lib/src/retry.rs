//! Retry with backoff, independent of any one data source.

use std::future::Future;
use std::time::Duration;

use log::debug;
use serde::Deserialize;
use serde::Serialize;

/// Growth policy for the delay between attempts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backoff {
    /// `delay * n` before attempt `n + 1`.
    Linear,
    /// `delay * 2^(n-1)` before attempt `n + 1`.
    #[default]
    Exponential,
}

/// Configuration for automatic retry behavior.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use datatable_lib::retry::{Backoff, RetryPolicy};
///
/// let policy = RetryPolicy::default()
///     .max_attempts(5)
///     .delay(Duration::from_millis(200))
///     .backoff(Backoff::Linear);
///
/// assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(600));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first.
    pub max_attempts: u32,
    /// Base delay between attempts.
    pub delay: Duration,
    /// Delay growth policy.
    pub backoff: Backoff,
    /// Upper bound for a single delay.
    pub max_delay: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_millis(1000),
            backoff: Backoff::Exponential,
            max_delay: None,
        }
    }
}

impl RetryPolicy {
    /// A policy that runs the operation exactly once.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Sets the total number of attempts.
    pub fn max_attempts(mut self, n: u32) -> Self {
        self.max_attempts = n;
        self
    }

    /// Sets the base delay.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Sets the backoff policy.
    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Caps each delay.
    pub fn max_delay(mut self, max: Duration) -> Self {
        self.max_delay = Some(max);
        self
    }

    /// Delay to wait after the `failed_attempt`-th failure (1-based).
    pub fn delay_for_attempt(&self, failed_attempt: u32) -> Duration {
        let n = failed_attempt.max(1);
        let delay = match self.backoff {
            Backoff::Linear => self.delay.saturating_mul(n),
            Backoff::Exponential => {
                let factor = 2u32.checked_pow(n - 1).unwrap_or(u32::MAX);
                self.delay.saturating_mul(factor)
            }
        };
        match self.max_delay {
            Some(max) => delay.min(max),
            None => delay,
        }
    }

    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Runs `op` until it succeeds or `policy.max_attempts` is exhausted.
///
/// On exhaustion the last error is returned unchanged.
pub async fn with_retry<T, E, F, Fut>(policy: &RetryPolicy, op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    with_retry_if(policy, |_| true, op).await
}

/// Like [`with_retry`], but stops at the first error for which
/// `should_retry` returns `false`, returning it unchanged.
pub async fn with_retry_if<T, E, F, Fut, P>(policy: &RetryPolicy, should_retry: P, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let attempts = policy.attempts();
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if attempt >= attempts || !should_retry(&e) {
                    return Err(e);
                }

                let wait = policy.delay_for_attempt(attempt);
                debug!("attempt {}/{} failed, retrying in {:?}", attempt, attempts, wait);
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
        }
    }
}
