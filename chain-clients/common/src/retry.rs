//! Bounded retry with a fixed delay

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

/// Retry policy: total attempt count and fixed delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts (values below 1 are treated as 1)
    pub attempts: u32,
    /// Delay between two consecutive attempts
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    /// Single attempt, no retry.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}

/// Runs `op` until it succeeds, fails with a non-retryable error, or the
/// policy's attempts are exhausted.
///
/// `op` receives the 1-based attempt number. The whole operation is re-run on
/// every attempt, so callers wrapping side-effecting sends must make the
/// operation safe to repeat (for example by re-checking remote state when
/// `attempt > 1`).
///
/// # Arguments
///
/// * `policy` - Attempt count and delay
/// * `is_retryable` - Decides whether an error is worth another attempt
/// * `op` - Operation factory, called once per attempt
///
/// # Returns
///
/// * `Ok(T)` - First successful result
/// * `Err(E)` - First non-retryable error, or the last error after exhaustion
pub async fn retry<T, E, F, Fut, P>(policy: &RetryPolicy, is_retryable: P, mut op: F) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts && is_retryable(&e) => {
                tracing::warn!(
                    "Attempt {}/{} failed, retrying in {:?}: {}",
                    attempt,
                    attempts,
                    policy.delay,
                    e
                );
                tokio::time::sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => {
                if attempt > 1 {
                    tracing::debug!("Giving up after {} attempt(s): {}", attempt, e);
                }
                return Err(e);
            }
        }
    }
}
