//! Poll-until-condition with an explicit deadline

use std::future::Future;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Polling interval and overall deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    /// Sleep between two checks
    pub interval: Duration,
    /// Upper bound on the whole poll, measured from the first check
    pub timeout: Duration,
}

impl PollSchedule {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

/// Error returned by [`poll_until`].
///
/// A `Timeout` means the remote state is unknown, not that the awaited
/// operation failed. Callers should re-query before retrying.
#[derive(Debug, Error)]
pub enum PollError<E> {
    #[error("condition not met after {elapsed:?}")]
    Timeout { elapsed: Duration },

    #[error("{0}")]
    Check(E),
}

/// Calls `check` until it yields `Some`, the check itself fails, or the
/// schedule's timeout elapses.
///
/// The first check runs immediately; later checks run after `interval`
/// (shortened so the last sleep never overshoots the deadline).
pub async fn poll_until<T, E, F, Fut>(schedule: &PollSchedule, mut check: F) -> Result<T, PollError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    let started = Instant::now();
    let mut ticks: u32 = 0;
    loop {
        ticks += 1;
        if let Some(value) = check().await.map_err(PollError::Check)? {
            tracing::debug!("Condition met after {} check(s)", ticks);
            return Ok(value);
        }

        let elapsed = started.elapsed();
        if elapsed >= schedule.timeout {
            return Err(PollError::Timeout { elapsed });
        }
        let remaining = schedule.timeout - elapsed;
        tokio::time::sleep(schedule.interval.min(remaining)).await;
    }
}
