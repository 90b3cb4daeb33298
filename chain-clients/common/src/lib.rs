//! Shared utilities for chain client libraries
//!
//! Bounded retry and poll-until primitives used by every networked step of the
//! kernel client. Both are cooperative: an in-flight future is never preempted,
//! the only cancellation primitive is the caller-supplied timeout.

pub mod poll;
pub mod retry;

// Re-export for convenience
pub use poll::{poll_until, PollError, PollSchedule};
pub use retry::{retry, RetryPolicy};
