//! Bounded retry of transiently failing native graphics calls
//!
//! The graphics subsystem occasionally fails a block copy transiently
//! (driver resets, display topology changes mid-call). Those failures
//! succeed on an immediate retry, so capturers run their native sequence
//! through [`RetryPolicy::attempt`]: back-to-back retries, a small fixed
//! budget, and no backoff. Only the recognized transient class is retried;
//! anything else fails immediately.

use tracing::{debug, warn};

use crate::error::{CaptureError, CaptureResult};

/// Retry policy for transient native graphics failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 3 }
    }
}

impl RetryPolicy {
    /// A policy allowing `max_retries` total attempts. A budget of zero is
    /// clamped to one attempt; "retry zero times" still means "try once".
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries: max_retries.max(1),
        }
    }

    /// Total attempts this policy will make.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Runs `op` until it succeeds, fails non-transiently, or the attempt
    /// budget is exhausted.
    ///
    /// Attempts run back-to-back with no delay. Every failed attempt is
    /// logged with its 0-based index. On exhaustion the last transient
    /// error is surfaced inside [`CaptureError::RetriesExhausted`], so
    /// callers never observe a transient error directly.
    pub fn attempt<T>(&self, mut op: impl FnMut() -> CaptureResult<T>) -> CaptureResult<T> {
        let mut last_err = None;

        for attempt in 0..self.max_retries {
            match op() {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(attempt, "capture succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if err.is_transient() => {
                    warn!(attempt, error = %err, "transient capture failure, retrying");
                    last_err = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        // last_err is always set here: the loop only falls through after
        // recording a transient failure on every attempt.
        let source = last_err.unwrap_or_else(|| {
            CaptureError::Worker(String::from("retry loop exited without an error"))
        });
        Err(CaptureError::RetriesExhausted {
            attempts: self.max_retries,
            source:   Box::new(source),
        })
    }
}
