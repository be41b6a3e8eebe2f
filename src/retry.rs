// src/retry.rs

//! Bounded resubmission on timeout.
//!
//! Only [`ExecError::Timeout`] is retried; validation, launch and script
//! errors are deterministic and surface on the first attempt. Each retry
//! runs the whole attempt again from scratch after a fixed backoff.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::errors::{ExecError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: Duration::from_secs(2),
        }
    }
}

/// Result of running an operation under a [`RetryPolicy`].
#[derive(Debug)]
pub struct Attempted<T> {
    pub result: Result<T>,
    /// Total attempts made, including the first one.
    pub attempts: u32,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff: Duration) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    /// Whether an error seen after `retries_used` retries earns another try.
    pub fn should_retry(&self, err: &ExecError, retries_used: u32) -> bool {
        err.is_retryable() && retries_used < self.max_retries
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// retry budget is spent.
    ///
    /// `op` receives the retry count of the attempt it is about to make,
    /// starting at `first_retry` (normally 0).
    pub async fn run<T, F, Fut>(&self, first_retry: u32, mut op: F) -> Attempted<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut retry = first_retry;
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match op(retry).await {
                Ok(value) => {
                    return Attempted {
                        result: Ok(value),
                        attempts,
                    };
                }
                Err(err) if self.should_retry(&err, retry) => {
                    retry += 1;
                    warn!(
                        error = %err,
                        retry,
                        max_retries = self.max_retries,
                        backoff_ms = self.backoff.as_millis() as u64,
                        "attempt timed out; retrying"
                    );
                    if !self.backoff.is_zero() {
                        tokio::time::sleep(self.backoff).await;
                    }
                }
                Err(err) => {
                    debug!(error = %err, attempts, "giving up");
                    return Attempted {
                        result: Err(err),
                        attempts,
                    };
                }
            }
        }
    }
}
