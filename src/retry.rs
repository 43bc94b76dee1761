// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Bounded retry for remote calls.
//!
//! [`RetryExecutor::run`] is synchronous and sleeps between attempts, so it
//! must only be called from a worker thread (e.g. inside
//! `tokio::task::spawn_blocking`), never from an interactive one.

use std::time::Duration;

use tracing::{debug, trace};

use crate::error::{ConfigError, RetryError};

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

/// Runs operations with retry-on-error semantics.
pub struct RetryExecutor;

impl RetryExecutor {
    /// Run `operation` up to `max_attempts` times.
    ///
    /// An error for which `retry_on` returns true is retried after sleeping
    /// `delay`. Any other error is returned at once without consuming a retry.
    /// When every attempt fails, the last error is returned unmodified inside
    /// [`RetryError::Exhausted`].
    ///
    /// `max_attempts == 0` is rejected before the operation runs.
    pub fn run<T, E, F, P>(
        mut operation: F,
        retry_on: P,
        max_attempts: u32,
        delay: Duration,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Result<T, E>,
        P: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        if max_attempts == 0 {
            return Err(RetryError::Configuration(ConfigError::invalid(
                "max_attempts",
                "must be at least 1",
            )));
        }

        let mut attempt = 1;
        loop {
            match operation() {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if !retry_on(&err) => {
                    trace!(attempt, error = %err, "non-retryable error");
                    return Err(RetryError::Aborted(err));
                }
                Err(err) if attempt >= max_attempts => {
                    debug!(attempts = attempt, error = %err, "retries exhausted");
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        source: err,
                    });
                }
                Err(err) => {
                    trace!(attempt, max_attempts, error = %err, "retrying after error");

                    #[cfg(feature = "telemetry")]
                    GLOBAL_METRICS.record_retry();

                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                    attempt += 1;
                }
            }
        }
    }
}

/// Validated retry parameters for one call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Create a policy, failing fast on a non-positive attempt budget.
    pub fn new(max_attempts: u32, delay: Duration) -> Result<Self, ConfigError> {
        if max_attempts == 0 {
            return Err(ConfigError::invalid("max_attempts", "must be at least 1"));
        }
        Ok(Self {
            max_attempts,
            delay,
        })
    }

    /// A policy that tries exactly once.
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Run an operation under this policy.
    pub fn run<T, E, F, P>(&self, operation: F, retry_on: P) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Result<T, E>,
        P: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        RetryExecutor::run(operation, retry_on, self.max_attempts, self.delay)
    }
}
