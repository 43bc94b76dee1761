// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Failure-episode logging and the shared backend call path.

use std::fmt::Display;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use tracing::{info, warn};

use crate::error::{BackendError, RetryError};
use crate::retry::RetryPolicy;

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

/// Tracks consecutive failures of one backend operation.
///
/// The first failure of an episode is logged at `warn`; repeats are counted
/// silently. The next success closes the episode.
#[derive(Debug)]
pub struct FailureEpisode {
    operation: &'static str,
    active: AtomicBool,
    suppressed: AtomicU64,
}

impl FailureEpisode {
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            active: AtomicBool::new(false),
            suppressed: AtomicU64::new(0),
        }
    }

    /// Record a failure. Returns true when this failure opened a new episode.
    pub fn failed(&self, error: &dyn Display) -> bool {
        if self.active.swap(true, Ordering::SeqCst) {
            self.suppressed.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        warn!(operation = self.operation, error = %error, "backend call failed; returning empty result");
        true
    }

    /// Record a success, closing any open episode.
    pub fn succeeded(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            let repeats = self.suppressed.swap(0, Ordering::Relaxed);
            info!(operation = self.operation, repeats, "backend call recovered");
        }
    }

    pub fn is_failing(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

/// Run a backend call under `policy`, retrying only unavailability.
///
/// Returns `None` after a final failure; the failure is reported to `episode`.
pub(crate) fn call_backend<T, F>(
    policy: &RetryPolicy,
    episode: &FailureEpisode,
    operation: F,
) -> Option<T>
where
    F: FnMut() -> Result<T, BackendError>,
{
    let start = Instant::now();
    let result = policy.run(operation, BackendError::is_retryable);

    #[cfg(feature = "telemetry")]
    GLOBAL_METRICS.record_backend_call(episode.operation, start.elapsed(), result.is_ok());
    #[cfg(not(feature = "telemetry"))]
    let _ = start;

    match result {
        Ok(value) => {
            episode.succeeded();
            Some(value)
        }
        Err(RetryError::Configuration(err)) => {
            warn!(operation = episode.operation, error = %err, "invalid retry configuration");
            None
        }
        Err(err) => {
            episode.failed(&err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::time::Duration;

    #[test]
    fn test_episode_opens_once() {
        let episode = FailureEpisode::new("test");
        assert!(episode.failed(&"down"));
        assert!(!episode.failed(&"down"));
        assert!(!episode.failed(&"down"));
        assert!(episode.is_failing());

        episode.succeeded();
        assert!(!episode.is_failing());
        assert!(episode.failed(&"down again"));
    }

    #[test]
    fn test_call_backend_retries_unavailable_only() {
        let policy = RetryPolicy::new(3, Duration::ZERO).unwrap();
        let episode = FailureEpisode::new("test");

        let calls = Cell::new(0);
        let value = call_backend(&policy, &episode, || {
            calls.set(calls.get() + 1);
            if calls.get() < 3 {
                Err(BackendError::Unavailable("timeout".to_string()))
            } else {
                Ok(42)
            }
        });
        assert_eq!(value, Some(42));
        assert_eq!(calls.get(), 3);

        calls.set(0);
        let value: Option<u32> = call_backend(&policy, &episode, || {
            calls.set(calls.get() + 1);
            Err(BackendError::rejected(403, "forbidden"))
        });
        assert_eq!(value, None);
        assert_eq!(calls.get(), 1);
        assert!(episode.is_failing());
    }
}
