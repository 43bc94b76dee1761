// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Environment-change orchestration.
//!
//! An environment switch fans out to every component holding
//! environment-scoped state, in a fixed order:
//!
//! ```text
//!  environment_changed(E)
//!     │  (switches are serialized)
//!     ▼
//!  1. swap EnvironmentHandle ─────────────► readers see E
//!  2. cache.on_environment_changed(E) ────► every entry Stale
//!     │
//!     ├─► 3. warm up returned keys          (concurrent, best effort)
//!     ├─► 4. resolver hooks                 (each isolated + timeout)
//!     └─► 5. caret re-evaluation            (once)
//! ```
//!
//! Step 2 completes before steps 3–5 start. All blocking work runs on the
//! blocking pool; the caller's task only awaits.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::caret::CaretTracker;
use crate::document::DocumentInfoCache;
use crate::resolver::ResolverRegistry;
use crate::types::{Environment, EnvironmentHandle, FileKey};

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

/// Re-evaluates the caret context after a switch.
pub trait CaretRefresh: Send + Sync {
    /// Returns true when a view was pushed.
    fn refresh_caret(&self) -> bool;
}

impl CaretRefresh for CaretTracker {
    fn refresh_caret(&self) -> bool {
        self.refresh().is_some()
    }
}

/// Orchestrator settings.
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    /// Upper bound for each resolver hook.
    pub hook_timeout: Duration,
    /// Re-resolve cached files right after invalidation.
    pub warm_up: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            hook_timeout: Duration::from_millis(2000),
            warm_up: true,
        }
    }
}

/// Why a resolver hook did not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookFailure {
    Failed(String),
    Panicked,
    TimedOut,
}

/// Outcome of one environment switch.
#[derive(Debug, Clone)]
pub struct EnvironmentChangeReport {
    pub previous: Arc<Environment>,
    pub current: Arc<Environment>,
    /// Keys the cache held when it was invalidated.
    pub invalidated: Vec<FileKey>,
    /// Keys re-resolved during warm-up.
    pub warmed: Vec<FileKey>,
    /// Keys whose warm-up failed.
    pub warm_up_failures: Vec<FileKey>,
    /// Resolvers whose hook completed.
    pub hooks_completed: Vec<String>,
    /// Resolvers whose hook failed, panicked or timed out.
    pub hook_failures: Vec<(String, HookFailure)>,
    pub caret_refreshed: bool,
    pub duration: Duration,
}

/// Fans environment switches out to the cache, resolvers and caret.
pub struct EnvironmentChangeOrchestrator {
    environment: EnvironmentHandle,
    cache: Arc<DocumentInfoCache>,
    registry: Arc<ResolverRegistry>,
    caret: Arc<dyn CaretRefresh>,
    config: OrchestratorConfig,
    switching: Mutex<()>,
}

impl EnvironmentChangeOrchestrator {
    pub fn new(
        environment: EnvironmentHandle,
        cache: Arc<DocumentInfoCache>,
        registry: Arc<ResolverRegistry>,
        caret: Arc<dyn CaretRefresh>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            environment,
            cache,
            registry,
            caret,
            config,
            switching: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Switch to `next` and propagate the change.
    ///
    /// Overlapping calls run one after another in call order. Individual
    /// failures are recorded in the report, never returned.
    pub async fn environment_changed(&self, next: Environment) -> EnvironmentChangeReport {
        let span = info_span!("environment_changed", environment = %next);
        self.propagate(next).instrument(span).await
    }

    async fn propagate(&self, next: Environment) -> EnvironmentChangeReport {
        let _switching = self.switching.lock().await;
        let start = Instant::now();

        // 1. swap
        let previous = self.environment.swap(next);
        let current = self.environment.current();
        info!(from = %previous, to = %current, "switching environment");

        // 2. invalidate; must finish before anything else observes the switch
        let invalidated = {
            let cache = Arc::clone(&self.cache);
            let environment = Arc::clone(&current);
            tokio::task::spawn_blocking(move || cache.on_environment_changed(&environment))
                .await
                .unwrap_or_else(|err| {
                    warn!(error = %err, "cache invalidation task failed");
                    Vec::new()
                })
        };

        // 3–5 run concurrently with each other
        let warm_up = self.warm_up(&invalidated);
        let hooks = self.run_hooks(&current);
        let caret = self.refresh_caret();
        let ((warmed, warm_up_failures), (hooks_completed, hook_failures), caret_refreshed) =
            tokio::join!(warm_up, hooks, caret);

        let duration = start.elapsed();

        #[cfg(feature = "telemetry")]
        {
            GLOBAL_METRICS.record_environment_switch();
            GLOBAL_METRICS.record_operation("orchestrator.environment_changed", duration);
        }

        info!(
            to = %current,
            invalidated = invalidated.len(),
            warmed = warmed.len(),
            warm_up_failures = warm_up_failures.len(),
            hook_failures = hook_failures.len(),
            duration_ms = duration.as_millis() as u64,
            "environment switched"
        );

        EnvironmentChangeReport {
            previous,
            current,
            invalidated,
            warmed,
            warm_up_failures,
            hooks_completed,
            hook_failures,
            caret_refreshed,
            duration,
        }
    }

    async fn warm_up(&self, keys: &[FileKey]) -> (Vec<FileKey>, Vec<FileKey>) {
        let mut warmed = Vec::new();
        let mut failed = Vec::new();
        if !self.config.warm_up {
            return (warmed, failed);
        }

        let tasks: Vec<(FileKey, JoinHandle<bool>)> = keys
            .iter()
            .map(|key| {
                let cache = Arc::clone(&self.cache);
                let task_key = key.clone();
                let handle =
                    tokio::task::spawn_blocking(move || cache.get(&task_key).is_some());
                (key.clone(), handle)
            })
            .collect();

        for (key, handle) in tasks {
            match handle.await {
                Ok(true) => warmed.push(key),
                Ok(false) => {
                    debug!(file = %key, "warm-up produced no document");
                    failed.push(key);
                }
                Err(err) => {
                    warn!(file = %key, error = %err, "warm-up task failed");
                    failed.push(key);
                }
            }
        }
        (warmed, failed)
    }

    async fn run_hooks(&self, environment: &Arc<Environment>) -> (Vec<String>, Vec<(String, HookFailure)>) {
        let timeout = self.config.hook_timeout;

        let tasks: Vec<(String, JoinHandle<Result<(), HookFailure>>)> = self
            .registry
            .resolvers()
            .iter()
            .map(|resolver| {
                let name = resolver.name().to_string();
                let resolver = Arc::clone(resolver);
                let environment = Arc::clone(environment);
                let handle = tokio::spawn(async move {
                    let hook = tokio::task::spawn_blocking(move || {
                        resolver.on_environment_changed(&environment)
                    });
                    match tokio::time::timeout(timeout, hook).await {
                        Ok(Ok(Ok(()))) => Ok(()),
                        Ok(Ok(Err(err))) => Err(HookFailure::Failed(err.to_string())),
                        Ok(Err(join)) if join.is_panic() => Err(HookFailure::Panicked),
                        Ok(Err(join)) => Err(HookFailure::Failed(join.to_string())),
                        Err(_) => Err(HookFailure::TimedOut),
                    }
                });
                (name, handle)
            })
            .collect();

        let mut completed = Vec::new();
        let mut failures = Vec::new();
        for (name, handle) in tasks {
            let outcome = handle
                .await
                .unwrap_or_else(|err| Err(HookFailure::Failed(err.to_string())));
            match outcome {
                Ok(()) => completed.push(name),
                Err(failure) => {
                    warn!(resolver = %name, failure = ?failure, "environment hook did not complete");
                    failures.push((name, failure));
                }
            }
        }
        (completed, failures)
    }

    async fn refresh_caret(&self) -> bool {
        let caret = Arc::clone(&self.caret);
        tokio::task::spawn_blocking(move || caret.refresh_caret())
            .await
            .unwrap_or_else(|err| {
                warn!(error = %err, "caret refresh failed");
                false
            })
    }
}
