// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Caret context: the method under the caret and its telemetry.
//!
//! [`CaretTracker`] remembers the last caret position so the orchestrator can
//! re-evaluate it after an environment switch. Every evaluation pushes one
//! [`CaretView`] to the host's [`ViewSink`].

use std::sync::{Arc, Mutex};
use std::time::Instant;

use tracing::debug;

use crate::backend::{ErrorRecord, InsightRecord};
use crate::document::DocumentInfoCache;
use crate::providers::{ErrorsProvider, InsightsProvider, ListItem};
use crate::types::{Environment, EnvironmentHandle, FileKey, MethodUnderCaret};

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

/// What the presentation layer shows for the current caret.
#[derive(Debug, Clone, PartialEq)]
pub struct CaretView {
    pub environment: Arc<Environment>,
    /// `None` when the caret is outside every method or in an unsupported file.
    pub method: Option<MethodUnderCaret>,
    pub insights: Vec<ListItem<InsightRecord>>,
    pub errors: Vec<ListItem<ErrorRecord>>,
}

impl CaretView {
    fn empty(environment: Arc<Environment>) -> Self {
        Self {
            environment,
            method: None,
            insights: Vec::new(),
            errors: Vec::new(),
        }
    }
}

/// Host-side presentation sink.
pub trait ViewSink: Send + Sync {
    fn show(&self, view: CaretView);
}

/// Sink that drops every view.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopViewSink;

impl ViewSink for NoopViewSink {
    fn show(&self, _view: CaretView) {}
}

/// A caret location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaretPosition {
    pub file: FileKey,
    /// Byte offset into the file content.
    pub offset: usize,
}

/// Resolves the caret's method and fetches its correlation data.
///
/// All methods block (cache rebuilds and backend calls); call them from a
/// worker thread.
pub struct CaretTracker {
    cache: Arc<DocumentInfoCache>,
    insights: Arc<InsightsProvider>,
    errors: Arc<ErrorsProvider>,
    sink: Arc<dyn ViewSink>,
    environment: EnvironmentHandle,
    last: Mutex<Option<CaretPosition>>,
}

impl CaretTracker {
    pub fn new(
        cache: Arc<DocumentInfoCache>,
        insights: Arc<InsightsProvider>,
        errors: Arc<ErrorsProvider>,
        sink: Arc<dyn ViewSink>,
        environment: EnvironmentHandle,
    ) -> Self {
        Self {
            cache,
            insights,
            errors,
            sink,
            environment,
            last: Mutex::new(None),
        }
    }

    /// Handle a caret move and push the resulting view.
    pub fn on_caret_moved(&self, file: FileKey, offset: usize) -> CaretView {
        let position = CaretPosition { file, offset };
        self.set_last(Some(position.clone()));
        self.evaluate(&position)
    }

    /// Re-evaluate the last known position, if any.
    pub fn refresh(&self) -> Option<CaretView> {
        let position = self.last_position()?;
        Some(self.evaluate(&position))
    }

    /// Forget the caret if it was in `file`.
    pub fn forget_file(&self, file: &FileKey) {
        let mut last = self.last.lock().unwrap_or_else(|p| p.into_inner());
        if last.as_ref().map(|p| &p.file == file).unwrap_or(false) {
            *last = None;
        }
    }

    /// Forget the caret entirely.
    pub fn forget(&self) {
        self.set_last(None);
    }

    pub fn last_position(&self) -> Option<CaretPosition> {
        self.last.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    fn set_last(&self, position: Option<CaretPosition>) {
        *self.last.lock().unwrap_or_else(|p| p.into_inner()) = position;
    }

    fn evaluate(&self, position: &CaretPosition) -> CaretView {
        let start = Instant::now();
        let environment = self.environment.current();

        let method = self.cache.get(&position.file).and_then(|info| {
            info.method_at(position.offset)
                .map(|m| m.under_caret(&position.file.path()))
        });

        let view = match method {
            Some(method) => {
                let insights = self.insights.get_insights(std::slice::from_ref(&method.id));
                let errors = self.errors.get_errors(&method.id);
                debug!(
                    method = %method.id,
                    insights = insights.len(),
                    errors = errors.len(),
                    "caret context evaluated"
                );
                CaretView {
                    environment,
                    method: Some(method),
                    insights,
                    errors,
                }
            }
            None => {
                debug!(file = %position.file, offset = position.offset, "no method under caret");
                CaretView::empty(environment)
            }
        };

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("caret.evaluate", start.elapsed());
        #[cfg(not(feature = "telemetry"))]
        let _ = start;

        self.sink.show(view.clone());
        view
    }
}
