// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Errors raised in a code object.

use std::sync::Arc;

use tracing::debug;

use crate::backend::{AnalyticsBackend, ErrorRecord};
use crate::retry::RetryPolicy;
use crate::types::CodeObjectId;

use super::episode::{call_backend, FailureEpisode};
use super::list::{build_list, ListItem};

/// Fetches errors and buckets those sharing a request flow.
pub struct ErrorsProvider {
    backend: Arc<dyn AnalyticsBackend>,
    retry: RetryPolicy,
    episode: FailureEpisode,
}

impl ErrorsProvider {
    pub fn new(backend: Arc<dyn AnalyticsBackend>, retry: RetryPolicy) -> Self {
        Self {
            backend,
            retry,
            episode: FailureEpisode::new("errors"),
        }
    }

    /// Errors for one code object. Empty when the backend fails.
    pub fn get_errors(&self, id: &CodeObjectId) -> Vec<ListItem<ErrorRecord>> {
        let Some(records) =
            call_backend(&self.retry, &self.episode, || self.backend.fetch_errors(id))
        else {
            return Vec::new();
        };
        debug!(id = %id, records = records.len(), "errors fetched");
        Self::build(records)
    }

    pub fn build(records: Vec<ErrorRecord>) -> Vec<ListItem<ErrorRecord>> {
        build_list(records, |record| {
            record.flow_id.as_ref().map(|flow| format!("flow:{}", flow))
        })
    }

    pub fn is_failing(&self) -> bool {
        self.episode.is_failing()
    }
}
