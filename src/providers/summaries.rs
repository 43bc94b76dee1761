// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Workspace-wide summaries and environment usage status.

use std::sync::Arc;

use tracing::debug;

use crate::backend::{AnalyticsBackend, GlobalInsight, UsageStatusResult};
use crate::retry::RetryPolicy;
use crate::types::Environment;

use super::episode::{call_backend, FailureEpisode};
use super::list::{build_list, ListItem};

pub struct SummariesProvider {
    backend: Arc<dyn AnalyticsBackend>,
    retry: RetryPolicy,
    summaries: FailureEpisode,
    usage: FailureEpisode,
}

impl SummariesProvider {
    pub fn new(backend: Arc<dyn AnalyticsBackend>, retry: RetryPolicy) -> Self {
        Self {
            backend,
            retry,
            summaries: FailureEpisode::new("summaries"),
            usage: FailureEpisode::new("usage_status"),
        }
    }

    /// Global insights, one group per insight type.
    pub fn get_summaries(&self) -> Vec<ListItem<GlobalInsight>> {
        let Some(records) = call_backend(&self.retry, &self.summaries, || {
            self.backend.fetch_global_insights()
        }) else {
            return Vec::new();
        };
        debug!(records = records.len(), "global insights fetched");
        Self::build(records)
    }

    pub fn build(records: Vec<GlobalInsight>) -> Vec<ListItem<GlobalInsight>> {
        build_list(records, |record| Some(record.insight_type.clone()))
    }

    /// Usage status for the given environments. Empty when the backend fails.
    pub fn usage_status(&self, environments: &[Environment]) -> UsageStatusResult {
        if environments.is_empty() {
            return UsageStatusResult::default();
        }
        call_backend(&self.retry, &self.usage, || {
            self.backend.fetch_usage_status(environments)
        })
        .unwrap_or_default()
    }
}
