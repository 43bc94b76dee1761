// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Insights for code objects.

use std::sync::Arc;

use tracing::debug;

use crate::backend::{AnalyticsBackend, InsightRecord, InsightScope};
use crate::retry::RetryPolicy;
use crate::types::CodeObjectId;

use super::episode::{call_backend, FailureEpisode};
use super::list::{build_list, ListItem};

/// Fetches insights and groups span- and endpoint-level ones.
pub struct InsightsProvider {
    backend: Arc<dyn AnalyticsBackend>,
    retry: RetryPolicy,
    episode: FailureEpisode,
}

impl InsightsProvider {
    pub fn new(backend: Arc<dyn AnalyticsBackend>, retry: RetryPolicy) -> Self {
        Self {
            backend,
            retry,
            episode: FailureEpisode::new("insights"),
        }
    }

    /// Insights for the given code objects. Empty when the backend fails.
    pub fn get_insights(&self, ids: &[CodeObjectId]) -> Vec<ListItem<InsightRecord>> {
        if ids.is_empty() {
            return Vec::new();
        }
        let Some(records) = call_backend(&self.retry, &self.episode, || {
            self.backend.fetch_insights(ids)
        }) else {
            return Vec::new();
        };
        debug!(ids = ids.len(), records = records.len(), "insights fetched");
        Self::build(records)
    }

    /// Turn raw records into a view list.
    pub fn build(records: Vec<InsightRecord>) -> Vec<ListItem<InsightRecord>> {
        build_list(records, Self::group_key)
    }

    fn group_key(record: &InsightRecord) -> Option<String> {
        match record.scope() {
            InsightScope::Method => None,
            InsightScope::Span(name) => Some(format!("span:{}", name)),
            InsightScope::Endpoint(route) => Some(format!("endpoint:{}", route)),
        }
    }

    pub fn is_failing(&self) -> bool {
        self.episode.is_failing()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockAnalyticsBackend;
    use crate::error::BackendError;
    use std::time::Duration;

    fn insight(member: &str, kind: &str, span: Option<&str>, route: Option<&str>) -> InsightRecord {
        InsightRecord {
            code_object_id: CodeObjectId::new("shop.Cart", member).unwrap(),
            insight_type: kind.to_string(),
            importance: 3,
            span_name: span.map(str::to_string),
            route: route.map(str::to_string),
            description: None,
        }
    }

    fn ids() -> Vec<CodeObjectId> {
        vec![CodeObjectId::new("shop.Cart", "checkout").unwrap()]
    }

    #[test]
    fn test_unavailable_backend_yields_empty_list() {
        let mut backend = MockAnalyticsBackend::new();
        backend
            .expect_fetch_insights()
            .times(2)
            .returning(|_| Err(BackendError::Unavailable("connection refused".to_string())));

        let provider = InsightsProvider::new(
            Arc::new(backend),
            RetryPolicy::new(2, Duration::from_millis(1)).unwrap(),
        );
        assert!(provider.get_insights(&ids()).is_empty());
        assert!(provider.is_failing());
    }

    #[test]
    fn test_empty_ids_skip_backend() {
        let mut backend = MockAnalyticsBackend::new();
        backend.expect_fetch_insights().never();
        let provider = InsightsProvider::new(Arc::new(backend), RetryPolicy::once());
        assert!(provider.get_insights(&[]).is_empty());
    }

    #[test]
    fn test_grouping_by_span_and_endpoint() {
        let records = vec![
            insight("checkout", "HotSpot", None, None),
            insight("checkout", "SpanDuration", Some("db.query"), None),
            insight("checkout", "SlowEndpoint", None, Some("POST /checkout")),
            insight("checkout", "SpanScaling", Some("db.query"), None),
        ];

        let mut backend = MockAnalyticsBackend::new();
        let response = records.clone();
        backend
            .expect_fetch_insights()
            .returning(move |_| Ok(response.clone()));
        let provider = InsightsProvider::new(Arc::new(backend), RetryPolicy::once());

        let list = provider.get_insights(&ids());
        assert_eq!(list.len(), 3);
        assert!(matches!(&list[0], ListItem::Single(item) if item.payload.insight_type == "HotSpot"));
        match &list[1] {
            ListItem::Group(group) => {
                assert_eq!(group.group_key, "span:db.query");
                assert_eq!(group.items.len(), 2);
            }
            other => panic!("expected span group, got {:?}", other),
        }
        match &list[2] {
            ListItem::Group(group) => assert_eq!(group.group_key, "endpoint:POST /checkout"),
            other => panic!("expected endpoint group, got {:?}", other),
        }

        assert_eq!(list, InsightsProvider::build(records));
    }

    #[test]
    fn test_recovers_after_failure() {
        let mut backend = MockAnalyticsBackend::new();
        let mut seq = mockall::Sequence::new();
        backend
            .expect_fetch_insights()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(BackendError::Unavailable("down".to_string())));
        backend
            .expect_fetch_insights()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec![insight("checkout", "HotSpot", None, None)]));

        let provider = InsightsProvider::new(Arc::new(backend), RetryPolicy::once());
        assert!(provider.get_insights(&ids()).is_empty());
        assert!(provider.is_failing());
        assert_eq!(provider.get_insights(&ids()).len(), 1);
        assert!(!provider.is_failing());
    }
}
