// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Records returned by the analytics backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CodeObjectId, Environment};

/// What part of a code object an insight was observed on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InsightScope<'a> {
    /// The method as a whole.
    Method,
    /// A tracing span inside the method.
    Span(&'a str),
    /// An HTTP or RPC endpoint the method serves.
    Endpoint(&'a str),
}

/// Per-method insight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightRecord {
    pub code_object_id: CodeObjectId,
    /// Backend insight kind, e.g. `SlowEndpoint` or `HotSpot`.
    #[serde(rename = "type")]
    pub insight_type: String,
    /// Lower is more important.
    #[serde(default)]
    pub importance: u8,
    #[serde(default)]
    pub span_name: Option<String>,
    #[serde(default)]
    pub route: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl InsightRecord {
    /// Endpoint wins over span when the backend reports both.
    pub fn scope(&self) -> InsightScope<'_> {
        match (&self.route, &self.span_name) {
            (Some(route), _) => InsightScope::Endpoint(route),
            (None, Some(span)) => InsightScope::Span(span),
            (None, None) => InsightScope::Method,
        }
    }
}

/// An error observed in a method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub uid: String,
    pub name: String,
    pub source_code_object_id: CodeObjectId,
    #[serde(default)]
    pub score: u32,
    pub first_occurrence: DateTime<Utc>,
    pub last_occurrence: DateTime<Utc>,
    /// Errors raised along the same request flow share this id.
    #[serde(default)]
    pub flow_id: Option<String>,
}

/// When a code object was last seen in an environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeObjectUsage {
    pub code_object_id: CodeObjectId,
    pub environment: Environment,
    pub last_seen: DateTime<Utc>,
}

/// Most recent data received per environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentUsage {
    pub environment: Environment,
    pub last_seen: DateTime<Utc>,
}

/// Usage status for a set of environments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStatusResult {
    #[serde(default)]
    pub code_objects: Vec<CodeObjectUsage>,
    #[serde(default)]
    pub environments: Vec<EnvironmentUsage>,
}

impl UsageStatusResult {
    pub fn is_empty(&self) -> bool {
        self.code_objects.is_empty() && self.environments.is_empty()
    }

    /// Environments that have reported any data.
    pub fn active_environments(&self) -> Vec<&Environment> {
        self.environments.iter().map(|e| &e.environment).collect()
    }
}

/// Insight not tied to a single method, shown in summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalInsight {
    #[serde(rename = "type")]
    pub insight_type: String,
    pub name: String,
    #[serde(default)]
    pub importance: u8,
    #[serde(default)]
    pub code_object_id: Option<CodeObjectId>,
}
