// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration type definitions.
//!
//! [`WorkspaceConfig`] is the partial, on-disk shape (every field optional);
//! [`ResolvedConfig`] is the merged result with defaults filled in.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::retry::RetryPolicy;

/// Default environment used before the host reports one.
pub const DEFAULT_ENVIRONMENT: &str = "LOCAL";

/// Retry settings for one group of backend call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    /// Total attempts including the first.
    pub max_attempts: u32,
    /// Delay between attempts in milliseconds.
    pub delay_ms: u64,
}

impl RetryConfig {
    /// Validate into a [`RetryPolicy`].
    pub fn to_policy(&self, field: &str) -> Result<RetryPolicy, ConfigError> {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.delay_ms)).map_err(|_| {
            ConfigError::invalid(
                format!("{}.maxAttempts", field),
                format!("must be at least 1, got {}", self.max_attempts),
            )
        })
    }
}

/// Workspace configuration, as read from `.obscode.json` and friends.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceConfig {
    /// Environment to start in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,

    /// Retry budget for interactive insights/errors calls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_retry: Option<RetryConfig>,

    /// Retry budget for summary and usage-status calls.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summaries_retry: Option<RetryConfig>,

    /// Upper bound for a single resolver environment hook.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolver_hook_timeout_ms: Option<u64>,

    /// Re-resolve open files right after an environment switch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warm_up_on_environment_change: Option<bool>,

    /// Names of resolvers that should not be registered (`python`, `rust`,
    /// `go`, `typescript`, `javascript`), matched case-insensitively.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled_languages: Option<Vec<String>>,
}

/// Fully merged configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub environment: String,
    pub backend_retry: RetryConfig,
    pub summaries_retry: RetryConfig,
    pub resolver_hook_timeout_ms: u64,
    pub warm_up_on_environment_change: bool,
    pub disabled_languages: Vec<String>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            environment: DEFAULT_ENVIRONMENT.to_string(),
            backend_retry: RetryConfig {
                max_attempts: 2,
                delay_ms: 250,
            },
            summaries_retry: RetryConfig {
                max_attempts: 1,
                delay_ms: 0,
            },
            resolver_hook_timeout_ms: 2_000,
            warm_up_on_environment_change: true,
            disabled_languages: Vec::new(),
        }
    }
}

impl ResolvedConfig {
    pub fn resolver_hook_timeout(&self) -> Duration {
        Duration::from_millis(self.resolver_hook_timeout_ms)
    }
}
