// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Analytics backend boundary.
//!
//! The engine never talks to the network itself. The host supplies an
//! [`AnalyticsBackend`] that performs the remote calls and maps transport
//! failures onto [`BackendError`]. Only [`BackendError::Unavailable`] is
//! retried by the providers.
//!
//! Calls are blocking; providers run them on worker threads.

mod types;

pub use types::{
    CodeObjectUsage, EnvironmentUsage, ErrorRecord, GlobalInsight, InsightRecord, InsightScope,
    UsageStatusResult,
};

use crate::error::BackendError;
use crate::types::{CodeObjectId, Environment};

/// Remote source of insights, errors and usage data.
#[cfg_attr(test, mockall::automock)]
pub trait AnalyticsBackend: Send + Sync {
    /// Insights for a batch of code objects.
    fn fetch_insights(&self, ids: &[CodeObjectId]) -> Result<Vec<InsightRecord>, BackendError>;

    /// Errors raised in one code object.
    fn fetch_errors(&self, id: &CodeObjectId) -> Result<Vec<ErrorRecord>, BackendError>;

    /// Usage status across environments.
    fn fetch_usage_status(
        &self,
        environments: &[Environment],
    ) -> Result<UsageStatusResult, BackendError>;

    /// Insights not tied to a single code object.
    fn fetch_global_insights(&self) -> Result<Vec<GlobalInsight>, BackendError>;
}
