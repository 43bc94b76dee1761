// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Obscode - code-object resolution and telemetry correlation.
//!
//! Maps editor positions to stable code-object identifiers and joins them
//! with insights, errors and usage data held by a remote analytics backend.
//! Results stay consistent across edits, environment switches and backend
//! outages.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`types`] - Core type definitions (CodeObjectId, MethodInfo, FileKey, Environment)
//! - [`error`] - Error types and result aliases
//! - [`config`] - Configuration loading and merging
//! - [`retry`] - Bounded retry for remote calls
//! - [`resolver`] - Per-language method resolution and the resolver registry
//! - [`document`] - Per-file cache of resolved code objects
//! - [`backend`] - Analytics backend boundary and record types
//! - [`providers`] - Insights, errors and summaries providers with list building
//! - [`caret`] - Caret context and the presentation sink
//! - [`orchestrator`] - Environment-change fan-out
//! - [`engine`] - Host-facing facade
//! - [`telemetry`] - Tracing, metrics, and observability infrastructure
//!
//! ```text
//!  caret / file events ──► Engine ──► ResolverRegistry ──► LanguageResolver
//!                             │                                  │
//!                             ▼                                  ▼
//!                    DocumentInfoCache ◄──────────────── CodeObjectId
//!                             │
//!                             ▼
//!         Insights / Errors / Summaries providers ──► RetryPolicy ──► backend
//!                             │
//!                             ▼
//!                     ListItem<T> ──► ViewSink
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use obscode::{config::load_config, Engine, Environment};
//!
//! let engine = Engine::builder(load_config(".")?)
//!     .backend(backend)
//!     .build()?;
//!
//! let view = engine.on_caret_moved(Path::new("app/billing.py"), 812).await;
//! let report = engine.on_environment_changed(Environment::new("PROD")).await;
//! ```

pub mod backend;
pub mod caret;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod providers;
pub mod resolver;
pub mod retry;
pub mod telemetry;
pub mod types;

// Re-export commonly used types at crate root
pub use backend::AnalyticsBackend;
pub use caret::{CaretView, ViewSink};
pub use document::{DocumentInfo, DocumentInfoCache};
pub use engine::{Engine, EngineBuilder};
pub use error::{BackendError, ConfigError, ResolutionError, Result, RetryError};
pub use orchestrator::{EnvironmentChangeOrchestrator, EnvironmentChangeReport};
pub use providers::{ListItem, ListViewItem};
pub use resolver::{LanguageResolver, ResolverRegistry, SourceAccess};
pub use retry::{RetryExecutor, RetryPolicy};
pub use types::{CodeObjectId, Environment, EnvironmentHandle, FileKey, MethodUnderCaret};

/// Obscode version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_public_exports() {
        let id = CodeObjectId::new("app.Billing", "charge").unwrap();
        assert_eq!(id.to_string(), "app.Billing$_$charge");
        assert!(!ResolverRegistry::with_defaults().is_empty());
    }
}
