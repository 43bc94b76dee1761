// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Host-facing facade.
//!
//! [`Engine`] wires the registry, cache, providers, caret tracker and
//! orchestrator together and exposes the entry points a host integration
//! calls from its event handlers.
//!
//! Entry points that may block (rebuilds, backend calls, retry sleeps) are
//! `async` and run the work on tokio's blocking pool. Invalidation-only entry
//! points are synchronous and return immediately.
//!
//! # Example
//!
//! ```rust,ignore
//! use obscode::{config, Engine};
//!
//! let config = config::load_config(workspace_root)?;
//! let engine = Engine::builder(config)
//!     .backend(Arc::new(MyBackend::connect(url)?))
//!     .view_sink(Arc::new(MyPanel::new()))
//!     .build()?;
//!
//! engine.on_file_opened(Path::new("app/billing.py")).await;
//! let view = engine.on_caret_moved(Path::new("app/billing.py"), 1204).await;
//! engine.on_environment_changed(Environment::new("PROD")).await;
//! ```

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use tracing::{debug, info, warn};

use crate::backend::{AnalyticsBackend, ErrorRecord, GlobalInsight, InsightRecord, UsageStatusResult};
use crate::caret::{CaretTracker, CaretView, NoopViewSink, ViewSink};
use crate::config::ResolvedConfig;
use crate::document::{DocumentInfo, DocumentInfoCache};
use crate::error::Result;
use crate::orchestrator::{EnvironmentChangeOrchestrator, EnvironmentChangeReport, OrchestratorConfig};
use crate::providers::{ErrorsProvider, InsightsProvider, ListItem, SummariesProvider};
use crate::resolver::{FsSourceAccess, LanguageResolver, ResolverRegistry, SourceAccess};
use crate::types::{CodeObjectId, Environment, EnvironmentHandle, FileKey};

/// Builder for [`Engine`] with fluent API.
pub struct EngineBuilder {
    config: ResolvedConfig,
    source: Option<Arc<dyn SourceAccess>>,
    backend: Option<Arc<dyn AnalyticsBackend>>,
    sink: Option<Arc<dyn ViewSink>>,
    resolvers: Vec<Arc<dyn LanguageResolver>>,
    defaults: bool,
}

impl EngineBuilder {
    pub fn new(config: ResolvedConfig) -> Self {
        Self {
            config,
            source: None,
            backend: None,
            sink: None,
            resolvers: Vec::new(),
            defaults: true,
        }
    }

    /// Source access; defaults to reading from disk.
    pub fn source(mut self, source: Arc<dyn SourceAccess>) -> Self {
        self.source = Some(source);
        self
    }

    /// Analytics backend. Required.
    pub fn backend(mut self, backend: Arc<dyn AnalyticsBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Presentation sink; defaults to discarding views.
    pub fn view_sink(mut self, sink: Arc<dyn ViewSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Add a resolver. Added resolvers take priority over the built-in ones.
    pub fn resolver(mut self, resolver: Arc<dyn LanguageResolver>) -> Self {
        self.resolvers.push(resolver);
        self
    }

    /// Skip the built-in tree-sitter resolvers.
    pub fn without_default_resolvers(mut self) -> Self {
        self.defaults = false;
        self
    }

    /// Build the engine.
    ///
    /// Fails on a missing backend or invalid retry settings.
    pub fn build(self) -> Result<Engine> {
        let backend = self
            .backend
            .ok_or_else(|| anyhow!("an analytics backend is required"))?;
        let backend_retry = self
            .config
            .backend_retry
            .to_policy("backendRetry")
            .context("invalid backend retry settings")?;
        let summaries_retry = self
            .config
            .summaries_retry
            .to_policy("summariesRetry")
            .context("invalid summaries retry settings")?;

        let mut registry = ResolverRegistry::builder();
        for resolver in self.resolvers {
            registry.register_arc(resolver);
        }
        if self.defaults {
            registry.register_defaults();
        }
        registry.disable(&self.config.disabled_languages);
        let registry = Arc::new(registry.build());

        let source = self
            .source
            .unwrap_or_else(|| Arc::new(FsSourceAccess));
        let sink = self.sink.unwrap_or_else(|| Arc::new(NoopViewSink));
        let environment = EnvironmentHandle::new(Environment::new(self.config.environment.clone()));

        let cache = Arc::new(DocumentInfoCache::new(
            source,
            Arc::clone(&registry),
            environment.clone(),
        ));
        let insights = Arc::new(InsightsProvider::new(Arc::clone(&backend), backend_retry));
        let errors = Arc::new(ErrorsProvider::new(Arc::clone(&backend), backend_retry));
        let summaries = Arc::new(SummariesProvider::new(backend, summaries_retry));
        let caret = Arc::new(CaretTracker::new(
            Arc::clone(&cache),
            Arc::clone(&insights),
            Arc::clone(&errors),
            sink,
            environment.clone(),
        ));
        let orchestrator = EnvironmentChangeOrchestrator::new(
            environment.clone(),
            Arc::clone(&cache),
            Arc::clone(&registry),
            caret.clone(),
            OrchestratorConfig {
                hook_timeout: self.config.resolver_hook_timeout(),
                warm_up: self.config.warm_up_on_environment_change,
            },
        );

        info!(
            environment = %self.config.environment,
            resolvers = ?registry,
            "engine ready"
        );

        Ok(Engine {
            config: self.config,
            environment,
            registry,
            cache,
            insights,
            errors,
            summaries,
            caret,
            orchestrator,
        })
    }
}

/// The correlation engine.
pub struct Engine {
    config: ResolvedConfig,
    environment: EnvironmentHandle,
    registry: Arc<ResolverRegistry>,
    cache: Arc<DocumentInfoCache>,
    insights: Arc<InsightsProvider>,
    errors: Arc<ErrorsProvider>,
    summaries: Arc<SummariesProvider>,
    caret: Arc<CaretTracker>,
    orchestrator: EnvironmentChangeOrchestrator,
}

/// Run blocking work on the blocking pool, logging a failed task.
async fn blocking<T, F>(what: &'static str, work: F) -> Option<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    match tokio::task::spawn_blocking(work).await {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(task = what, error = %err, "blocking task failed");
            None
        }
    }
}

impl Engine {
    /// Start building an engine.
    pub fn builder(config: ResolvedConfig) -> EngineBuilder {
        EngineBuilder::new(config)
    }

    // ========================================================================
    // Host entry points
    // ========================================================================

    /// A file was opened: resolve it eagerly.
    pub async fn on_file_opened(&self, path: &Path) -> Option<Arc<DocumentInfo>> {
        let cache = Arc::clone(&self.cache);
        let key = FileKey::from_path(path);
        blocking("file_opened", move || cache.get(&key)).await.flatten()
    }

    /// A file's content changed. The next read rebuilds it.
    pub fn on_file_changed(&self, path: &Path) {
        let key = FileKey::from_path(path);
        debug!(file = %key, "file changed");
        self.cache.on_file_changed(&key);
    }

    /// A file was closed: drop its cached state.
    pub fn on_file_closed(&self, path: &Path) {
        let key = FileKey::from_path(path);
        debug!(file = %key, "file closed");
        self.cache.remove(&key);
        self.caret.forget_file(&key);
    }

    /// The project was closed: drop all cached state.
    pub fn on_project_closed(&self) {
        info!(entries = self.cache.len(), "project closed");
        self.cache.clear();
        self.caret.forget();
    }

    /// The caret moved. Resolves the method, fetches its insights and errors
    /// and pushes the view to the sink.
    pub async fn on_caret_moved(&self, path: &Path, offset: usize) -> Option<CaretView> {
        let caret = Arc::clone(&self.caret);
        let key = FileKey::from_path(path);
        blocking("caret_moved", move || caret.on_caret_moved(key, offset)).await
    }

    /// The environment changed.
    pub async fn on_environment_changed(&self, environment: Environment) -> EnvironmentChangeReport {
        self.orchestrator.environment_changed(environment).await
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub async fn insights(&self, ids: Vec<CodeObjectId>) -> Vec<ListItem<InsightRecord>> {
        let insights = Arc::clone(&self.insights);
        blocking("insights", move || insights.get_insights(&ids))
            .await
            .unwrap_or_default()
    }

    pub async fn errors(&self, id: CodeObjectId) -> Vec<ListItem<ErrorRecord>> {
        let errors = Arc::clone(&self.errors);
        blocking("errors", move || errors.get_errors(&id))
            .await
            .unwrap_or_default()
    }

    pub async fn summaries(&self) -> Vec<ListItem<GlobalInsight>> {
        let summaries = Arc::clone(&self.summaries);
        blocking("summaries", move || summaries.get_summaries())
            .await
            .unwrap_or_default()
    }

    pub async fn usage_status(&self, environments: Vec<Environment>) -> UsageStatusResult {
        let summaries = Arc::clone(&self.summaries);
        blocking("usage_status", move || summaries.usage_status(&environments))
            .await
            .unwrap_or_default()
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn current_environment(&self) -> Arc<Environment> {
        self.environment.current()
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn registry(&self) -> &ResolverRegistry {
        &self.registry
    }

    pub fn cache(&self) -> &DocumentInfoCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockAnalyticsBackend;
    use crate::config::RetryConfig;
    use crate::resolver::OverlaySourceAccess;

    fn offline_backend() -> Arc<dyn AnalyticsBackend> {
        let mut backend = MockAnalyticsBackend::new();
        backend.expect_fetch_insights().returning(|_| Ok(Vec::new()));
        backend.expect_fetch_errors().returning(|_| Ok(Vec::new()));
        Arc::new(backend)
    }

    #[test]
    fn test_build_requires_backend() {
        let err = Engine::builder(ResolvedConfig::default()).build().err().unwrap();
        assert!(err.to_string().contains("backend"));
    }

    #[test]
    fn test_zero_attempts_is_configuration_error() {
        let config = ResolvedConfig {
            backend_retry: RetryConfig {
                max_attempts: 0,
                delay_ms: 0,
            },
            ..ResolvedConfig::default()
        };
        let err = Engine::builder(config)
            .backend(offline_backend())
            .build()
            .err()
            .unwrap();
        assert!(err.to_string().contains("backend retry"));
    }

    #[test]
    fn test_disabled_languages_drop_resolvers() {
        let config = ResolvedConfig {
            disabled_languages: vec!["Go".to_string(), "rust".to_string()],
            ..ResolvedConfig::default()
        };
        let engine = Engine::builder(config).backend(offline_backend()).build().unwrap();
        assert_eq!(engine.registry().len(), 3);
        assert!(engine.registry().find("go").is_none());
        assert_eq!(engine.current_environment().name(), "LOCAL");
    }

    #[tokio::test]
    async fn test_file_lifecycle() {
        let overlay = Arc::new(OverlaySourceAccess::new());
        overlay.set_buffer("svc/app.py", "def a():\n    pass\n");
        let engine = Engine::builder(ResolvedConfig::default())
            .backend(offline_backend())
            .source(overlay.clone())
            .build()
            .unwrap();
        let path = Path::new("svc/app.py");

        let info = engine.on_file_opened(path).await.unwrap();
        assert_eq!(info.methods.len(), 1);

        overlay.set_buffer("svc/app.py", "def a():\n    pass\n\ndef b():\n    pass\n");
        engine.on_file_changed(path);
        let view = engine.on_caret_moved(path, 30).await.unwrap();
        assert_eq!(view.method.unwrap().name, "b");

        engine.on_file_closed(path);
        assert!(engine.cache().all_keys().is_empty());
    }
}
