// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Resolver registry.
//!
//! Resolvers are registered once at startup through [`ResolverRegistryBuilder`]
//! and looked up by language tag. Lookup scans in registration order, so when
//! two resolvers support the same tag the first one registered wins.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, warn};

use super::{
    GoResolver, JavaScriptResolver, LanguageResolver, PythonResolver, RustResolver,
    TypeScriptResolver,
};

/// Immutable, ordered set of language resolvers.
#[derive(Clone)]
pub struct ResolverRegistry {
    resolvers: Vec<Arc<dyn LanguageResolver>>,
}

impl ResolverRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            resolvers: Vec::new(),
        }
    }

    /// Create a registry with the built-in tree-sitter resolvers.
    pub fn with_defaults() -> Self {
        let mut builder = ResolverRegistryBuilder::new();
        builder.register_defaults();
        builder.build()
    }

    /// Start building a registry.
    pub fn builder() -> ResolverRegistryBuilder {
        ResolverRegistryBuilder::new()
    }

    /// Find the resolver for a language tag.
    ///
    /// A resolver whose `supports` panics is treated as not supporting the tag.
    pub fn find(&self, language_tag: &str) -> Option<Arc<dyn LanguageResolver>> {
        for resolver in &self.resolvers {
            let supported =
                panic::catch_unwind(AssertUnwindSafe(|| resolver.supports(language_tag)));
            match supported {
                Ok(true) => {
                    debug!(resolver = resolver.name(), language = language_tag, "resolver selected");
                    return Some(Arc::clone(resolver));
                }
                Ok(false) => {}
                Err(_) => warn!(
                    resolver = resolver.name(),
                    language = language_tag,
                    "resolver panicked in supports(); skipping"
                ),
            }
        }
        None
    }

    /// Resolvers in registration order.
    pub fn resolvers(&self) -> &[Arc<dyn LanguageResolver>] {
        &self.resolvers
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

impl Default for ResolverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.resolvers.iter().map(|r| r.name()))
            .finish()
    }
}

/// Builder for constructing a [`ResolverRegistry`].
#[derive(Default)]
pub struct ResolverRegistryBuilder {
    resolvers: Vec<Arc<dyn LanguageResolver>>,
    disabled: Vec<String>,
}

impl ResolverRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resolver. Earlier registrations take priority.
    pub fn register<R: LanguageResolver + 'static>(&mut self, resolver: R) -> &mut Self {
        self.resolvers.push(Arc::new(resolver));
        self
    }

    /// Register an already shared resolver.
    pub fn register_arc(&mut self, resolver: Arc<dyn LanguageResolver>) -> &mut Self {
        self.resolvers.push(resolver);
        self
    }

    /// Register the built-in resolvers.
    pub fn register_defaults(&mut self) -> &mut Self {
        self.register(PythonResolver::new())
            .register(RustResolver::new())
            .register(GoResolver::new())
            .register(TypeScriptResolver::new())
            .register(JavaScriptResolver::new())
    }

    /// Drop resolvers whose name matches one of `names` (case-insensitive).
    pub fn disable<I, S>(&mut self, names: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.disabled
            .extend(names.into_iter().map(|n| n.as_ref().to_lowercase()));
        self
    }

    pub fn build(self) -> ResolverRegistry {
        let disabled = self.disabled;
        let resolvers = self
            .resolvers
            .into_iter()
            .filter(|r| {
                let keep = !disabled.contains(&r.name().to_lowercase());
                if !keep {
                    debug!(resolver = r.name(), "resolver disabled by configuration");
                }
                keep
            })
            .collect();
        ResolverRegistry { resolvers }
    }
}
