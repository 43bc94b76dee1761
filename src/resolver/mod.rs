// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Per-language method resolution.
//!
//! A [`LanguageResolver`] turns a source file into the methods it contains and
//! finds the method enclosing a caret offset. Resolvers are registered
//! explicitly in a [`ResolverRegistry`] at startup and selected by language tag.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │               ResolverRegistry                │
//! │   (first registered resolver for a tag wins)  │
//! └───────────────────────────────────────────────┘
//!          │           │           │          │
//!          ▼           ▼           ▼          ▼
//!     ┌────────┐  ┌────────┐  ┌────────┐  ┌────────────┐
//!     │ Python │  │  Rust  │  │   Go   │  │ TypeScript │
//!     └────────┘  └────────┘  └────────┘  │ JavaScript │
//!                                         └────────────┘
//!               (tree-sitter method enumeration)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use obscode::resolver::{FsSourceAccess, ResolverRegistry, SourceAccess};
//!
//! let registry = ResolverRegistry::with_defaults();
//! let file = FsSourceAccess.load(Path::new("app/billing.py"))?.unwrap();
//! if let Some(resolver) = registry.find(&file.language) {
//!     let method = resolver.resolve_method_at(&file, 120)?;
//! }
//! ```

mod go;
mod python;
mod registry;
mod rust;
mod source;
mod treesitter;
mod typescript;

pub use go::GoResolver;
pub use python::PythonResolver;
pub use registry::{ResolverRegistry, ResolverRegistryBuilder};
pub use rust::RustResolver;
pub use source::{FsSourceAccess, Language, OverlaySourceAccess, SourceAccess, SourceFile};
pub use typescript::{JavaScriptResolver, TypeScriptResolver};

use crate::error::ResolutionError;
use crate::types::{Environment, MethodInfo, MethodUnderCaret};

/// Resolves methods for one or more languages.
///
/// Resolvers must not hold environment-scoped answers: the same file content
/// yields the same methods in every environment. State tied to an environment
/// (such as a connection to an external language service) is refreshed through
/// [`LanguageResolver::on_environment_changed`].
pub trait LanguageResolver: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Whether this resolver handles the given language tag.
    fn supports(&self, language_tag: &str) -> bool;

    /// Enumerate every method in the file, in source order.
    fn methods_in(&self, file: &SourceFile) -> Result<Vec<MethodInfo>, ResolutionError>;

    /// Find the innermost method enclosing `offset` (a byte offset).
    ///
    /// A caret outside every method is `Ok(None)`, not an error.
    fn resolve_method_at(
        &self,
        file: &SourceFile,
        offset: usize,
    ) -> Result<Option<MethodUnderCaret>, ResolutionError> {
        let methods = self.methods_in(file)?;
        Ok(innermost_method(&methods, offset).map(|m| m.under_caret(&file.path)))
    }

    /// Refresh environment-scoped state. Called once per environment switch.
    ///
    /// Must be safe to call repeatedly. The caller bounds it with a timeout,
    /// so implementations should not rely on it running to completion.
    fn on_environment_changed(&self, _environment: &Environment) -> Result<(), ResolutionError> {
        Ok(())
    }
}

/// Pick the smallest method containing `offset`.
///
/// On equal sizes the later one in source order wins (it is the more deeply
/// nested one in a pre-order enumeration).
pub fn innermost_method(methods: &[MethodInfo], offset: usize) -> Option<&MethodInfo> {
    methods
        .iter()
        .filter(|m| m.contains(offset))
        .fold(None, |best: Option<&MethodInfo>, m| match best {
            Some(b) if b.span.len() < m.span.len() => Some(b),
            _ => Some(m),
        })
}
