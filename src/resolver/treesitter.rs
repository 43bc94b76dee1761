// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Tree-sitter helpers shared by the built-in resolvers.

use std::path::Path;
use std::time::Instant;

use tracing::debug;
use tree_sitter::{Language as Grammar, Node, Parser, Tree};

use crate::error::ResolutionError;
use crate::types::{CodeObjectId, MethodInfo};

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

use super::SourceFile;

/// Parse a file with the given grammar.
///
/// A fresh parser per call keeps resolvers `Sync` without locking.
pub(crate) fn parse(grammar: &Grammar, file: &SourceFile) -> Result<Tree, ResolutionError> {
    let start = Instant::now();
    let path = file.path.display().to_string();

    let mut parser = Parser::new();
    parser
        .set_language(grammar)
        .map_err(|e| ResolutionError::parse(&path, format!("failed to load grammar: {}", e)))?;
    let tree = parser
        .parse(&file.content, None)
        .ok_or_else(|| ResolutionError::parse(&path, "parser returned no tree"))?;

    #[cfg(feature = "telemetry")]
    GLOBAL_METRICS.record_operation("resolver.parse", start.elapsed());
    #[cfg(not(feature = "telemetry"))]
    let _ = start;

    Ok(tree)
}

/// Text of a node, or an empty string for invalid UTF-8.
pub(crate) fn node_text<'a>(node: &Node, source: &'a [u8]) -> &'a str {
    node.utf8_text(source).unwrap_or("")
}

/// Text of a named field of a node.
pub(crate) fn field_text<'a>(node: &Node, field: &str, source: &'a [u8]) -> Option<&'a str> {
    node.child_by_field_name(field)
        .map(|n| node_text(&n, source))
        .filter(|t| !t.is_empty())
}

/// Visit every direct child of a node.
pub(crate) fn for_each_child<'t, F>(node: &Node<'t>, mut f: F)
where
    F: FnMut(Node<'t>),
{
    for i in 0..node.child_count() {
        if let Some(child) = node.child(i) {
            f(child);
        }
    }
}

/// Module name for a file: the file stem, or the parent directory name for
/// package entry files such as `__init__.py`, `mod.rs` or `index.ts`.
pub(crate) fn module_name(path: &Path, entry_stems: &[&str]) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("");
    if entry_stems.contains(&stem) {
        if let Some(parent) = path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
        {
            return parent.to_string();
        }
    }
    if stem.is_empty() {
        "unknown".to_string()
    } else {
        stem.to_string()
    }
}

/// Accumulates methods in source order.
pub(crate) struct MethodCollector<'f> {
    file: &'f SourceFile,
    methods: Vec<MethodInfo>,
}

impl<'f> MethodCollector<'f> {
    pub(crate) fn new(file: &'f SourceFile) -> Self {
        Self {
            file,
            methods: Vec::new(),
        }
    }

    pub(crate) fn source(&self) -> &'f [u8] {
        self.file.content.as_bytes()
    }

    /// Record a method spanning `node`.
    ///
    /// Names that cannot form a valid code object id are skipped.
    pub(crate) fn push(&mut self, name: &str, container: &str, node: &Node) {
        match CodeObjectId::new(container, name) {
            Ok(id) => self.methods.push(MethodInfo {
                name: name.to_string(),
                container: container.to_string(),
                id,
                span: node.start_byte()..node.end_byte(),
                line: node.start_position().row as u32 + 1,
            }),
            Err(e) => debug!(
                path = %self.file.path.display(),
                name,
                error = %e,
                "skipping method with unusable name"
            ),
        }
    }

    pub(crate) fn finish(self) -> Vec<MethodInfo> {
        self.methods
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_name() {
        assert_eq!(module_name(Path::new("app/billing.py"), &["__init__"]), "billing");
        assert_eq!(module_name(Path::new("app/__init__.py"), &["__init__"]), "app");
        assert_eq!(module_name(Path::new("src/cache/mod.rs"), &["mod", "lib"]), "cache");
        assert_eq!(module_name(Path::new("lib.rs"), &["mod", "lib"]), "lib");
    }
}
