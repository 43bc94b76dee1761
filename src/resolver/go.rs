// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Go method resolution.
//!
//! Container: `package` for functions, `package.Receiver` for methods.

use std::time::Instant;

use tree_sitter::Node;

use crate::error::ResolutionError;
use crate::types::MethodInfo;

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

use super::treesitter::{self, field_text, for_each_child, node_text, MethodCollector};
use super::{LanguageResolver, SourceFile};

/// Resolver for Go sources.
#[derive(Debug, Default)]
pub struct GoResolver;

impl GoResolver {
    pub fn new() -> Self {
        Self
    }

    fn package_name(root: &Node, source: &[u8]) -> Option<String> {
        let mut name = None;
        for_each_child(root, |child| {
            if name.is_none() && child.kind() == "package_clause" {
                for_each_child(&child, |ident| {
                    if ident.kind() == "package_identifier" {
                        name = Some(node_text(&ident, source).to_string());
                    }
                });
            }
        });
        name
    }

    /// Receiver type of a method declaration, without pointer or type params.
    fn receiver_type(node: &Node, source: &[u8]) -> Option<String> {
        let receiver = node.child_by_field_name("receiver")?;
        let mut ty = None;
        for_each_child(&receiver, |param| {
            if ty.is_none() && param.kind() == "parameter_declaration" {
                ty = param
                    .child_by_field_name("type")
                    .map(|t| node_text(&t, source));
            }
        });
        let ty = ty?.trim_start_matches('*').trim();
        let end = ty.find('[').unwrap_or(ty.len());
        let base = ty[..end].trim();
        (!base.is_empty()).then(|| base.to_string())
    }
}

impl LanguageResolver for GoResolver {
    fn name(&self) -> &str {
        "go"
    }

    fn supports(&self, language_tag: &str) -> bool {
        language_tag == "go"
    }

    fn methods_in(&self, file: &SourceFile) -> Result<Vec<MethodInfo>, ResolutionError> {
        let start = Instant::now();
        let tree = treesitter::parse(&tree_sitter_go::LANGUAGE.into(), file)?;
        let root = tree.root_node();
        let source = file.content.as_bytes();

        let package = Self::package_name(&root, source)
            .unwrap_or_else(|| treesitter::module_name(&file.path, &[]));
        let mut out = MethodCollector::new(file);

        // Go only allows functions and methods at the top level
        for_each_child(&root, |node| match node.kind() {
            "function_declaration" => {
                if let Some(name) = field_text(&node, "name", source) {
                    out.push(name, &package, &node);
                }
            }
            "method_declaration" => {
                if let Some(name) = field_text(&node, "name", source) {
                    let container = match Self::receiver_type(&node, source) {
                        Some(receiver) => format!("{}.{}", package, receiver),
                        None => package.clone(),
                    };
                    out.push(name, &container, &node);
                }
            }
            _ => {}
        });

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("resolver.go.methods_in", start.elapsed());
        #[cfg(not(feature = "telemetry"))]
        let _ = start;

        Ok(out.finish())
    }
}
