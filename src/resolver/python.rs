// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Python method resolution.
//!
//! Container: `module[.Class[.enclosing_function]...]`, where the module is
//! the file stem (`__init__.py` takes the package directory name).

use std::time::Instant;

use tree_sitter::Node;

use crate::error::ResolutionError;
use crate::types::MethodInfo;

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

use super::treesitter::{self, field_text, for_each_child, MethodCollector};
use super::{LanguageResolver, SourceFile};

/// Resolver for Python sources.
#[derive(Debug, Default)]
pub struct PythonResolver;

impl PythonResolver {
    pub fn new() -> Self {
        Self
    }

    fn visit(node: Node, scope: &mut Vec<String>, out: &mut MethodCollector) {
        let source = out.source();
        match node.kind() {
            "class_definition" => {
                let Some(name) = field_text(&node, "name", source) else {
                    return;
                };
                scope.push(name.to_string());
                if let Some(body) = node.child_by_field_name("body") {
                    for_each_child(&body, |child| Self::visit(child, scope, out));
                }
                scope.pop();
            }
            "function_definition" => {
                let Some(name) = field_text(&node, "name", source) else {
                    return;
                };
                out.push(name, &scope.join("."), &node);
                scope.push(name.to_string());
                if let Some(body) = node.child_by_field_name("body") {
                    for_each_child(&body, |child| Self::visit(child, scope, out));
                }
                scope.pop();
            }
            _ => for_each_child(&node, |child| Self::visit(child, scope, out)),
        }
    }
}

impl LanguageResolver for PythonResolver {
    fn name(&self) -> &str {
        "python"
    }

    fn supports(&self, language_tag: &str) -> bool {
        language_tag == "python"
    }

    fn methods_in(&self, file: &SourceFile) -> Result<Vec<MethodInfo>, ResolutionError> {
        let start = Instant::now();
        let tree = treesitter::parse(&tree_sitter_python::LANGUAGE.into(), file)?;

        let mut scope = vec![treesitter::module_name(&file.path, &["__init__"])];
        let mut out = MethodCollector::new(file);
        Self::visit(tree.root_node(), &mut scope, &mut out);

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("resolver.python.methods_in", start.elapsed());
        #[cfg(not(feature = "telemetry"))]
        let _ = start;

        Ok(out.finish())
    }
}
