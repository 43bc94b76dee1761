// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! TypeScript and JavaScript method resolution.
//!
//! Container: `module[.Class][.enclosing_function]...`, where the module is the
//! file stem (`index.*` takes the directory name). Methods are function
//! declarations, class methods, and variables initialized with a function or
//! arrow function.

use std::time::Instant;

use tree_sitter::{Language as Grammar, Node};

use crate::error::ResolutionError;
use crate::types::MethodInfo;

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

use super::treesitter::{self, field_text, for_each_child, MethodCollector};
use super::{LanguageResolver, SourceFile};

const ENTRY_STEMS: &[&str] = &["index"];

fn is_function_value(kind: &str) -> bool {
    matches!(
        kind,
        "arrow_function" | "function_expression" | "function" | "generator_function"
    )
}

fn visit(node: Node, scope: &mut Vec<String>, out: &mut MethodCollector) {
    let source = out.source();
    match node.kind() {
        "class_declaration" | "abstract_class_declaration" | "class" => {
            let name = field_text(&node, "name", source);
            if let Some(name) = name {
                scope.push(name.to_string());
            }
            if let Some(body) = node.child_by_field_name("body") {
                for_each_child(&body, |child| visit(child, scope, out));
            }
            if name.is_some() {
                scope.pop();
            }
        }
        "function_declaration" | "generator_function_declaration" | "method_definition" => {
            let Some(name) = field_text(&node, "name", source) else {
                return;
            };
            out.push(name, &scope.join("."), &node);
            scope.push(name.to_string());
            if let Some(body) = node.child_by_field_name("body") {
                for_each_child(&body, |child| visit(child, scope, out));
            }
            scope.pop();
        }
        "variable_declarator" => {
            let value = node
                .child_by_field_name("value")
                .filter(|v| is_function_value(v.kind()));
            let name = node
                .child_by_field_name("name")
                .filter(|n| n.kind() == "identifier")
                .and_then(|_| field_text(&node, "name", source));
            match (name, value) {
                (Some(name), Some(value)) => {
                    out.push(name, &scope.join("."), &node);
                    scope.push(name.to_string());
                    for_each_child(&value, |child| visit(child, scope, out));
                    scope.pop();
                }
                _ => for_each_child(&node, |child| visit(child, scope, out)),
            }
        }
        _ => for_each_child(&node, |child| visit(child, scope, out)),
    }
}

fn collect(
    grammar: Grammar,
    file: &SourceFile,
    metric: &str,
) -> Result<Vec<MethodInfo>, ResolutionError> {
    let start = Instant::now();
    let tree = treesitter::parse(&grammar, file)?;

    let mut scope = vec![treesitter::module_name(&file.path, ENTRY_STEMS)];
    let mut out = MethodCollector::new(file);
    visit(tree.root_node(), &mut scope, &mut out);

    #[cfg(feature = "telemetry")]
    GLOBAL_METRICS.record_operation(metric, start.elapsed());
    #[cfg(not(feature = "telemetry"))]
    let _ = (start, metric);

    Ok(out.finish())
}

/// Resolver for TypeScript (`typescript`) and TSX (`typescriptreact`).
#[derive(Debug, Default)]
pub struct TypeScriptResolver;

impl TypeScriptResolver {
    pub fn new() -> Self {
        Self
    }
}

impl LanguageResolver for TypeScriptResolver {
    fn name(&self) -> &str {
        "typescript"
    }

    fn supports(&self, language_tag: &str) -> bool {
        matches!(language_tag, "typescript" | "typescriptreact")
    }

    fn methods_in(&self, file: &SourceFile) -> Result<Vec<MethodInfo>, ResolutionError> {
        let grammar = if file.language == "typescriptreact" {
            tree_sitter_typescript::LANGUAGE_TSX
        } else {
            tree_sitter_typescript::LANGUAGE_TYPESCRIPT
        };
        collect(grammar.into(), file, "resolver.typescript.methods_in")
    }
}

/// Resolver for JavaScript, including JSX.
#[derive(Debug, Default)]
pub struct JavaScriptResolver;

impl JavaScriptResolver {
    pub fn new() -> Self {
        Self
    }
}

impl LanguageResolver for JavaScriptResolver {
    fn name(&self) -> &str {
        "javascript"
    }

    fn supports(&self, language_tag: &str) -> bool {
        matches!(language_tag, "javascript" | "javascriptreact")
    }

    fn methods_in(&self, file: &SourceFile) -> Result<Vec<MethodInfo>, ResolutionError> {
        collect(
            tree_sitter_javascript::LANGUAGE.into(),
            file,
            "resolver.javascript.methods_in",
        )
    }
}
