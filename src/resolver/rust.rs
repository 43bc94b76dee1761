// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Rust method resolution.
//!
//! Container: `module[::nested_mod...][::Type]`. The module comes from the
//! file (`mod.rs`, `lib.rs` and `main.rs` take the directory name); `Type` is
//! the self type of the enclosing `impl`, or the enclosing trait.

use std::time::Instant;

use tree_sitter::Node;

use crate::error::ResolutionError;
use crate::types::MethodInfo;

#[cfg(feature = "telemetry")]
use crate::telemetry::metrics::GLOBAL_METRICS;

use super::treesitter::{self, field_text, for_each_child, node_text, MethodCollector};
use super::{LanguageResolver, SourceFile};

/// Resolver for Rust sources.
#[derive(Debug, Default)]
pub struct RustResolver;

impl RustResolver {
    pub fn new() -> Self {
        Self
    }

    fn visit(node: Node, scope: &mut Vec<String>, out: &mut MethodCollector) {
        let source = out.source();
        match node.kind() {
            "mod_item" => {
                // `mod foo;` declarations have no body
                let (Some(name), Some(body)) =
                    (field_text(&node, "name", source), node.child_by_field_name("body"))
                else {
                    return;
                };
                scope.push(name.to_string());
                for_each_child(&body, |child| Self::visit(child, scope, out));
                scope.pop();
            }
            "impl_item" => {
                let Some(ty) = node.child_by_field_name("type") else {
                    return;
                };
                scope.push(base_type_name(node_text(&ty, source)));
                if let Some(body) = node.child_by_field_name("body") {
                    for_each_child(&body, |child| Self::visit(child, scope, out));
                }
                scope.pop();
            }
            "trait_item" => {
                let Some(name) = field_text(&node, "name", source) else {
                    return;
                };
                scope.push(name.to_string());
                if let Some(body) = node.child_by_field_name("body") {
                    for_each_child(&body, |child| Self::visit(child, scope, out));
                }
                scope.pop();
            }
            "function_item" => {
                let Some(name) = field_text(&node, "name", source) else {
                    return;
                };
                out.push(name, &scope.join("::"), &node);
                // Nested items share the enclosing container
                if let Some(body) = node.child_by_field_name("body") {
                    for_each_child(&body, |child| Self::visit(child, scope, out));
                }
            }
            _ => for_each_child(&node, |child| Self::visit(child, scope, out)),
        }
    }
}

/// Strip generics and references: `&'a Cache<K, V>` becomes `Cache`.
fn base_type_name(text: &str) -> String {
    let text = text.trim_start_matches('&').trim_start();
    let text = match text.strip_prefix('\'') {
        // skip a lifetime like `'a `
        Some(rest) => rest.split_once(' ').map(|(_, t)| t).unwrap_or(rest),
        None => text,
    };
    let text = text.trim_start_matches("mut ").trim_start_matches("dyn ");
    let end = text.find('<').unwrap_or(text.len());
    let base = text[..end].trim();
    base.rsplit("::").next().unwrap_or(base).to_string()
}

impl LanguageResolver for RustResolver {
    fn name(&self) -> &str {
        "rust"
    }

    fn supports(&self, language_tag: &str) -> bool {
        language_tag == "rust"
    }

    fn methods_in(&self, file: &SourceFile) -> Result<Vec<MethodInfo>, ResolutionError> {
        let start = Instant::now();
        let tree = treesitter::parse(&tree_sitter_rust::LANGUAGE.into(), file)?;

        let mut scope = vec![treesitter::module_name(&file.path, &["mod", "lib", "main"])];
        let mut out = MethodCollector::new(file);
        Self::visit(tree.root_node(), &mut scope, &mut out);

        #[cfg(feature = "telemetry")]
        GLOBAL_METRICS.record_operation("resolver.rust.methods_in", start.elapsed());
        #[cfg(not(feature = "telemetry"))]
        let _ = start;

        Ok(out.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
use std::collections::HashMap;

pub fn connect(url: &str) -> Client {
    Client::new(url)
}

pub struct Client {
    url: String,
}

impl Client {
    pub fn new(url: &str) -> Self {
        Self { url: url.to_string() }
    }

    pub fn get(&self, path: &str) -> String {
        format!("{}{}", self.url, path)
    }
}

pub trait Fetch {
    fn fetch(&self) -> String;

    fn fetch_twice(&self) -> String {
        self.fetch() + &self.fetch()
    }
}

impl<'a> Fetch for &'a Client {
    fn fetch(&self) -> String {
        self.get("/")
    }
}

mod retry {
    pub fn backoff(attempt: u32) -> u64 {
        2u64.pow(attempt)
    }
}
"#;

    #[test]
    fn test_methods_in_source_order() {
        let file = SourceFile::new("src/http/mod.rs", "rust", SAMPLE);
        let methods = RustResolver::new().methods_in(&file).unwrap();
        let ids: Vec<&str> = methods.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "http$_$connect",
                "http::Client$_$new",
                "http::Client$_$get",
                "http::Fetch$_$fetch_twice",
                "http::Client$_$fetch",
                "http::retry$_$backoff",
            ]
        );
    }

    #[test]
    fn test_resolve_method_at() {
        let file = SourceFile::new("src/client.rs", "rust", SAMPLE);
        let offset = SAMPLE.find("format!").unwrap();
        let method = RustResolver::new()
            .resolve_method_at(&file, offset)
            .unwrap()
            .unwrap();
        assert_eq!(method.name, "get");
        assert_eq!(method.class_name, "client::Client");
        assert_eq!(method.id.as_str(), "client::Client$_$get");
    }

    #[test]
    fn test_base_type_name() {
        assert_eq!(base_type_name("Client"), "Client");
        assert_eq!(base_type_name("Cache<K, V>"), "Cache");
        assert_eq!(base_type_name("&'a Client"), "Client");
        assert_eq!(base_type_name("&mut Client"), "Client");
        assert_eq!(base_type_name("crate::net::Client"), "Client");
    }
}
