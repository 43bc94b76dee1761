// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Document types.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::resolver::innermost_method;
use crate::types::{CodeObjectId, Environment, FileKey, MethodInfo};

/// Resolved code objects of one file, produced by a full rebuild.
///
/// Never mutated after creation; the cache replaces it as a whole.
#[derive(Debug, Clone)]
pub struct DocumentInfo {
    pub file_key: FileKey,
    /// Methods in source order, de-duplicated by id.
    pub methods: Vec<MethodInfo>,
    /// Monotonic across every rebuild the cache performs.
    pub version: u64,
    /// Environment current when the rebuild started.
    pub environment: Arc<Environment>,
    /// SHA-256 of the content the methods were resolved from.
    pub content_hash: String,
    pub resolved_at: DateTime<Utc>,
}

impl DocumentInfo {
    pub(crate) fn new(
        file_key: FileKey,
        methods: Vec<MethodInfo>,
        version: u64,
        environment: Arc<Environment>,
        content_hash: String,
    ) -> Self {
        let mut seen = HashSet::new();
        let methods = methods
            .into_iter()
            .filter(|m| seen.insert(m.id.clone()))
            .collect();
        Self {
            file_key,
            methods,
            version,
            environment,
            content_hash,
            resolved_at: Utc::now(),
        }
    }

    /// Ids of every method, in source order.
    pub fn method_ids(&self) -> Vec<CodeObjectId> {
        self.methods.iter().map(|m| m.id.clone()).collect()
    }

    /// Look up a method by id.
    pub fn method(&self, id: &CodeObjectId) -> Option<&MethodInfo> {
        self.methods.iter().find(|m| &m.id == id)
    }

    /// Innermost method containing a byte offset.
    pub fn method_at(&self, offset: usize) -> Option<&MethodInfo> {
        innermost_method(&self.methods, offset)
    }
}

/// Lifecycle state of a cache entry. Absent entries have no state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// A rebuild is in flight.
    Resolving,
    /// Up to date with the last change notification.
    Fresh,
    /// Invalidated; the next read rebuilds.
    Stale,
}
