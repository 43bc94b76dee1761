// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Core type definitions shared across the engine.
//!
//! - [`CodeObjectId`]: stable identifier of a method, independent of editor state
//! - [`MethodInfo`] / [`MethodUnderCaret`]: resolved methods
//! - [`FileKey`]: opaque, path-derived cache key
//! - [`Environment`] / [`EnvironmentHandle`]: the telemetry scope and its shared current value

use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::error::ResolutionError;

// ============================================================================
// Code Object Identifier
// ============================================================================

/// Identifier of a code object: `container$_$member`.
///
/// The first separator in the string always splits it back into the same
/// container and member; construction rejects names that break this.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CodeObjectId(String);

impl CodeObjectId {
    /// Reserved separator between container and member.
    pub const SEPARATOR: &'static str = "$_$";

    /// Build an id from a fully-qualified container name and a member name.
    pub fn new(container: &str, member: &str) -> Result<Self, ResolutionError> {
        for (what, part) in [("container", container), ("member", member)] {
            if part.is_empty() {
                return Err(ResolutionError::InvalidCodeObjectId(format!("empty {}", what)));
            }
            if part.contains(Self::SEPARATOR) {
                return Err(ResolutionError::InvalidCodeObjectId(format!(
                    "{} '{}' contains reserved separator",
                    what, part
                )));
            }
        }
        let joined = format!("{}{}{}", container, Self::SEPARATOR, member);
        if joined.split_once(Self::SEPARATOR) != Some((container, member)) {
            return Err(ResolutionError::InvalidCodeObjectId(format!(
                "'{}' is ambiguous at the separator",
                joined
            )));
        }
        Ok(Self(joined))
    }

    /// Parse an id received from elsewhere (e.g. the backend).
    pub fn parse(raw: &str) -> Option<Self> {
        let (container, member) = raw.split_once(Self::SEPARATOR)?;
        Self::new(container, member).ok()
    }

    /// The container part (class, module or package).
    pub fn container(&self) -> &str {
        self.0
            .split_once(Self::SEPARATOR)
            .map(|(c, _)| c)
            .unwrap_or(&self.0)
    }

    /// The member part (method or function name).
    pub fn member(&self) -> &str {
        self.0
            .split_once(Self::SEPARATOR)
            .map(|(_, m)| m)
            .unwrap_or("")
    }

    /// The full string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CodeObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CodeObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Methods
// ============================================================================

/// A method found by full-file enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodInfo {
    /// Simple method name.
    pub name: String,
    /// Fully-qualified container (module, class, package...).
    pub container: String,
    /// Code object id derived from container and name.
    pub id: CodeObjectId,
    /// Byte range of the whole method node.
    pub span: Range<usize>,
    /// Start line (1-indexed).
    pub line: u32,
}

impl MethodInfo {
    /// Check whether a byte offset lies within the method.
    ///
    /// The end byte is inclusive so a caret placed right after the closing
    /// brace still belongs to the method.
    pub fn contains(&self, offset: usize) -> bool {
        self.span.start <= offset && offset <= self.span.end
    }

    /// Convert into the value handed to the presentation layer.
    pub fn under_caret(&self, file_path: &Path) -> MethodUnderCaret {
        MethodUnderCaret {
            name: self.name.clone(),
            class_name: self.container.clone(),
            id: self.id.clone(),
            file_path: file_path.to_path_buf(),
        }
    }
}

/// The method enclosing the caret. Created fresh on every resolve call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodUnderCaret {
    pub name: String,
    pub class_name: String,
    pub id: CodeObjectId,
    pub file_path: PathBuf,
}

// ============================================================================
// File Keys
// ============================================================================

/// Stable, path-derived key for per-file state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileKey(String);

impl FileKey {
    /// Derive a key from a path. Separators are normalized to `/`.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self(path.as_ref().to_string_lossy().replace('\\', "/"))
    }

    /// The path this key was derived from.
    pub fn path(&self) -> PathBuf {
        PathBuf::from(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&Path> for FileKey {
    fn from(path: &Path) -> Self {
        Self::from_path(path)
    }
}

// ============================================================================
// Environment
// ============================================================================

/// Runtime/deployment scope telemetry is partitioned by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Environment(String);

impl Environment {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Environment {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Shared holder of the process-wide current environment.
///
/// Readers get a cheap `Arc` clone; the value is replaced as a whole, never
/// mutated in place. Only the environment-change orchestrator writes it.
/// The read lock is held only for the `Arc` clone, never across a rebuild or
/// a backend call.
#[derive(Debug, Clone)]
pub struct EnvironmentHandle {
    current: Arc<RwLock<Arc<Environment>>>,
}

impl EnvironmentHandle {
    pub fn new(initial: Environment) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(initial))),
        }
    }

    /// Snapshot of the current environment.
    pub fn current(&self) -> Arc<Environment> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Replace the current environment, returning the previous one.
    pub(crate) fn swap(&self, next: Environment) -> Arc<Environment> {
        let next = Arc::new(next);
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::replace(&mut *guard, next)
    }
}
