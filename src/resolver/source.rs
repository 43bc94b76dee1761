// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Source-file access.
//!
//! The host owns the files; the engine only needs to read content and learn a
//! file's language tag. [`FsSourceAccess`] reads from disk;
//! [`OverlaySourceAccess`] prefers unsaved editor buffers over disk content.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use sha2::{Digest, Sha256};

use crate::error::ResolutionError;

/// Languages with a built-in resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    TypeScript,
    TypeScriptReact,
    JavaScript,
    Rust,
    Python,
    Go,
    Unknown,
}

impl Language {
    /// Detect language from file extension.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "ts" | "mts" | "cts" => Self::TypeScript,
            "tsx" => Self::TypeScriptReact,
            "js" | "jsx" | "mjs" | "cjs" => Self::JavaScript,
            "rs" => Self::Rust,
            "py" | "pyi" => Self::Python,
            "go" => Self::Go,
            _ => Self::Unknown,
        }
    }

    /// Detect language from a path.
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }

    /// Language tag, matching editor language identifiers.
    pub fn tag(&self) -> Option<&'static str> {
        match self {
            Self::TypeScript => Some("typescript"),
            Self::TypeScriptReact => Some("typescriptreact"),
            Self::JavaScript => Some("javascript"),
            Self::Rust => Some("rust"),
            Self::Python => Some("python"),
            Self::Go => Some("go"),
            Self::Unknown => None,
        }
    }
}

/// A source file read for resolution.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub language: String,
    pub content: String,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, language: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            language: language.into(),
            content: content.into(),
        }
    }

    /// SHA-256 of the content, hex encoded.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.content.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// Host-provided access to source files.
pub trait SourceAccess: Send + Sync {
    /// Read the current content of a file.
    fn read(&self, path: &Path) -> Result<String, ResolutionError>;

    /// Language tag of a file, or `None` when unknown.
    fn language_tag(&self, path: &Path) -> Option<String>;

    /// Read a file together with its language tag.
    ///
    /// Files with an unknown language are `Ok(None)` and are not read.
    fn load(&self, path: &Path) -> Result<Option<SourceFile>, ResolutionError> {
        let Some(language) = self.language_tag(path) else {
            return Ok(None);
        };
        let content = self.read(path)?;
        Ok(Some(SourceFile {
            path: path.to_path_buf(),
            language,
            content,
        }))
    }
}

/// Reads files from disk and detects language by extension.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsSourceAccess;

impl SourceAccess for FsSourceAccess {
    fn read(&self, path: &Path) -> Result<String, ResolutionError> {
        std::fs::read_to_string(path).map_err(|e| ResolutionError::io(path.display().to_string(), e))
    }

    fn language_tag(&self, path: &Path) -> Option<String> {
        Language::from_path(path).tag().map(str::to_string)
    }
}

/// Editor buffers layered over another [`SourceAccess`].
///
/// Buffers hold unsaved content and win over the underlying source.
#[derive(Debug, Default)]
pub struct OverlaySourceAccess<S = FsSourceAccess> {
    inner: S,
    buffers: RwLock<HashMap<PathBuf, String>>,
}

impl OverlaySourceAccess<FsSourceAccess> {
    pub fn new() -> Self {
        Self::over(FsSourceAccess)
    }
}

impl<S: SourceAccess> OverlaySourceAccess<S> {
    pub fn over(inner: S) -> Self {
        Self {
            inner,
            buffers: RwLock::new(HashMap::new()),
        }
    }

    /// Set the buffer content for a path.
    pub fn set_buffer(&self, path: impl Into<PathBuf>, content: impl Into<String>) {
        if let Ok(mut buffers) = self.buffers.write() {
            buffers.insert(path.into(), content.into());
        }
    }

    /// Drop the buffer for a path, falling back to the underlying source.
    pub fn clear_buffer(&self, path: &Path) {
        if let Ok(mut buffers) = self.buffers.write() {
            buffers.remove(path);
        }
    }
}

impl<S: SourceAccess> SourceAccess for OverlaySourceAccess<S> {
    fn read(&self, path: &Path) -> Result<String, ResolutionError> {
        if let Some(content) = self.buffers.read().ok().and_then(|b| b.get(path).cloned()) {
            return Ok(content);
        }
        self.inner.read(path)
    }

    fn language_tag(&self, path: &Path) -> Option<String> {
        self.inner.language_tag(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_language_from_extension() {
        assert_eq!(Language::from_extension("ts"), Language::TypeScript);
        assert_eq!(Language::from_extension("tsx"), Language::TypeScriptReact);
        assert_eq!(Language::from_extension("RS"), Language::Rust);
        assert_eq!(Language::from_extension("py"), Language::Python);
        assert_eq!(Language::from_extension("go"), Language::Go);
        assert_eq!(Language::from_extension("txt"), Language::Unknown);
        assert_eq!(Language::Unknown.tag(), None);
    }

    #[test]
    fn test_fs_source_access_load() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("svc.py");
        std::fs::write(&path, "def run():\n    pass\n").unwrap();

        let file = FsSourceAccess.load(&path).unwrap().unwrap();
        assert_eq!(file.language, "python");
        assert!(file.content.contains("def run"));

        let unknown = temp.path().join("notes.txt");
        std::fs::write(&unknown, "hello").unwrap();
        assert!(FsSourceAccess.load(&unknown).unwrap().is_none());
    }

    #[test]
    fn test_fs_source_access_missing_file() {
        let temp = tempdir().unwrap();
        let err = FsSourceAccess.load(&temp.path().join("gone.rs")).unwrap_err();
        assert!(matches!(err, ResolutionError::Io { .. }));
    }

    #[test]
    fn test_overlay_prefers_buffer() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("app.go");
        std::fs::write(&path, "package app\n").unwrap();

        let overlay = OverlaySourceAccess::new();
        overlay.set_buffer(&path, "package app\nfunc Run() {}\n");
        assert!(overlay.read(&path).unwrap().contains("func Run"));

        overlay.clear_buffer(&path);
        assert_eq!(overlay.read(&path).unwrap(), "package app\n");
    }

    #[test]
    fn test_content_hash() {
        let a = SourceFile::new("a.py", "python", "x = 1");
        let b = SourceFile::new("b.py", "python", "x = 1");
        let c = SourceFile::new("a.py", "python", "x = 2");
        assert_eq!(a.content_hash(), b.content_hash());
        assert_ne!(a.content_hash(), c.content_hash());
    }
}
