// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Error types for the correlation engine.
//!
//! This module provides strongly-typed errors for different parts of the engine,
//! using `thiserror` for ergonomic error definitions and `anyhow` for error propagation.
//!
//! Only [`ConfigError`] is ever fatal to a caller. Resolution and backend errors
//! are recovered locally and degrade to empty results.

use thiserror::Error;

/// Errors that can occur while resolving methods in a source file.
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("IO error reading {path}: {message}")]
    Io { path: String, message: String },

    #[error("Parse error in {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Invalid code object id: {0}")]
    InvalidCodeObjectId(String),

    #[error("Resolver failed: {0}")]
    Internal(String),
}

impl ResolutionError {
    /// Create an IO error for a path.
    pub fn io(path: impl Into<String>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }

    /// Create a parse error for a path.
    pub fn parse(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Errors raised at the analytics backend boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Backend rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),
}

impl BackendError {
    /// Create a rejection error with status code.
    pub fn rejected(status: u16, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }

    /// Check if this error is retryable.
    ///
    /// Only transient unavailability is retried; a rejection or a malformed
    /// response will fail the same way on the next attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Errors that can occur during configuration loading or validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("IO error reading config: {0}")]
    IoError(String),

    #[error("YAML parsing error: {0}")]
    YamlError(String),

    #[error("JSON parsing error: {0}")]
    JsonError(String),
}

impl ConfigError {
    /// Create an invalid value error.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            _ => Self::IoError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError(err.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::YamlError(err.to_string())
    }
}

/// Outcome of a failed [`crate::retry::RetryExecutor::run`] call.
#[derive(Error, Debug)]
pub enum RetryError<E> {
    /// The retry parameters were invalid; the operation never ran.
    #[error("Invalid retry configuration: {0}")]
    Configuration(#[from] ConfigError),

    /// Every attempt failed with a retryable error; holds the last one.
    #[error("Operation failed after {attempts} attempts: {source}")]
    Exhausted { attempts: u32, source: E },

    /// The operation failed with an error that is not retryable.
    #[error("Operation failed with non-retryable error: {0}")]
    Aborted(E),
}

impl<E> RetryError<E> {
    /// Get the operation error, if the operation ran at all.
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Configuration(_) => None,
            Self::Exhausted { source, .. } => Some(source),
            Self::Aborted(err) => Some(err),
        }
    }

    /// Check if this is a configuration error.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

/// Result type alias using anyhow for flexible error handling.
pub type Result<T> = anyhow::Result<T>;
