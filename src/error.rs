//! Error types and handling infrastructure for rebatch.
//!
//! This module provides a centralized error handling system using `thiserror` for
//! custom error types; the binary wraps these with `anyhow` for context.
//!
//! Two failure classes deliberately do NOT live here: a record-ceiling breach is
//! reported as a distinct early-stop event (not an error) so callers can offer a
//! specific remediation, and stale responses to superseded requests are dropped
//! silently by the request fence.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for rebatch operations.
#[derive(Error, Debug)]
pub enum RebatchError {
    /// File system related errors (file not found, permission denied, etc.)
    #[error("File operation failed: {message}")]
    FileError {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// File not found specifically (common case for user feedback)
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// The record parser collaborator rejected a slice; fatal for the whole run.
    #[error("Record parsing failed: {message}")]
    ParseError { message: String },

    /// A transform rule could not be applied (bad pattern, bad replacement).
    #[error("Rule '{rule}' failed: {message}")]
    RuleError { rule: String, message: String },

    /// A rule's replacement referenced a template the registry does not know.
    #[error("Unknown template: {name}")]
    UnknownTemplate { name: String },

    /// A background worker channel closed unexpectedly.
    #[error("Worker unavailable: {message}")]
    WorkerError { message: String },

    /// Invalid command line arguments
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },
}

/// Standard Result type for rebatch operations.
pub type Result<T> = std::result::Result<T, RebatchError>;

impl RebatchError {
    /// Create a FileError from an io::Error with additional context
    pub fn file_error(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::FileError {
            message: message.into(),
            source,
        }
    }

    /// Create a ParseError with a descriptive message
    pub fn parse(message: impl Into<String>) -> Self {
        Self::ParseError {
            message: message.into(),
        }
    }

    /// Create a RuleError naming the offending rule
    pub fn rule(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RuleError {
            rule: rule.into(),
            message: message.into(),
        }
    }

    /// Create a WorkerError with a descriptive message
    pub fn worker(message: impl Into<String>) -> Self {
        Self::WorkerError {
            message: message.into(),
        }
    }

    /// Create an InvalidArgument error with a descriptive message
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }
}

// Automatic conversion from io::Error to RebatchError
impl From<std::io::Error> for RebatchError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::FileError {
                message: "File not found".to_string(),
                source: err,
            },
            std::io::ErrorKind::PermissionDenied => Self::FileError {
                message: "Permission denied".to_string(),
                source: err,
            },
            _ => Self::FileError {
                message: "IO operation failed".to_string(),
                source: err,
            },
        }
    }
}
