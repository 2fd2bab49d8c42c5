//! Shared error types for split operations.

use std::path::PathBuf;
use thiserror::Error;

use crate::scoring::provider::ProviderError;

/// Main error type for split operations.
///
/// Only `Config` is allowed to escape [`crate::splitter::Splitter::split`];
/// every other variant is folded into the returned
/// [`crate::core::SplitResult`] so callers get a uniform outcome object.
#[derive(Debug, Error)]
pub enum SplitError {
    /// Source text does not parse
    #[error("parse error at {line}:{column}: {message}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },

    /// Caller-supplied configuration is self-contradictory
    #[error("configuration error: {0}")]
    Config(String),

    /// Candidate generation produced nothing to select from
    #[error("no viable split candidate: {0}")]
    NoViableCandidate(String),

    /// Language cannot be determined or is not supported
    #[error("unsupported language for {path}")]
    UnsupportedLanguage { path: PathBuf },

    /// A required backup could not be created
    #[error("backup failed for {path}: {message}")]
    Backup { path: PathBuf, message: String },

    /// A component file could not be written
    #[error("write failed for {path}: {message}")]
    Write { path: PathBuf, message: String },

    /// A written component failed the post-write syntax check
    #[error("validation failed for {path}: {message}")]
    Validation { path: PathBuf, message: String },

    /// The caller-supplied deadline expired mid-operation
    #[error("operation deadline exceeded")]
    DeadlineExceeded,

    /// AI completion failure; never fatal, always degraded to heuristics
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// IO errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SplitError {
    /// Create a parse error with location
    pub fn parse(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            column,
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a backup error with path context
    pub fn backup(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Backup {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a write error with path context
    pub fn write(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Write {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a validation error with path context
    pub fn validation(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Validation {
            path: path.into(),
            message: message.into(),
        }
    }

    /// The pipeline stage this error is attributed to, used when folding
    /// failures into a result's error message.
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Parse { .. } | Self::UnsupportedLanguage { .. } => "analysis",
            Self::Config(_) => "configuration",
            Self::NoViableCandidate(_) => "selection",
            Self::Backup { .. } => "backup",
            Self::Write { .. } => "write",
            Self::Validation { .. } => "validation",
            Self::DeadlineExceeded => "deadline",
            Self::Provider(_) => "scoring",
            Self::Io(_) | Self::Json(_) => "io",
        }
    }
}

/// Result type alias using our error type
pub type Result<T> = std::result::Result<T, SplitError>;
