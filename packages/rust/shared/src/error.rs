//! Error types for call intake.
//!
//! Library crates use [`IntakeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

use crate::types::{CompletenessResult, StructuredProfile};

/// Top-level error type for all intake operations.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error talking to an external service.
    #[error("network error: {0}")]
    Network(String),

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Concurrent profile writes kept conflicting after every retry.
    ///
    /// Carries what the call extracted and how the last merge attempt
    /// scored, so the caller can retry or keep the result elsewhere.
    #[error("storage conflict for caller {caller}: gave up after {attempts} attempts")]
    StorageConflict {
        caller: String,
        attempts: u32,
        extracted: Box<StructuredProfile>,
        completeness: Box<CompletenessResult>,
    },

    /// Language understanding service error (API, timeout, or response parsing).
    #[error("language model error: {0}")]
    LanguageModel(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (out-of-range stage, invalid value, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Parsing error for names, labels, or payloads.
    #[error("parse error: {message}")]
    Parse { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, IntakeError>;

impl IntakeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
