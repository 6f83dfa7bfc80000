//! Error types for synchronization
//!
//! Provides:
//! - [`SyncError`]: why a synchronization run could not start
//! - [`ConfigError`]: configuration loading and validation failures
//!
//! Per-item remote failures never abort a run; they are reported as
//! [`crate::report::FailureReport`]s inside the batch outcome.

use reqsync_document::ValidationResult;
use std::path::PathBuf;

/// Main synchronization error type
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Record has blocking validation errors
    #[error("requirements are not valid: {0}")]
    ValidationFailed(ValidationResult),

    /// Configuration problem
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Batch options cannot be honored
    #[error("invalid batch options: {0}")]
    InvalidOptions(String),
}

impl SyncError {
    /// Caller must fix the document before retrying
    #[inline]
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::ValidationFailed(_))
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        /// Config file path
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// File is not valid TOML for the config schema
    #[error("cannot parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// Value out of range
    #[error("invalid value for {key}: {reason}")]
    Invalid {
        /// Dotted key, e.g. `batch.size`
        key: &'static str,
        /// What is wrong
        reason: String,
    },
}

impl ConfigError {
    /// Create invalid-value error
    #[inline]
    pub fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}
