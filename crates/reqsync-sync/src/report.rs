//! Failure reports
//!
//! Every terminal failure shown to a person carries a cause category, an
//! actionable suggestion, and the operation and item it concerns.

use crate::error::{ConfigError, SyncError};
use reqsync_resilience::{CircuitError, RemoteError, RetryError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cause category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    /// Transient failure that outlasted the retry budget
    Transient,
    /// Credentials rejected or expired
    Authentication,
    /// The service refused this specific request
    Rejected,
    /// Circuit open; the call was not attempted
    ServiceUnavailable,
    /// Requirements failed validation
    Validation,
    /// Bad configuration
    Configuration,
}

impl FailureCategory {
    /// Display name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transient => "transient",
            Self::Authentication => "authentication",
            Self::Rejected => "rejected",
            Self::ServiceUnavailable => "service unavailable",
            Self::Validation => "validation",
            Self::Configuration => "configuration",
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Human-readable terminal failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
    /// Cause category
    pub category: FailureCategory,
    /// What went wrong
    pub cause: String,
    /// What to do about it
    pub suggestion: String,
    /// Operation that failed
    pub operation: String,
    /// Item the operation concerned
    pub item: String,
}

impl FailureReport {
    /// Create report
    pub fn new(
        category: FailureCategory,
        cause: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            category,
            cause: cause.into(),
            suggestion: suggestion.into(),
            operation: String::new(),
            item: String::new(),
        }
    }

    /// With operation name
    #[inline]
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = operation.into();
        self
    }

    /// With item identifier
    #[inline]
    #[must_use]
    pub fn with_item(mut self, item: impl Into<String>) -> Self {
        self.item = item.into();
        self
    }

    /// Report for a guarded, retried remote call
    #[must_use]
    pub fn from_remote_call(error: &CircuitError<RetryError<RemoteError>>) -> Self {
        match error {
            CircuitError::Open {
                operation,
                retry_after,
            } => Self::new(
                FailureCategory::ServiceUnavailable,
                format!("circuit '{operation}' is open"),
                format!(
                    "The service is failing repeatedly; wait {}s and run synchronization again",
                    retry_after.as_secs().max(1)
                ),
            ),
            CircuitError::Inner(RetryError::Exhausted { attempts, last }) => Self::new(
                FailureCategory::Transient,
                format!("{last} (after {attempts} attempts)"),
                "Retry later, or raise retry.max_retries / lower rate_limit.requests_per_second",
            ),
            CircuitError::Inner(RetryError::Permanent(err)) => Self::from_permanent(err),
        }
    }

    fn from_permanent(err: &RemoteError) -> Self {
        match err.status() {
            _ if err.requires_reauthentication() => Self::new(
                FailureCategory::Authentication,
                err.to_string(),
                "Check the client credentials; the token was rejected even after a refresh",
            ),
            Some(403) => Self::new(
                FailureCategory::Authentication,
                err.to_string(),
                "Grant the client permission to create tasks in the target project",
            ),
            _ => Self::new(
                FailureCategory::Rejected,
                err.to_string(),
                "Fix the task content (title, description, checklist) and retry this item",
            ),
        }
    }

    /// Report for a run that could not start
    #[must_use]
    pub fn from_sync_error(error: &SyncError) -> Self {
        match error {
            SyncError::ValidationFailed(result) => Self::new(
                FailureCategory::Validation,
                format!("{} blocking validation errors", result.errors.len()),
                "Fix the listed errors in the requirements document; warnings may be left as is",
            )
            .with_operation("validate"),
            SyncError::Config(err) => Self::from_config_error(err),
            SyncError::InvalidOptions(reason) => Self::new(
                FailureCategory::Configuration,
                reason.clone(),
                "Use a batch size of at least 1",
            )
            .with_operation("synchronize"),
        }
    }

    /// Report for a configuration failure
    #[must_use]
    pub fn from_config_error(error: &ConfigError) -> Self {
        let item = match error {
            ConfigError::Io { path, .. } => path.display().to_string(),
            ConfigError::Invalid { key, .. } => (*key).to_string(),
            ConfigError::Parse(_) => String::new(),
        };
        Self::new(
            FailureCategory::Configuration,
            error.to_string(),
            "Correct the configuration file or remove the key to use its default",
        )
        .with_operation("load configuration")
        .with_item(item)
    }
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} failed for '{}': {}. Suggestion: {}",
            self.category, self.operation, self.item, self.cause, self.suggestion
        )
    }
}
