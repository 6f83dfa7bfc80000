//! Error types for document processing
//!
//! Extraction never fails as a whole; malformed input degrades to empty
//! fields plus per-line [`ExtractionError`]s that the caller can display.

use serde::Serialize;

/// Reason a candidate identifier was rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum IdentifierError {
    /// Nothing after the mention marker
    #[error("identifier is empty")]
    Empty,

    /// Longer than 39 characters
    #[error("identifier is {len} characters long (max 39)")]
    TooLong {
        /// Actual length in characters
        len: usize,
    },

    /// Character outside `[A-Za-z0-9-]`
    #[error("identifier contains invalid character '{0}'")]
    InvalidCharacter(char),

    /// Starts or ends with a hyphen
    #[error("identifier cannot start or end with a hyphen")]
    EdgeHyphen,

    /// Contains `--`
    #[error("identifier cannot contain consecutive hyphens")]
    ConsecutiveHyphens,
}

/// Non-fatal problem found while extracting a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionError {
    /// A stakeholder mention failed the identifier grammar
    #[error("line {line}: invalid stakeholder '@{candidate}': {reason}")]
    InvalidIdentifier {
        /// 1-based line number in the source text
        line: usize,
        /// Text after the `@` marker
        candidate: String,
        /// Grammar rule that failed
        reason: IdentifierError,
    },
}

impl ExtractionError {
    /// Line the error was found on (1-based)
    #[inline]
    #[must_use]
    pub fn line(&self) -> usize {
        match self {
            Self::InvalidIdentifier { line, .. } => *line,
        }
    }
}
