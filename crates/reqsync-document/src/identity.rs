//! Stakeholder identifier grammar
//!
//! Identifiers name a person or account: 1-39 ASCII alphanumerics with
//! single interior hyphens. The grammar check is a pure predicate so the
//! extractor and validator can share it without holding parser state.

use crate::error::IdentifierError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum identifier length in characters
pub const MAX_IDENTIFIER_LEN: usize = 39;

static IDENTIFIER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]{0,37}[A-Za-z0-9])?$")
        .expect("identifier pattern is a valid regex")
});

/// Check a candidate against the identifier grammar
///
/// The regex bounds length and edge characters; consecutive hyphens are
/// rejected separately because the pattern has no lookahead.
#[must_use]
pub fn is_valid_identifier(candidate: &str) -> bool {
    let len = candidate.len();
    (1..=MAX_IDENTIFIER_LEN).contains(&len)
        && IDENTIFIER_PATTERN.is_match(candidate)
        && !candidate.contains("--")
}

/// Explain why a candidate is not a valid identifier
///
/// Returns `None` exactly when [`is_valid_identifier`] returns `true`.
#[must_use]
pub fn diagnose_identifier(candidate: &str) -> Option<IdentifierError> {
    if candidate.is_empty() {
        return Some(IdentifierError::Empty);
    }

    let len = candidate.chars().count();
    if len > MAX_IDENTIFIER_LEN {
        return Some(IdentifierError::TooLong { len });
    }

    if let Some(ch) = candidate
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-'))
    {
        return Some(IdentifierError::InvalidCharacter(ch));
    }

    if candidate.starts_with('-') || candidate.ends_with('-') {
        return Some(IdentifierError::EdgeHyphen);
    }

    if candidate.contains("--") {
        return Some(IdentifierError::ConsecutiveHyphens);
    }

    None
}

/// Validated stakeholder identifier
///
/// Immutable once constructed; the only way in is through the grammar check.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identifier(String);

impl Identifier {
    /// Parse and validate an identifier
    ///
    /// # Errors
    /// Returns the first grammar rule the candidate violates.
    pub fn parse(candidate: &str) -> Result<Self, IdentifierError> {
        match diagnose_identifier(candidate) {
            None => Ok(Self(candidate.to_string())),
            Some(err) => Err(err),
        }
    }

    /// Borrow the identifier text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Identifier {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Identifier {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.0
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}
