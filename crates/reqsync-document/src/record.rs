//! Requirements record model
//!
//! A [`RequirementsRecord`] is the typed result of one extraction pass. It is
//! never patched in place: a new parse of the same source replaces it.

use crate::identity::{is_valid_identifier, Identifier};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Logical record field, also used to name document sections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordField {
    /// Document title
    Title,
    /// Free-text summary
    Summary,
    /// Business objectives list
    BusinessObjectives,
    /// Functional requirements list
    FunctionalRequirements,
    /// Acceptance criteria list
    AcceptanceCriteria,
    /// Non-functional requirements list
    NonFunctionalRequirements,
    /// Stakeholder mentions
    Stakeholders,
    /// Priority level
    Priority,
}

impl RecordField {
    /// Human-readable field name
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Summary => "summary",
            Self::BusinessObjectives => "business objectives",
            Self::FunctionalRequirements => "functional requirements",
            Self::AcceptanceCriteria => "acceptance criteria",
            Self::NonFunctionalRequirements => "non-functional requirements",
            Self::Stakeholders => "stakeholders",
            Self::Priority => "priority",
        }
    }
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Priority level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Nice to have
    Low,
    /// Default
    Medium,
    /// Important
    High,
    /// Blocking
    Critical,
}

impl Priority {
    /// All levels, lowest first
    pub const ALL: [Priority; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    /// Lowercase name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        };
        f.write_str(name)
    }
}

/// Priority as written in the document
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "snake_case")]
pub enum PrioritySetting {
    /// No priority section or empty section
    #[default]
    Unset,
    /// One of the known levels
    Recognized(Priority),
    /// Present but not a known level (kept verbatim)
    Unrecognized(String),
}

impl PrioritySetting {
    /// Parse a raw priority value; the first word decides the level
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return Self::Unset;
        }
        let first_word = raw
            .split(|c: char| c.is_whitespace() || c == ',' || c == '-' || c == ':')
            .find(|w| !w.is_empty())
            .unwrap_or(raw);
        match first_word.parse::<Priority>() {
            Ok(p) => Self::Recognized(p),
            Err(_) => Self::Unrecognized(raw.to_string()),
        }
    }

    /// Known level, if any
    #[inline]
    #[must_use]
    pub fn level(&self) -> Option<Priority> {
        match self {
            Self::Recognized(p) => Some(*p),
            _ => None,
        }
    }
}

/// Opaque handle to where a record came from
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRef(String);

impl SourceRef {
    /// Create source reference (path, URI, buffer name...)
    #[inline]
    #[must_use]
    pub fn new(origin: impl Into<String>) -> Self {
        Self(origin.into())
    }

    /// Reference for text with no backing file
    #[inline]
    #[must_use]
    pub fn inline() -> Self {
        Self("<inline>".to_string())
    }

    /// Origin text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SourceRef {
    fn default() -> Self {
        Self::inline()
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parsed requirements document
///
/// Stakeholders keep every mention in document order, including invalid
/// and duplicate ones, so the validator can report on them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RequirementsRecord {
    /// Document title
    pub title: String,
    /// Free-text summary
    pub summary: String,
    /// Business objectives, in document order
    pub business_objectives: Vec<String>,
    /// Functional requirements, in document order
    pub functional_requirements: Vec<String>,
    /// Acceptance criteria, in document order
    pub acceptance_criteria: Vec<String>,
    /// Non-functional requirements, in document order
    pub non_functional_requirements: Vec<String>,
    /// Stakeholder mentions (text after `@`)
    pub stakeholders: Vec<String>,
    /// Priority as written
    pub priority: PrioritySetting,
    /// Where the record came from
    pub source: SourceRef,
}

impl RequirementsRecord {
    /// Create empty record for a source
    #[inline]
    #[must_use]
    pub fn new(source: SourceRef) -> Self {
        Self {
            source,
            ..Self::default()
        }
    }

    /// With title
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// With summary
    #[must_use]
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    /// With business objectives
    #[must_use]
    pub fn with_objectives<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.business_objectives = items.into_iter().map(Into::into).collect();
        self
    }

    /// With functional requirements
    #[must_use]
    pub fn with_functional_requirements<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.functional_requirements = items.into_iter().map(Into::into).collect();
        self
    }

    /// With acceptance criteria
    #[must_use]
    pub fn with_acceptance_criteria<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.acceptance_criteria = items.into_iter().map(Into::into).collect();
        self
    }

    /// With non-functional requirements
    #[must_use]
    pub fn with_non_functional_requirements<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.non_functional_requirements = items.into_iter().map(Into::into).collect();
        self
    }

    /// With stakeholder mentions
    #[must_use]
    pub fn with_stakeholders<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stakeholders = items.into_iter().map(Into::into).collect();
        self
    }

    /// With priority
    #[must_use]
    pub fn with_priority(mut self, priority: PrioritySetting) -> Self {
        self.priority = priority;
        self
    }

    /// Stakeholders that pass the identifier grammar, in document order
    #[must_use]
    pub fn valid_stakeholders(&self) -> Vec<Identifier> {
        self.stakeholders
            .iter()
            .filter_map(|s| Identifier::parse(s).ok())
            .collect()
    }

    /// Stakeholders that fail the identifier grammar, in document order
    #[must_use]
    pub fn invalid_stakeholders(&self) -> Vec<&str> {
        self.stakeholders
            .iter()
            .map(String::as_str)
            .filter(|s| !is_valid_identifier(s))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_setting_parses_first_word() {
        assert_eq!(
            PrioritySetting::parse("High - must ship in Q3"),
            PrioritySetting::Recognized(Priority::High)
        );
        assert_eq!(
            PrioritySetting::parse("CRITICAL"),
            PrioritySetting::Recognized(Priority::Critical)
        );
        assert_eq!(PrioritySetting::parse("   "), PrioritySetting::Unset);
        assert_eq!(
            PrioritySetting::parse("urgent"),
            PrioritySetting::Unrecognized("urgent".to_string())
        );
    }

    #[test]
    fn stakeholder_partition() {
        let record = RequirementsRecord::default().with_stakeholders(["alice", "bad--id", "bob"]);
        let valid: Vec<String> = record
            .valid_stakeholders()
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(valid, vec!["alice", "bob"]);
        assert_eq!(record.invalid_stakeholders(), vec!["bad--id"]);
    }

    #[test]
    fn priority_ordering() {
        assert!(Priority::Critical > Priority::High);
        assert!(Priority::Low < Priority::Medium);
        assert_eq!(Priority::High.to_string(), "High");
    }

    #[test]
    fn default_source_is_inline() {
        let record = RequirementsRecord::default();
        assert_eq!(record.source.as_str(), "<inline>");
    }
}
