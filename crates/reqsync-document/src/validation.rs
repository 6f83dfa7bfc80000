//! Requirements validation
//!
//! Business rules over an extracted [`RequirementsRecord`]. Errors block
//! synchronization; warnings are advisory and leave the record valid.
//! Only emptiness is checked for text fields: a short title is fine.

use crate::record::{Priority, PrioritySetting, RecordField, RequirementsRecord};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Blocking validation problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Offending field
    pub field: RecordField,
    /// Human-readable message
    pub message: String,
}

/// Advisory validation problem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationWarning {
    /// Offending field
    pub field: RecordField,
    /// Human-readable message
    pub message: String,
    /// How to fix it, when there is an obvious fix
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

/// Outcome of validating one record
///
/// Recomputed on every call; `is_valid` is true iff `errors` is empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// No blocking errors
    pub is_valid: bool,
    /// Blocking errors, in rule order
    pub errors: Vec<ValidationIssue>,
    /// Advisory warnings, in rule order
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    fn from_parts(errors: Vec<ValidationIssue>, warnings: Vec<ValidationWarning>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// Warnings present (caller should offer proceed-or-fix)
    #[inline]
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid {
            write!(f, "valid")?;
        } else {
            write!(f, "invalid ({} errors)", self.errors.len())?;
        }
        for err in &self.errors {
            write!(f, "\n  error [{}]: {}", err.field, err.message)?;
        }
        for warn in &self.warnings {
            write!(f, "\n  warning [{}]: {}", warn.field, warn.message)?;
            if let Some(suggestion) = &warn.suggestion {
                write!(f, " ({suggestion})")?;
            }
        }
        Ok(())
    }
}

/// Requirements validator
#[derive(Debug, Clone, Copy, Default)]
pub struct RequirementsValidator;

impl RequirementsValidator {
    /// Create validator
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Validate a record
    ///
    /// Pure: the same record always yields the same result.
    #[must_use]
    pub fn validate(&self, record: &RequirementsRecord) -> ValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        if record.title.trim().is_empty() {
            errors.push(issue(RecordField::Title, "Title is required"));
        }
        if record.summary.trim().is_empty() {
            errors.push(issue(RecordField::Summary, "Summary is required"));
        }
        require_entries(&mut errors, RecordField::BusinessObjectives, &record.business_objectives);
        require_entries(
            &mut errors,
            RecordField::FunctionalRequirements,
            &record.functional_requirements,
        );
        require_entries(&mut errors, RecordField::AcceptanceCriteria, &record.acceptance_criteria);

        if record.stakeholders.is_empty() {
            errors.push(issue(
                RecordField::Stakeholders,
                "At least one stakeholder is required",
            ));
        } else {
            let invalid = record.invalid_stakeholders();
            if !invalid.is_empty() {
                let listed = invalid
                    .iter()
                    .map(|s| format!("'@{s}'"))
                    .collect::<Vec<_>>()
                    .join(", ");
                errors.push(issue(
                    RecordField::Stakeholders,
                    format!("Invalid stakeholder identifiers: {listed}"),
                ));
            }
        }

        if let PrioritySetting::Unrecognized(raw) = &record.priority {
            let known = Priority::ALL
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            warnings.push(ValidationWarning {
                field: RecordField::Priority,
                message: format!("Unrecognized priority '{raw}'"),
                suggestion: Some(format!("Use one of: {known}")),
            });
        }

        let duplicates = duplicate_stakeholders(&record.stakeholders);
        if !duplicates.is_empty() {
            let listed = duplicates
                .iter()
                .map(|(name, count)| format!("@{name} (x{count})"))
                .collect::<Vec<_>>()
                .join(", ");
            warnings.push(ValidationWarning {
                field: RecordField::Stakeholders,
                message: format!("Duplicate stakeholders: {listed}"),
                suggestion: Some("Remove repeated mentions from the Stakeholders section".to_string()),
            });
        }

        let result = ValidationResult::from_parts(errors, warnings);
        tracing::debug!(
            source = %record.source,
            valid = result.is_valid,
            errors = result.errors.len(),
            warnings = result.warnings.len(),
            "validated requirements record"
        );
        result
    }
}

/// Validate with a default validator
#[must_use]
pub fn validate(record: &RequirementsRecord) -> ValidationResult {
    RequirementsValidator::new().validate(record)
}

fn issue(field: RecordField, message: impl Into<String>) -> ValidationIssue {
    ValidationIssue {
        field,
        message: message.into(),
    }
}

fn require_entries(errors: &mut Vec<ValidationIssue>, field: RecordField, entries: &[String]) {
    if entries.iter().all(|e| e.trim().is_empty()) {
        errors.push(issue(field, format!("At least one entry in {field} is required")));
    }
}

/// Exact-match duplicates with their counts, in first-appearance order
fn duplicate_stakeholders(stakeholders: &[String]) -> Vec<(&str, usize)> {
    let mut seen: Vec<(&str, usize)> = Vec::new();
    for name in stakeholders {
        match seen.iter_mut().find(|(n, _)| *n == name.as_str()) {
            Some((_, count)) => *count += 1,
            None => seen.push((name.as_str(), 1)),
        }
    }
    seen.retain(|(_, count)| *count > 1);
    seen
}
