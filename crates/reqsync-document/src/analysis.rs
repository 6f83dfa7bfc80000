//! One-call document analysis
//!
//! Runs extraction and validation together for callers that present both
//! to a user (editor diagnostics, CLI output).

use crate::error::ExtractionError;
use crate::extractor::SectionExtractor;
use crate::record::{RequirementsRecord, SourceRef};
use crate::validation::{RequirementsValidator, ValidationResult};
use serde::Serialize;

/// Extraction plus validation of one document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentAnalysis {
    /// Extracted record
    pub record: RequirementsRecord,
    /// Line-level extraction problems
    pub extraction_errors: Vec<ExtractionError>,
    /// Business-rule validation
    pub validation: ValidationResult,
}

impl DocumentAnalysis {
    /// Record may be handed to synchronization
    ///
    /// Extraction errors are not checked separately: every invalid mention
    /// also surfaces as a validation error.
    #[inline]
    #[must_use]
    pub fn is_submittable(&self) -> bool {
        self.validation.is_valid
    }
}

/// Extract and validate a document
#[must_use]
pub fn analyze_document(text: &str, source: SourceRef) -> DocumentAnalysis {
    let extraction = SectionExtractor::new().extract(text, source);
    let validation = RequirementsValidator::new().validate(&extraction.record);
    DocumentAnalysis {
        record: extraction.record,
        extraction_errors: extraction.errors,
        validation,
    }
}
