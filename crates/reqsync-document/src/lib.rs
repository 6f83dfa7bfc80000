//! reqsync Document Layer
//!
//! Turns semi-structured requirements text into a typed record and checks
//! it against business rules.
//!
//! # Pipeline
//!
//! ```text
//! text → SectionExtractor → RequirementsRecord (+ ExtractionError)
//!                                  ↓
//!                       RequirementsValidator → ValidationResult
//! ```
//!
//! # Example
//!
//! ```rust
//! use reqsync_document::{analyze_document, SourceRef};
//!
//! let doc = "# Portal\n## Stakeholders\n@alice\n";
//! let analysis = analyze_document(doc, SourceRef::inline());
//! assert_eq!(analysis.record.stakeholders, vec!["alice"]);
//! assert!(!analysis.validation.is_valid);
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod analysis;
pub mod error;
pub mod extractor;
pub mod identity;
pub mod record;
pub mod validation;

// Re-exports for convenience
pub use analysis::{analyze_document, DocumentAnalysis};
pub use error::{ExtractionError, IdentifierError};
pub use extractor::{extract, Extraction, ExtractorState, SectionExtractor};
pub use identity::{diagnose_identifier, is_valid_identifier, Identifier, MAX_IDENTIFIER_LEN};
pub use record::{Priority, PrioritySetting, RecordField, RequirementsRecord, SourceRef};
pub use validation::{
    validate, RequirementsValidator, ValidationIssue, ValidationResult, ValidationWarning,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for document processing
    pub use crate::{
        analyze_document, is_valid_identifier, DocumentAnalysis, Priority, PrioritySetting,
        RequirementsRecord, RequirementsValidator, SectionExtractor, SourceRef, ValidationResult,
    };
}
