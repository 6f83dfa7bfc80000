//! Section extractor
//!
//! Single-pass, line-oriented scan of a requirements document into a
//! [`RequirementsRecord`]. The extractor keeps no state between calls and
//! never fails: malformed sections degrade to empty fields.

mod line;
mod state;

pub use line::{classify_line, list_item, match_section, LineKind, MAX_SECTION_LEVEL};
pub use state::{transition, ExtractorState};

use crate::error::ExtractionError;
use crate::identity::diagnose_identifier;
use crate::record::{PrioritySetting, RecordField, RequirementsRecord, SourceRef};
use serde::Serialize;

/// Result of one extraction pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Extraction {
    /// Extracted record
    pub record: RequirementsRecord,
    /// Non-fatal problems, in line order
    pub errors: Vec<ExtractionError>,
}

/// Requirements section extractor
#[derive(Debug, Clone, Copy, Default)]
pub struct SectionExtractor;

impl SectionExtractor {
    /// Create new extractor
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Extract a record from document text
    #[must_use]
    pub fn extract(&self, text: &str, source: SourceRef) -> Extraction {
        let mut builder = RecordBuilder::new(source);
        let mut state = ExtractorState::Outside;
        let mut in_fence = false;

        for (idx, raw) in text.lines().enumerate() {
            let kind = classify_line(raw);

            if in_fence {
                if kind == LineKind::Fence {
                    in_fence = false;
                }
                continue;
            }
            if kind == LineKind::Fence {
                in_fence = true;
                continue;
            }

            if let LineKind::Heading {
                level: 1,
                section: None,
                ref text,
            } = kind
            {
                builder.offer_heading_title(text);
            }

            let next = transition(state, &kind);
            if next != state {
                tracing::trace!(line = idx + 1, from = ?state, to = ?next, "section transition");
                state = next;
            }

            if let (ExtractorState::InsideSection(field), LineKind::Content(content)) = (state, &kind)
            {
                builder.accept(field, content, idx + 1);
            }
        }

        let extraction = builder.finish();
        tracing::debug!(
            source = %extraction.record.source,
            stakeholders = extraction.record.stakeholders.len(),
            functional = extraction.record.functional_requirements.len(),
            errors = extraction.errors.len(),
            "extracted requirements record"
        );
        extraction
    }
}

/// Extract with a default extractor
#[must_use]
pub fn extract(text: &str, source: SourceRef) -> Extraction {
    SectionExtractor::new().extract(text, source)
}

/// Accumulates fields during one pass
struct RecordBuilder {
    record: RequirementsRecord,
    title_lines: Vec<String>,
    summary_lines: Vec<String>,
    heading_title: Option<String>,
    errors: Vec<ExtractionError>,
}

impl RecordBuilder {
    fn new(source: SourceRef) -> Self {
        Self {
            record: RequirementsRecord::new(source),
            title_lines: Vec::new(),
            summary_lines: Vec::new(),
            heading_title: None,
            errors: Vec::new(),
        }
    }

    fn offer_heading_title(&mut self, text: &str) {
        if self.heading_title.is_none() && !text.is_empty() {
            self.heading_title = Some(text.to_string());
        }
    }

    fn accept(&mut self, field: RecordField, content: &str, line_no: usize) {
        match field {
            RecordField::Stakeholders => self.accept_stakeholder(content, line_no),
            RecordField::Title => push_text(&mut self.title_lines, content),
            RecordField::Summary => push_text(&mut self.summary_lines, content),
            RecordField::Priority => {
                if self.record.priority == PrioritySetting::Unset {
                    let value = line::plain_text(content).trim_matches(|c: char| c == '*' || c == '_');
                    self.record.priority = PrioritySetting::parse(value);
                }
            }
            RecordField::BusinessObjectives => push_item(&mut self.record.business_objectives, content),
            RecordField::FunctionalRequirements => {
                push_item(&mut self.record.functional_requirements, content);
            }
            RecordField::AcceptanceCriteria => push_item(&mut self.record.acceptance_criteria, content),
            RecordField::NonFunctionalRequirements => {
                push_item(&mut self.record.non_functional_requirements, content);
            }
        }
    }

    fn accept_stakeholder(&mut self, content: &str, line_no: usize) {
        let Some(rest) = content.strip_prefix('@') else {
            return;
        };
        let candidate = rest.trim();
        if let Some(reason) = diagnose_identifier(candidate) {
            self.errors.push(ExtractionError::InvalidIdentifier {
                line: line_no,
                candidate: candidate.to_string(),
                reason,
            });
        }
        self.record.stakeholders.push(candidate.to_string());
    }

    fn finish(mut self) -> Extraction {
        self.record.title = if self.title_lines.is_empty() {
            self.heading_title.unwrap_or_default()
        } else {
            self.title_lines.join(" ")
        };
        self.record.summary = self.summary_lines.join(" ");
        Extraction {
            record: self.record,
            errors: self.errors,
        }
    }
}

fn push_text(lines: &mut Vec<String>, content: &str) {
    let text = line::plain_text(content);
    if !text.is_empty() {
        lines.push(text.to_string());
    }
}

fn push_item(items: &mut Vec<String>, content: &str) {
    if let Some(item) = list_item(content) {
        if !item.is_empty() {
            items.push(item.to_string());
        }
    }
}
