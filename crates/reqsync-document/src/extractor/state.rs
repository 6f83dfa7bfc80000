//! Extractor state machine
//!
//! Two states and one transition function. Every heading closes the current
//! section; a recognized level 1-3 heading opens its own section instead.

use super::line::LineKind;
use crate::record::RecordField;

/// Where the scanner currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtractorState {
    /// Not inside any recognized section
    #[default]
    Outside,
    /// Inside a recognized section
    InsideSection(RecordField),
}

impl ExtractorState {
    /// Section currently open, if any
    #[inline]
    #[must_use]
    pub fn section(self) -> Option<RecordField> {
        match self {
            Self::Outside => None,
            Self::InsideSection(field) => Some(field),
        }
    }
}

/// Transition table
///
/// | current          | line                          | next                 |
/// |------------------|-------------------------------|----------------------|
/// | any              | heading, recognized section s | `InsideSection(s)`   |
/// | any              | heading, unrecognized/level>3 | `Outside`            |
/// | s                | blank / fence / content       | s                    |
#[must_use]
pub fn transition(current: ExtractorState, line: &LineKind<'_>) -> ExtractorState {
    match line {
        LineKind::Heading {
            section: Some(field),
            ..
        } => ExtractorState::InsideSection(*field),
        LineKind::Heading { section: None, .. } => ExtractorState::Outside,
        LineKind::Blank | LineKind::Fence | LineKind::Content(_) => current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heading(level: u8, section: Option<RecordField>) -> LineKind<'static> {
        LineKind::Heading {
            level,
            section,
            text: String::new(),
        }
    }

    #[test]
    fn outside_to_inside_on_recognized_heading() {
        let next = transition(
            ExtractorState::Outside,
            &heading(2, Some(RecordField::Stakeholders)),
        );
        assert_eq!(next, ExtractorState::InsideSection(RecordField::Stakeholders));
    }

    #[test]
    fn inside_to_other_section() {
        let next = transition(
            ExtractorState::InsideSection(RecordField::Summary),
            &heading(2, Some(RecordField::Priority)),
        );
        assert_eq!(next, ExtractorState::InsideSection(RecordField::Priority));
    }

    #[test]
    fn unrecognized_heading_closes_section() {
        let next = transition(
            ExtractorState::InsideSection(RecordField::Stakeholders),
            &heading(2, None),
        );
        assert_eq!(next, ExtractorState::Outside);
    }

    #[test]
    fn deep_heading_closes_section() {
        // Level-4+ headings are classified without a section.
        let next = transition(
            ExtractorState::InsideSection(RecordField::AcceptanceCriteria),
            &heading(4, None),
        );
        assert_eq!(next, ExtractorState::Outside);
    }

    #[test]
    fn content_keeps_state() {
        let state = ExtractorState::InsideSection(RecordField::FunctionalRequirements);
        assert_eq!(transition(state, &LineKind::Content("- item")), state);
        assert_eq!(transition(state, &LineKind::Blank), state);
        assert_eq!(transition(ExtractorState::Outside, &LineKind::Fence), ExtractorState::Outside);
    }
}
