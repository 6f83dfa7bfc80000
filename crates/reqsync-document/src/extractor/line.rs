//! Line classification
//!
//! Turns one raw line into a [`LineKind`] the state machine can act on.
//! Classification is context-free; fence tracking happens in the scanner.

use crate::record::RecordField;
use once_cell::sync::Lazy;
use regex::Regex;

/// Deepest heading level that may open a section
pub const MAX_SECTION_LEVEL: u8 = 3;

static HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^ {0,3}(#{1,6})(?:[ \t]+(.*?))?[ \t]*$").expect("heading pattern is a valid regex")
});

// Decorative glyphs (emoji, bullets, symbols) in front of the heading text.
static GLYPH_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\p{L}\p{N}\s]+\s*").expect("glyph pattern is a valid regex")
});

static LIST_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:[-*+]|\d{1,3}[.)])\s+(?:\[[ xX]\]\s*)?(.*)$")
        .expect("list pattern is a valid regex")
});

static CHECKBOX_ONLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\[[ xX]\]\s+(.*)$").expect("checkbox pattern is a valid regex"));

/// Known section names, matched as a leading whole word in table order
///
/// `non-functional` spellings come before `functional` so the longer name wins.
const SECTION_ALIASES: &[(&str, RecordField)] = &[
    ("project title", RecordField::Title),
    ("project name", RecordField::Title),
    ("title", RecordField::Title),
    ("executive summary", RecordField::Summary),
    ("project summary", RecordField::Summary),
    ("summary", RecordField::Summary),
    ("overview", RecordField::Summary),
    ("business objectives", RecordField::BusinessObjectives),
    ("objectives", RecordField::BusinessObjectives),
    ("goals", RecordField::BusinessObjectives),
    ("non-functional requirements", RecordField::NonFunctionalRequirements),
    ("non functional requirements", RecordField::NonFunctionalRequirements),
    ("nonfunctional requirements", RecordField::NonFunctionalRequirements),
    ("functional requirements", RecordField::FunctionalRequirements),
    ("acceptance criteria", RecordField::AcceptanceCriteria),
    ("key stakeholders", RecordField::Stakeholders),
    ("key stakeholder", RecordField::Stakeholders),
    ("stakeholders", RecordField::Stakeholders),
    ("stakeholder", RecordField::Stakeholders),
    ("priority", RecordField::Priority),
];

/// Classified line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// ATX heading of any level
    Heading {
        /// Number of `#` markers (1-6)
        level: u8,
        /// Recognized section, only for levels 1-3
        section: Option<RecordField>,
        /// Heading text with glyph and trailing markers removed
        text: String,
    },
    /// Opening or closing code fence
    Fence,
    /// Whitespace only
    Blank,
    /// Anything else (trimmed)
    Content(&'a str),
}

/// Classify a single line
#[must_use]
pub fn classify_line(line: &str) -> LineKind<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return LineKind::Blank;
    }
    if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
        return LineKind::Fence;
    }

    if let Some(caps) = HEADING.captures(line) {
        let level = u8::try_from(caps[1].len()).unwrap_or(6);
        let text = caps
            .get(2)
            .map(|m| clean_heading_text(m.as_str()))
            .unwrap_or_default();
        let section = if level <= MAX_SECTION_LEVEL {
            match_section(&text)
        } else {
            None
        };
        return LineKind::Heading {
            level,
            section,
            text,
        };
    }

    LineKind::Content(trimmed)
}

/// Strip glyph prefix, closing `#`s, emphasis and trailing colon
fn clean_heading_text(raw: &str) -> String {
    let without_closing = raw.trim_end_matches('#').trim();
    let without_glyph = GLYPH_PREFIX.replace(without_closing, "");
    without_glyph
        .trim_matches(|c: char| c == '*' || c == '_')
        .trim_end_matches(':')
        .trim()
        .to_string()
}

/// Look up a heading text in the section vocabulary (case-insensitive)
#[must_use]
pub fn match_section(text: &str) -> Option<RecordField> {
    let normalized = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    SECTION_ALIASES
        .iter()
        .find(|(alias, _)| {
            normalized
                .strip_prefix(alias)
                .is_some_and(|rest| !rest.starts_with(char::is_alphanumeric))
        })
        .map(|(_, field)| *field)
}

/// Extract the entry text from a bullet, numbered or checkbox line
#[must_use]
pub fn list_item(line: &str) -> Option<&str> {
    LIST_MARKER
        .captures(line)
        .or_else(|| CHECKBOX_ONLY.captures(line))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

/// Free text with any list marker removed
#[must_use]
pub fn plain_text(line: &str) -> &str {
    list_item(line).unwrap_or_else(|| line.trim())
}
