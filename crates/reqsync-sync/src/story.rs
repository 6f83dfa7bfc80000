//! Synchronization planning
//!
//! One [`UserStory`] per functional requirement, in document order.

use reqsync_document::{Priority, RequirementsRecord};
use serde::{Deserialize, Serialize};

/// Longest story title, ellipsis included
pub const MAX_TITLE_CHARS: usize = 120;

const MIN_EFFORT_HOURS: u32 = 1;
const MAX_EFFORT_HOURS: u32 = 40;
const WORDS_PER_HOUR: usize = 25;

/// Unit of work handed to the synchronizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStory {
    /// Short title
    pub title: String,
    /// Full requirement plus context
    pub description: String,
    /// Acceptance criteria, in document order
    pub acceptance_criteria: Vec<String>,
    /// Priority (Medium when the document has none)
    pub priority: Priority,
    /// Estimated effort in hours
    pub estimated_hours: u32,
    /// Tracker labels
    pub labels: Vec<String>,
}

/// Plan one story per functional requirement
#[must_use]
pub fn plan_user_stories(record: &RequirementsRecord) -> Vec<UserStory> {
    let priority = record.priority.level().unwrap_or(Priority::Medium);
    let mut labels = vec!["requirements".to_string(), format!("priority:{}", priority.as_str())];
    if !record.non_functional_requirements.is_empty() {
        labels.push("nfr-linked".to_string());
    }

    let stories: Vec<UserStory> = record
        .functional_requirements
        .iter()
        .map(|requirement| {
            let description = describe(requirement, &record.summary);
            UserStory {
                title: truncate_title(requirement),
                estimated_hours: estimate_effort(record.acceptance_criteria.len(), &description),
                description,
                acceptance_criteria: record.acceptance_criteria.clone(),
                priority,
                labels: labels.clone(),
            }
        })
        .collect();

    tracing::debug!(source = %record.source, stories = stories.len(), "planned user stories");
    stories
}

fn describe(requirement: &str, summary: &str) -> String {
    let summary = summary.trim();
    if summary.is_empty() {
        requirement.to_string()
    } else {
        format!("{requirement}\n\nContext: {summary}")
    }
}

/// Truncate to [`MAX_TITLE_CHARS`] characters with a trailing `...`
#[must_use]
pub fn truncate_title(text: &str) -> String {
    if text.chars().count() <= MAX_TITLE_CHARS {
        return text.to_string();
    }
    let kept: String = text.chars().take(MAX_TITLE_CHARS - 3).collect();
    format!("{}...", kept.trim_end())
}

/// Hours: `2 + 2 * criteria + ceil(words / 25)`, clamped to 1..=40
#[must_use]
pub fn estimate_effort(criteria: usize, description: &str) -> u32 {
    let words = description.split_whitespace().count();
    let hours = 2usize
        .saturating_add(criteria.saturating_mul(2))
        .saturating_add(words.div_ceil(WORDS_PER_HOUR));
    u32::try_from(hours)
        .unwrap_or(MAX_EFFORT_HOURS)
        .clamp(MIN_EFFORT_HOURS, MAX_EFFORT_HOURS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use reqsync_document::PrioritySetting;

    fn record() -> RequirementsRecord {
        RequirementsRecord::default()
            .with_summary("Self-service portal")
            .with_functional_requirements(["Customers can log in", "Customers can export invoices"])
            .with_acceptance_criteria(["Login under 2s", "Export as PDF"])
            .with_priority(PrioritySetting::Recognized(Priority::High))
    }

    #[test]
    fn one_story_per_functional_requirement() {
        let stories = plan_user_stories(&record());
        assert_eq!(stories.len(), 2);
        assert_eq!(stories[0].title, "Customers can log in");
        assert_eq!(
            stories[0].description,
            "Customers can log in\n\nContext: Self-service portal"
        );
        assert_eq!(stories[1].acceptance_criteria, vec!["Login under 2s", "Export as PDF"]);
        assert_eq!(stories[0].priority, Priority::High);
        assert_eq!(stories[0].labels, vec!["requirements", "priority:high"]);
    }

    #[test]
    fn unset_priority_defaults_to_medium_and_nfr_label() {
        let record = record()
            .with_priority(PrioritySetting::Unrecognized("P0".into()))
            .with_non_functional_requirements(["99.9% uptime"]);
        let stories = plan_user_stories(&record);
        assert_eq!(stories[0].priority, Priority::Medium);
        assert!(stories[0].labels.contains(&"nfr-linked".to_string()));
    }

    #[test]
    fn effort_formula() {
        // 2 + 2*2 + ceil(7/25) = 7
        assert_eq!(estimate_effort(2, "Customers can log in Context: portal here"), 7);
        assert_eq!(estimate_effort(0, ""), 2);
        assert_eq!(estimate_effort(30, "x"), 40);
        let long = "word ".repeat(26);
        assert_eq!(estimate_effort(0, &long), 4);
    }

    #[test]
    fn long_titles_are_truncated() {
        let long = "é".repeat(150);
        let title = truncate_title(&long);
        assert_eq!(title.chars().count(), MAX_TITLE_CHARS);
        assert!(title.ends_with("..."));
        assert_eq!(truncate_title("short"), "short");
    }

    #[test]
    fn no_functional_requirements_no_stories() {
        let record = RequirementsRecord::default().with_summary("s");
        assert!(plan_user_stories(&record).is_empty());
    }
}
