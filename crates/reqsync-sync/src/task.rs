//! Task enrichment
//!
//! Turns a [`UserStory`] into the [`TaskDraft`] sent to the remote tracker.

use crate::story::UserStory;
use reqsync_document::Priority;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Relative size bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    /// Up to 2 points
    Low,
    /// Up to 5 points
    Medium,
    /// More than 5 points
    High,
}

impl Complexity {
    /// Bucket for a story-point value
    #[must_use]
    pub fn from_points(points: u32) -> Self {
        match points {
            0..=2 => Self::Low,
            3..=5 => Self::Medium,
            _ => Self::High,
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        })
    }
}

/// Numeric rank; lower is more urgent
#[must_use]
pub fn priority_rank(priority: Priority) -> u8 {
    match priority {
        Priority::Critical => 1,
        Priority::High => 3,
        Priority::Medium => 5,
        Priority::Low => 9,
    }
}

/// Fibonacci story points from estimated hours
#[must_use]
pub fn story_points(hours: u32) -> u32 {
    match hours {
        0..=2 => 1,
        3..=4 => 2,
        5..=8 => 3,
        9..=16 => 5,
        17..=24 => 8,
        _ => 13,
    }
}

/// Checklist entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistItem {
    /// Entry text
    pub text: String,
    /// Done
    pub checked: bool,
}

/// Enriched task payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDraft {
    /// Task title
    pub title: String,
    /// Description with the effort block appended
    pub description: String,
    /// Priority level
    pub priority: Priority,
    /// Numeric rank derived from priority
    pub priority_rank: u8,
    /// Estimated hours
    pub estimated_hours: u32,
    /// Story points
    pub story_points: u32,
    /// Complexity bucket
    pub complexity: Complexity,
    /// One unchecked entry per acceptance criterion
    pub checklist: Vec<ChecklistItem>,
    /// Tracker labels
    pub labels: Vec<String>,
}

impl TaskDraft {
    /// Enrich a story
    #[must_use]
    pub fn from_story(story: &UserStory) -> Self {
        let points = story_points(story.estimated_hours);
        let complexity = Complexity::from_points(points);
        let description = format!(
            "{}\n\n---\nEstimated effort: {}h\nStory points: {points}\nComplexity: {complexity}",
            story.description, story.estimated_hours
        );
        Self {
            title: story.title.clone(),
            description,
            priority: story.priority,
            priority_rank: priority_rank(story.priority),
            estimated_hours: story.estimated_hours,
            story_points: points,
            complexity,
            checklist: story
                .acceptance_criteria
                .iter()
                .map(|text| ChecklistItem {
                    text: text.clone(),
                    checked: false,
                })
                .collect(),
            labels: story.labels.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn story(hours: u32) -> UserStory {
        UserStory {
            title: "Login".into(),
            description: "Customers can log in".into(),
            acceptance_criteria: vec!["Under 2s".into(), "Locks after 5 tries".into()],
            priority: Priority::Critical,
            estimated_hours: hours,
            labels: vec!["requirements".into()],
        }
    }

    #[test]
    fn rank_table() {
        assert_eq!(priority_rank(Priority::Critical), 1);
        assert_eq!(priority_rank(Priority::High), 3);
        assert_eq!(priority_rank(Priority::Medium), 5);
        assert_eq!(priority_rank(Priority::Low), 9);
    }

    #[test]
    fn points_and_complexity() {
        let cases = [(1, 1), (2, 1), (4, 2), (8, 3), (16, 5), (24, 8), (40, 13)];
        for (hours, points) in cases {
            assert_eq!(story_points(hours), points, "hours {hours}");
        }
        assert_eq!(Complexity::from_points(2), Complexity::Low);
        assert_eq!(Complexity::from_points(5), Complexity::Medium);
        assert_eq!(Complexity::from_points(8), Complexity::High);
    }

    #[test]
    fn draft_is_enriched() {
        let draft = TaskDraft::from_story(&story(7));
        assert_eq!(draft.priority_rank, 1);
        assert_eq!(draft.story_points, 3);
        assert_eq!(draft.complexity, Complexity::Medium);
        assert_eq!(draft.checklist.len(), 2);
        assert!(draft.checklist.iter().all(|item| !item.checked));
        assert_eq!(draft.checklist[1].text, "Locks after 5 tries");
        assert!(draft.description.starts_with("Customers can log in\n\n---\n"));
        assert!(draft.description.contains("Estimated effort: 7h"));
        assert!(draft.description.contains("Complexity: Medium"));
    }
}
