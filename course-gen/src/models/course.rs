//! Course records as persisted by the course store
//!
//! Every optional field carries a serde default and unknown fields are
//! ignored, so older or newer stored documents still load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Chapter;

/// A course owned by one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub learning_outcomes: Vec<LearningOutcome>,
    /// Generated textbook chapters, at most one per learning outcome
    #[serde(default)]
    pub chapters: Vec<Chapter>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

/// Pedagogical target a chapter is generated to support
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningOutcome {
    pub id: String,
    /// Described capability, e.g. "Explain supply and demand"
    pub behavior: String,
}

impl Course {
    pub fn new(id: impl Into<String>, owner_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            title: title.into(),
            description: String::new(),
            learning_outcomes: Vec::new(),
            chapters: Vec::new(),
            updated_at: Utc::now(),
        }
    }

    /// Look up a learning outcome by id
    pub fn learning_outcome(&self, outcome_id: &str) -> Option<&LearningOutcome> {
        self.learning_outcomes.iter().find(|o| o.id == outcome_id)
    }

    /// Topic used when prompting: the description when present, else the title
    pub fn topic(&self) -> &str {
        if self.description.trim().is_empty() {
            &self.title
        } else {
            &self.description
        }
    }

    /// Chapter currently attached to a learning outcome
    pub fn chapter_for(&self, outcome_id: &str) -> Option<&Chapter> {
        self.chapters
            .iter()
            .find(|c| c.learning_outcome_id == outcome_id)
    }

    /// Attach a chapter, replacing any prior chapter for the same outcome
    ///
    /// Returns the superseded chapter, if there was one. The replacement keeps
    /// the position of the chapter it supersedes.
    pub fn replace_chapter(&mut self, chapter: Chapter) -> Option<Chapter> {
        self.updated_at = Utc::now();
        match self
            .chapters
            .iter()
            .position(|c| c.learning_outcome_id == chapter.learning_outcome_id)
        {
            Some(index) => Some(std::mem::replace(&mut self.chapters[index], chapter)),
            None => {
                self.chapters.push(chapter);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_fields_are_ignored_on_load() {
        let json = r#"{
            "id": "econ-101",
            "owner_id": "alice",
            "title": "Microeconomics",
            "legacy_blueprint": {"modules": []},
            "learning_outcomes": [{"id": "lo-1", "behavior": "Explain supply and demand"}]
        }"#;

        let course: Course = serde_json::from_str(json).unwrap();
        assert_eq!(course.id, "econ-101");
        assert!(course.chapters.is_empty());
        assert_eq!(course.description, "");
        assert_eq!(
            course.learning_outcome("lo-1").map(|o| o.behavior.as_str()),
            Some("Explain supply and demand")
        );
    }

    #[test]
    fn test_topic_prefers_description() {
        let mut course = Course::new("c", "o", "Microeconomics");
        assert_eq!(course.topic(), "Microeconomics");
        course.description = "Introductory markets".to_string();
        assert_eq!(course.topic(), "Introductory markets");
    }
}
