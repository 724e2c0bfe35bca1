//! Generated sections and the assembled chapter artifact

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Shared context passed to every section prompt
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterContext {
    pub title: String,
    pub learning_outcome: String,
    pub topic: String,
}

/// One generated block of chapter content
///
/// Produced exactly once per generation run; never edited after assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub heading: String,
    pub body: String,
    /// Short phrases introduced by this section
    #[serde(default)]
    pub key_concepts: Vec<String>,
}

/// Glossary term and its definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlossaryEntry {
    pub term: String,
    pub definition: String,
}

/// Kind of figure an image placeholder stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageType {
    Diagram,
    Chart,
    Photo,
    Illustration,
    Screenshot,
    Table,
}

impl ImageType {
    /// Wire names accepted from the model
    pub const NAMES: &'static [&'static str] = &[
        "diagram",
        "chart",
        "photo",
        "illustration",
        "screenshot",
        "table",
    ];
}

/// Figure to be produced later and inserted into the flowing text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagePlaceholder {
    /// e.g. "Figure 3"
    pub figure_label: String,
    pub caption: String,
    /// Accessibility description
    pub alt_text: String,
    pub image_type: ImageType,
    /// Heading of the section the figure follows, or "introduction"/"conclusion"
    pub anchor: String,
}

/// Wrapping material produced after all sections exist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assembly {
    pub introduction: String,
    pub conclusion: String,
    pub glossary: Vec<GlossaryEntry>,
    pub references: Vec<String>,
    #[serde(default)]
    pub image_placeholders: Vec<ImagePlaceholder>,
}

/// Category of a coherence finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueKind {
    Contradiction,
    Terminology,
    Redundancy,
}

/// Advisory finding attached to a chapter for human review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoherenceIssue {
    pub kind: IssueKind,
    pub description: String,
}

impl CoherenceIssue {
    pub fn new(kind: IssueKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
        }
    }
}

/// Assembled textbook chapter
///
/// Created by one orchestrator run and persisted once. Regenerating the
/// chapter produces a new artifact that replaces this one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    pub id: Uuid,
    pub learning_outcome_id: String,
    pub title: String,
    pub introduction: String,
    pub sections: Vec<Section>,
    pub conclusion: String,
    pub glossary: Vec<GlossaryEntry>,
    pub references: Vec<String>,
    #[serde(default)]
    pub image_placeholders: Vec<ImagePlaceholder>,
    #[serde(default)]
    pub coherence_issues: Vec<CoherenceIssue>,
    /// Whitespace-delimited words across introduction, sections and conclusion
    pub word_count: usize,
    /// Estimated reading time
    pub estimated_minutes: f64,
    /// Job that produced this chapter
    #[serde(default)]
    pub task_id: Option<String>,
    pub generated_at: DateTime<Utc>,
}
