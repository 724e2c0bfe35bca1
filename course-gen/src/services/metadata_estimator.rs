//! Deterministic content metadata
//!
//! Word counts and duration estimates from a fixed rate table. No model
//! calls and no hidden state: the same input always yields the same output.

use serde::{Deserialize, Serialize};

use crate::models::{Chapter, Section};

/// Silent reading rate
pub const READING_WORDS_PER_MINUTE: f64 = 200.0;

/// Narrated video script rate
pub const NARRATION_WORDS_PER_MINUTE: f64 = 150.0;

/// Flat cost per quiz question
pub const QUIZ_MINUTES_PER_QUESTION: f64 = 1.5;

/// How the content is consumed, which selects the rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ContentKind {
    Reading,
    NarratedVideo,
    Quiz { questions: usize },
}

/// Text fields of one content artifact plus its kind
#[derive(Debug, Clone, PartialEq)]
pub struct EstimateInput<'a> {
    pub kind: ContentKind,
    pub fields: Vec<&'a str>,
}

/// Derived numeric metadata
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContentMetadata {
    pub word_count: usize,
    /// Rounded to one decimal place
    pub duration_minutes: f64,
}

/// Whitespace-delimited token count
pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Estimate word count and duration for arbitrary content
pub fn estimate(input: &EstimateInput<'_>) -> ContentMetadata {
    let word_count: usize = input.fields.iter().map(|f| count_words(f)).sum();

    let minutes = match input.kind {
        ContentKind::Reading => word_count as f64 / READING_WORDS_PER_MINUTE,
        ContentKind::NarratedVideo => word_count as f64 / NARRATION_WORDS_PER_MINUTE,
        ContentKind::Quiz { questions } => questions as f64 * QUIZ_MINUTES_PER_QUESTION,
    };

    ContentMetadata {
        word_count,
        duration_minutes: round_tenths(minutes),
    }
}

/// Reading estimate over the flowing text of a chapter
///
/// Counts the introduction, every section heading and body, and the
/// conclusion. Glossary and references are reference material and excluded.
pub fn estimate_chapter_text(
    introduction: &str,
    sections: &[Section],
    conclusion: &str,
) -> ContentMetadata {
    let mut fields = Vec::with_capacity(sections.len() * 2 + 2);
    fields.push(introduction);
    for section in sections {
        fields.push(section.heading.as_str());
        fields.push(section.body.as_str());
    }
    fields.push(conclusion);

    estimate(&EstimateInput {
        kind: ContentKind::Reading,
        fields,
    })
}

/// Recompute metadata for an assembled chapter
pub fn estimate_chapter(chapter: &Chapter) -> ContentMetadata {
    estimate_chapter_text(&chapter.introduction, &chapter.sections, &chapter.conclusion)
}

fn round_tenths(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(heading: &str, body: &str) -> Section {
        Section {
            heading: heading.to_string(),
            body: body.to_string(),
            key_concepts: vec![],
        }
    }

    #[test]
    fn test_count_words_splits_on_any_whitespace() {
        assert_eq!(count_words(""), 0);
        assert_eq!(count_words("   "), 0);
        assert_eq!(count_words("one"), 1);
        assert_eq!(count_words("one  two\tthree\nfour"), 4);
    }

    #[test]
    fn test_reading_rate() {
        let text = vec!["word"; 400].join(" ");
        let meta = estimate(&EstimateInput {
            kind: ContentKind::Reading,
            fields: vec![&text],
        });
        assert_eq!(meta.word_count, 400);
        assert_eq!(meta.duration_minutes, 2.0);
    }

    #[test]
    fn test_narration_rate() {
        let text = vec!["word"; 300].join(" ");
        let meta = estimate(&EstimateInput {
            kind: ContentKind::NarratedVideo,
            fields: vec![&text, ""],
        });
        assert_eq!(meta.word_count, 300);
        assert_eq!(meta.duration_minutes, 2.0);
    }

    #[test]
    fn test_quiz_flat_cost_ignores_words() {
        let meta = estimate(&EstimateInput {
            kind: ContentKind::Quiz { questions: 4 },
            fields: vec!["What is demand?", "What is supply?"],
        });
        assert_eq!(meta.word_count, 6);
        assert_eq!(meta.duration_minutes, 6.0);
    }

    #[test]
    fn test_chapter_text_counts_all_flowing_fields() {
        let sections = vec![
            section("Demand Curves", "Demand slopes downward."),
            section("Supply Curves", "Supply slopes upward here."),
        ];
        let meta = estimate_chapter_text("An intro sentence.", &sections, "The end.");
        // 3 + (2 + 3) + (2 + 4) + 2
        assert_eq!(meta.word_count, 16);
    }

    #[test]
    fn test_estimate_is_idempotent() {
        let sections = vec![section("A", "alpha beta gamma"), section("B", "delta")];
        let first = estimate_chapter_text("intro", &sections, "outro");
        let second = estimate_chapter_text("intro", &sections, "outro");
        assert_eq!(first, second);
    }
}
