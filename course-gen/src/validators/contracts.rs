//! Contracts for each structured model response in the chapter pipeline

use super::schema::{FieldKind, FieldRule, SchemaDescriptor};
use crate::models::{ImageType, MAX_OUTLINE_SECTIONS, MIN_OUTLINE_SECTIONS};

/// Glossary size bounds
pub const MIN_GLOSSARY_ENTRIES: usize = 10;
pub const MAX_GLOSSARY_ENTRIES: usize = 15;

/// Reference list size bounds
pub const MIN_REFERENCES: usize = 3;
pub const MAX_REFERENCES: usize = 10;

/// Upper bound on key concepts reported per section
pub const MAX_KEY_CONCEPTS: usize = 12;

/// Upper bound on image placeholders per chapter
pub const MAX_IMAGE_PLACEHOLDERS: usize = 10;

/// Outline: title, summaries and 5-8 section descriptors
pub fn outline_schema() -> SchemaDescriptor {
    SchemaDescriptor {
        name: "chapter_outline",
        description: "Planned structure of a textbook chapter",
        fields: vec![
            FieldRule::required("title", FieldKind::Text),
            FieldRule::required("introduction_summary", FieldKind::Text)
                .describe("What the introduction will set up"),
            FieldRule::required("conclusion_summary", FieldKind::Text)
                .describe("What the conclusion will tie together"),
            FieldRule::required(
                "sections",
                FieldKind::list(
                    FieldKind::Object(vec![
                        FieldRule::required("heading", FieldKind::Text),
                        FieldRule::required("description", FieldKind::Text)
                            .describe("One to two sentences on what the section covers"),
                        FieldRule::required(
                            "target_word_count",
                            FieldKind::Integer { min: 100, max: 2000 },
                        ),
                    ]),
                    MIN_OUTLINE_SECTIONS,
                    MAX_OUTLINE_SECTIONS,
                ),
            )
            .describe("Sections in order, progressively more advanced, no overlap"),
        ],
    }
}

/// One generated section
pub fn section_schema() -> SchemaDescriptor {
    SchemaDescriptor {
        name: "chapter_section",
        description: "Prose for one chapter section",
        fields: vec![
            FieldRule::required("heading", FieldKind::Text),
            FieldRule::required("body", FieldKind::Text),
            FieldRule::required(
                "key_concepts",
                FieldKind::list(FieldKind::Text, 0, MAX_KEY_CONCEPTS),
            )
            .describe("Short phrases for concepts this section introduces"),
        ],
    }
}

/// Introduction, conclusion, glossary, references and figures
pub fn assembly_schema() -> SchemaDescriptor {
    SchemaDescriptor {
        name: "chapter_assembly",
        description: "Wrapping material for a completed chapter",
        fields: vec![
            FieldRule::required("introduction", FieldKind::Text),
            FieldRule::required("conclusion", FieldKind::Text),
            FieldRule::required(
                "glossary",
                FieldKind::list(
                    FieldKind::Object(vec![
                        FieldRule::required("term", FieldKind::Text),
                        FieldRule::required("definition", FieldKind::Text),
                    ]),
                    MIN_GLOSSARY_ENTRIES,
                    MAX_GLOSSARY_ENTRIES,
                ),
            ),
            FieldRule::required(
                "references",
                FieldKind::list(FieldKind::Text, MIN_REFERENCES, MAX_REFERENCES),
            )
            .describe("Formatted citations"),
            FieldRule::optional(
                "image_placeholders",
                FieldKind::list(
                    FieldKind::Object(vec![
                        FieldRule::required("figure_label", FieldKind::Text),
                        FieldRule::required("caption", FieldKind::Text),
                        FieldRule::required("alt_text", FieldKind::Text)
                            .describe("Accessibility description"),
                        FieldRule::required("image_type", FieldKind::OneOf(ImageType::NAMES)),
                        FieldRule::required("anchor", FieldKind::Text).describe(
                            "Heading of the section the figure follows, or introduction/conclusion",
                        ),
                    ]),
                    0,
                    MAX_IMAGE_PLACEHOLDERS,
                ),
            ),
        ],
    }
}

/// Free-text contradiction findings
pub fn contradiction_schema() -> SchemaDescriptor {
    SchemaDescriptor {
        name: "contradiction_report",
        description: "Factual contradictions between chapter sections",
        fields: vec![FieldRule::required("findings", FieldKind::Text)
            .describe("One contradiction per line, or exactly NO CONTRADICTIONS FOUND")],
    }
}
