//! Chapter outline planned before section content is generated

use serde::{Deserialize, Serialize};

/// Fewest sections an outline may contain
pub const MIN_OUTLINE_SECTIONS: usize = 5;

/// Most sections an outline may contain
pub const MAX_OUTLINE_SECTIONS: usize = 8;

/// Planned structure for one chapter
///
/// Only constructed through schema validation, which rejects section counts
/// outside [`MIN_OUTLINE_SECTIONS`]..=[`MAX_OUTLINE_SECTIONS`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outline {
    pub title: String,
    pub introduction_summary: String,
    pub conclusion_summary: String,
    pub sections: Vec<SectionDescriptor>,
}

/// One planned section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionDescriptor {
    pub heading: String,
    /// One to two sentences describing what the section covers
    pub description: String,
    /// Soft length target (typically 400-600)
    pub target_word_count: u32,
}
