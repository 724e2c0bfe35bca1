//! Single generative round trips for the chapter pipeline
//!
//! Each operation builds one prompt, issues one call through
//! [`GenerativeCall`], and validates the payload before returning a typed
//! value. Nothing here retries; a failed call or a payload that fails its
//! contract becomes a [`GenerationError`] naming the step.

use std::sync::Arc;
use thiserror::Error;

use crate::models::{Assembly, ChapterContext, Outline, Section, SectionDescriptor};
use crate::services::llm_client::{GenerativeCall, ProviderError};
use crate::validators::contracts::{assembly_schema, outline_schema, section_schema};
use crate::validators::{validate, SchemaViolation};

/// System prompt shared by every textbook generation call
pub const TEXTBOOK_SYSTEM_PROMPT: &str = "You are an experienced instructional designer writing \
a university-level textbook. Write clear, accurate, well-structured prose for adult learners. \
Always answer by calling the provided tool with every required field filled in.";

/// Why a generation step failed
#[derive(Debug, Error)]
pub enum GenerationCause {
    #[error(transparent)]
    Schema(#[from] SchemaViolation),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// A pipeline step failed
#[derive(Debug, Error)]
#[error("{step} generation failed: {cause}")]
pub struct GenerationError {
    /// `outline`, `section N` (1-based) or `assembly`
    pub step: String,
    #[source]
    pub cause: GenerationCause,
}

impl GenerationError {
    pub fn new(step: impl Into<String>, cause: impl Into<GenerationCause>) -> Self {
        Self {
            step: step.into(),
            cause: cause.into(),
        }
    }

    /// True when the model answered but the answer broke its contract
    pub fn is_schema_violation(&self) -> bool {
        matches!(self.cause, GenerationCause::Schema(_))
    }
}

/// Step label for the section at 0-based `index`
pub fn section_step(index: usize) -> String {
    format!("section {}", index + 1)
}

/// Outline, section and assembly generation over one model
#[derive(Clone)]
pub struct SectionGenerator {
    model: Arc<dyn GenerativeCall>,
}

impl SectionGenerator {
    pub fn new(model: Arc<dyn GenerativeCall>) -> Self {
        Self { model }
    }

    /// Model shared with other checks (e.g. contradiction detection)
    pub fn model(&self) -> Arc<dyn GenerativeCall> {
        Arc::clone(&self.model)
    }

    /// Plan 5-8 progressively more advanced, non-overlapping sections
    pub async fn generate_outline(
        &self,
        learning_outcome: &str,
        topic: &str,
    ) -> Result<Outline, GenerationError> {
        const STEP: &str = "outline";
        let schema = outline_schema();
        let prompt = outline_prompt(learning_outcome, topic);

        let payload = self
            .model
            .call(TEXTBOOK_SYSTEM_PROMPT, &prompt, &schema)
            .await
            .map_err(|e| GenerationError::new(STEP, e))?;

        let outline: Outline =
            validate(payload, &schema).map_err(|e| GenerationError::new(STEP, e))?;

        tracing::debug!(
            title = %outline.title,
            sections = outline.sections.len(),
            "Outline generated"
        );
        Ok(outline)
    }

    /// Write one section given everything generated before it
    ///
    /// `prior_sections` must be the sections already produced for this chapter,
    /// in order; their key concepts are listed in the prompt as material not
    /// to repeat. The returned heading always equals the descriptor heading.
    pub async fn generate_section(
        &self,
        descriptor: &SectionDescriptor,
        context: &ChapterContext,
        prior_sections: &[Section],
    ) -> Result<Section, GenerationError> {
        let step = section_step(prior_sections.len());
        let schema = section_schema();
        let prompt = section_prompt(descriptor, context, prior_sections);

        let payload = self
            .model
            .call(TEXTBOOK_SYSTEM_PROMPT, &prompt, &schema)
            .await
            .map_err(|e| GenerationError::new(step.clone(), e))?;

        let mut section: Section =
            validate(payload, &schema).map_err(|e| GenerationError::new(step.clone(), e))?;

        if section.heading != descriptor.heading {
            tracing::debug!(
                step = %step,
                returned = %section.heading,
                planned = %descriptor.heading,
                "Normalising section heading to outline"
            );
            section.heading = descriptor.heading.clone();
        }

        Ok(section)
    }

    /// Introduction, conclusion, glossary, references and figures
    ///
    /// Runs after all sections exist so the wrapping material describes what
    /// was written rather than what was planned.
    pub async fn generate_assembly(
        &self,
        chapter_title: &str,
        sections: &[Section],
        learning_outcome: &str,
    ) -> Result<Assembly, GenerationError> {
        const STEP: &str = "assembly";
        let schema = assembly_schema();
        let prompt = assembly_prompt(chapter_title, sections, learning_outcome);

        let payload = self
            .model
            .call(TEXTBOOK_SYSTEM_PROMPT, &prompt, &schema)
            .await
            .map_err(|e| GenerationError::new(STEP, e))?;

        let assembly: Assembly =
            validate(payload, &schema).map_err(|e| GenerationError::new(STEP, e))?;

        check_anchors(&assembly, sections).map_err(|e| GenerationError::new(STEP, e))?;

        Ok(assembly)
    }
}

/// Every figure must anchor to a section heading, the introduction or the conclusion
fn check_anchors(assembly: &Assembly, sections: &[Section]) -> Result<(), SchemaViolation> {
    for (index, placeholder) in assembly.image_placeholders.iter().enumerate() {
        let anchor = placeholder.anchor.trim();
        let known = anchor.eq_ignore_ascii_case("introduction")
            || anchor.eq_ignore_ascii_case("conclusion")
            || sections
                .iter()
                .any(|s| s.heading.trim().eq_ignore_ascii_case(anchor));
        if !known {
            return Err(SchemaViolation::new(
                format!("image_placeholders[{}].anchor", index),
                format!(
                    "must name a section heading, introduction or conclusion (got \"{}\")",
                    anchor
                ),
            ));
        }
    }
    Ok(())
}

pub(crate) fn outline_prompt(learning_outcome: &str, topic: &str) -> String {
    format!(
        "Plan a textbook chapter.\n\n\
         Topic: {topic}\n\
         Learning outcome: {learning_outcome}\n\n\
         Produce a chapter title, a short summary of what the introduction will set up, \
         a short summary of what the conclusion will tie together, and between 5 and 8 sections. \
         Sections must cover progressively more advanced sub-topics in a logical order and \
         must not overlap. Give each section a heading, a one to two sentence description, \
         and a target word count (typically 400-600 words)."
    )
}

pub(crate) fn section_prompt(
    descriptor: &SectionDescriptor,
    context: &ChapterContext,
    prior_sections: &[Section],
) -> String {
    let mut prompt = format!(
        "Write one section of the textbook chapter \"{}\".\n\n\
         Course topic: {}\n\
         Learning outcome: {}\n\n\
         Section heading: {}\n\
         Section description: {}\n\
         Target length: about {} words\n",
        context.title,
        context.topic,
        context.learning_outcome,
        descriptor.heading,
        descriptor.description,
        descriptor.target_word_count,
    );

    let covered: Vec<&str> = prior_sections
        .iter()
        .flat_map(|s| s.key_concepts.iter().map(String::as_str))
        .collect();

    if prior_sections.is_empty() {
        prompt.push_str("\nThis is the first section; no concepts have been introduced yet.\n");
        return finish_section_prompt(prompt);
    }

    prompt.push_str(
        "\nSections already written before this one; build on them without restating \
         their material:\n",
    );
    for section in prior_sections {
        prompt.push_str("- ");
        prompt.push_str(&section.heading);
        prompt.push('\n');
    }

    if !covered.is_empty() {
        prompt.push_str(
            "\nKey concepts already introduced in earlier sections. Do not repeat or \
             re-explain them; refer back briefly only where needed:\n",
        );
        for concept in covered {
            prompt.push_str("- ");
            prompt.push_str(concept);
            prompt.push('\n');
        }
    }

    finish_section_prompt(prompt)
}

fn finish_section_prompt(mut prompt: String) -> String {
    prompt.push_str(
        "\nReturn the heading, the body as flowing prose, and the list of key concepts \
         this section newly introduces.",
    );
    prompt
}

pub(crate) fn assembly_prompt(
    chapter_title: &str,
    sections: &[Section],
    learning_outcome: &str,
) -> String {
    let mut prompt = format!(
        "The sections of the textbook chapter \"{chapter_title}\" have been written. \
         Learning outcome: {learning_outcome}\n\n"
    );

    for section in sections {
        prompt.push_str("## ");
        prompt.push_str(&section.heading);
        prompt.push_str("\n\n");
        prompt.push_str(&section.body);
        prompt.push_str("\n\n");
    }

    prompt.push_str(
        "Based on what was actually written above, produce:\n\
         - an introduction that motivates the chapter and previews its sections\n\
         - a conclusion that summarises the key points and links back to the learning outcome\n\
         - a glossary of 10 to 15 terms used in the chapter, each with a definition\n\
         - 3 to 10 formatted references\n\
         - optional image placeholders, each with a figure label, caption, alt text, \
         an image type, and an anchor naming the section heading (or introduction/conclusion) \
         it belongs after",
    );
    prompt
}
