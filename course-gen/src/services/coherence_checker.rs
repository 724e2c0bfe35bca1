//! Post-generation coherence pass over an assembled chapter
//!
//! Three independent checks, unioned into one advisory issue list:
//!
//! - terminology: glossary terms missing from the text, and near-miss
//!   spellings of glossary terms (normalized Levenshtein via strsim)
//! - redundancy: word-overlap ratio per section pair, plus duplicate headings
//! - contradiction: one model call over all section bodies
//!
//! Issues never block persistence.

use serde::Deserialize;
use std::collections::{BTreeSet, HashSet};

use crate::models::{CoherenceIssue, GlossaryEntry, IssueKind, Section};
use crate::services::llm_client::GenerativeCall;
use crate::services::section_generator::{GenerationError, TEXTBOOK_SYSTEM_PROMPT};
use crate::validators::contracts::contradiction_schema;
use crate::validators::validate;

/// Pairs sharing more than this fraction of words are flagged
pub const DEFAULT_REDUNDANCY_THRESHOLD: f64 = 0.5;

/// Similarity at or above which a body phrase counts as a spelling variant
pub const SPELLING_VARIANT_THRESHOLD: f64 = 0.85;

/// Model answer meaning "nothing to report"
pub const NO_CONTRADICTIONS_SENTINEL: &str = "NO CONTRADICTIONS FOUND";

/// Phrases shorter than this are never treated as variants
const MIN_VARIANT_CHARS: usize = 4;

#[derive(Debug, Deserialize)]
struct ContradictionReport {
    findings: String,
}

/// Coherence checker with explicit thresholds
#[derive(Debug, Clone)]
pub struct CoherenceChecker {
    redundancy_threshold: f64,
    variant_threshold: f64,
}

impl Default for CoherenceChecker {
    fn default() -> Self {
        Self {
            redundancy_threshold: DEFAULT_REDUNDANCY_THRESHOLD,
            variant_threshold: SPELLING_VARIANT_THRESHOLD,
        }
    }
}

impl CoherenceChecker {
    pub fn new(redundancy_threshold: f64) -> Self {
        Self {
            redundancy_threshold,
            ..Self::default()
        }
    }

    /// Run all three checks
    ///
    /// A failed contradiction call is logged and recorded as a single
    /// advisory issue; the deterministic checks always run.
    pub async fn check(
        &self,
        model: &dyn GenerativeCall,
        glossary: &[GlossaryEntry],
        sections: &[Section],
    ) -> Vec<CoherenceIssue> {
        let mut issues = self.check_terms(glossary, sections);
        issues.extend(self.check_redundancy(sections));

        match self.check_contradictions(model, sections).await {
            Ok(found) => issues.extend(found),
            Err(e) => {
                tracing::warn!(error = %e, "Contradiction check failed, continuing without it");
                issues.push(CoherenceIssue::new(
                    IssueKind::Contradiction,
                    format!("Contradiction check skipped: {}", e),
                ));
            }
        }

        issues
    }

    /// Glossary terms absent from every body, and near-miss spellings in bodies
    pub fn check_terms(
        &self,
        glossary: &[GlossaryEntry],
        sections: &[Section],
    ) -> Vec<CoherenceIssue> {
        let mut issues = Vec::new();
        let section_tokens: Vec<Vec<String>> = sections.iter().map(|s| tokenize(&s.body)).collect();

        let glossary_terms: HashSet<String> = glossary
            .iter()
            .map(|entry| tokenize(&entry.term).join(" "))
            .filter(|term| !term.is_empty())
            .collect();

        for entry in glossary {
            let term_tokens = tokenize(&entry.term);
            if term_tokens.is_empty() {
                continue;
            }
            let present = section_tokens
                .iter()
                .any(|tokens| contains_term(tokens, &term_tokens));
            if !present {
                issues.push(CoherenceIssue::new(
                    IssueKind::Terminology,
                    format!(
                        "Glossary term \"{}\" does not appear in any section",
                        entry.term.trim()
                    ),
                ));
            }
        }

        // (term, variant) pairs already reported
        let mut reported: BTreeSet<(String, String)> = BTreeSet::new();

        for entry in glossary {
            let term_tokens = tokenize(&entry.term);
            if term_tokens.is_empty() {
                continue;
            }
            let term = term_tokens.join(" ");

            for (section, tokens) in sections.iter().zip(&section_tokens) {
                for window in tokens.windows(term_tokens.len()) {
                    let candidate = window.join(" ");
                    if !self.is_spelling_variant(&candidate, &term, &glossary_terms) {
                        continue;
                    }
                    if reported.insert((term.clone(), candidate.clone())) {
                        issues.push(CoherenceIssue::new(
                            IssueKind::Terminology,
                            format!(
                                "\"{}\" in section \"{}\" looks like a variant of glossary term \"{}\"",
                                candidate,
                                section.heading,
                                entry.term.trim()
                            ),
                        ));
                    }
                }
            }
        }

        issues
    }

    fn is_spelling_variant(&self, candidate: &str, term: &str, glossary: &HashSet<String>) -> bool {
        if candidate == term
            || candidate.chars().count() < MIN_VARIANT_CHARS
            || glossary.contains(candidate)
            || is_inflection(candidate, term)
        {
            return false;
        }
        strsim::normalized_levenshtein(candidate, term) >= self.variant_threshold
    }

    /// Pairwise word overlap and duplicate headings
    pub fn check_redundancy(&self, sections: &[Section]) -> Vec<CoherenceIssue> {
        let mut issues = Vec::new();
        let word_sets: Vec<HashSet<String>> = sections
            .iter()
            .map(|s| tokenize(&s.body).into_iter().collect())
            .collect();

        for i in 0..sections.len() {
            for j in (i + 1)..sections.len() {
                let (a, b) = (&sections[i], &sections[j]);

                if a.heading.trim().eq_ignore_ascii_case(b.heading.trim()) {
                    issues.push(CoherenceIssue::new(
                        IssueKind::Redundancy,
                        format!(
                            "Sections {} and {} share the heading \"{}\"",
                            i + 1,
                            j + 1,
                            a.heading.trim()
                        ),
                    ));
                }

                let overlap = overlap_ratio(&word_sets[i], &word_sets[j]);
                if overlap > self.redundancy_threshold {
                    issues.push(CoherenceIssue::new(
                        IssueKind::Redundancy,
                        format!(
                            "Sections \"{}\" and \"{}\" overlap heavily ({:.0}% shared words)",
                            a.heading,
                            b.heading,
                            overlap * 100.0
                        ),
                    ));
                }
            }
        }

        issues
    }

    /// Ask the model for factual contradictions between sections
    ///
    /// Fewer than two sections cannot contradict each other, so no call is made.
    pub async fn check_contradictions(
        &self,
        model: &dyn GenerativeCall,
        sections: &[Section],
    ) -> Result<Vec<CoherenceIssue>, GenerationError> {
        const STEP: &str = "coherence";
        if sections.len() < 2 {
            return Ok(Vec::new());
        }

        let schema = contradiction_schema();
        let payload = model
            .call(TEXTBOOK_SYSTEM_PROMPT, &contradiction_prompt(sections), &schema)
            .await
            .map_err(|e| GenerationError::new(STEP, e))?;

        let report: ContradictionReport =
            validate(payload, &schema).map_err(|e| GenerationError::new(STEP, e))?;

        Ok(parse_contradictions(&report.findings))
    }
}

/// Shared distinct words over the smaller set's distinct words
pub fn overlap_ratio(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let smaller = a.len().min(b.len());
    if smaller == 0 {
        return 0.0;
    }
    let shared = a.intersection(b).count();
    shared as f64 / smaller as f64
}

/// One issue per reported line; the sentinel maps to none
pub fn parse_contradictions(findings: &str) -> Vec<CoherenceIssue> {
    if is_sentinel(findings) {
        return Vec::new();
    }

    findings
        .lines()
        .map(strip_list_marker)
        .filter(|line| !line.is_empty() && !is_sentinel(line))
        .map(|line| CoherenceIssue::new(IssueKind::Contradiction, line))
        .collect()
}

fn is_sentinel(text: &str) -> bool {
    text.trim()
        .trim_end_matches('.')
        .eq_ignore_ascii_case(NO_CONTRADICTIONS_SENTINEL)
}

/// Drop `-`, `*`, `•`, `1.` or `1)` prefixes
fn strip_list_marker(line: &str) -> &str {
    let line = line.trim();
    let line = line.trim_start_matches(['-', '*', '•']).trim_start();

    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(stripped) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            return stripped.trim();
        }
    }
    line
}

fn contradiction_prompt(sections: &[Section]) -> String {
    let mut prompt = String::from(
        "Review the following textbook sections for factual contradictions between \
         sections: statements in one section that conflict with statements in another.\n\n",
    );
    for (index, section) in sections.iter().enumerate() {
        prompt.push_str(&format!(
            "### Section {}: {}\n\n{}\n\n",
            index + 1,
            section.heading,
            section.body
        ));
    }
    prompt.push_str(&format!(
        "List each contradiction on its own line, naming the sections involved. \
         If there are none, answer exactly: {}",
        NO_CONTRADICTIONS_SENTINEL
    ));
    prompt
}

/// Lowercase alphanumeric words
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Whole-word match of `term` in `tokens`; a plural of the term also counts
fn contains_term(tokens: &[String], term_tokens: &[String]) -> bool {
    let term = term_tokens.join(" ");
    tokens.windows(term_tokens.len()).any(|window| {
        let candidate = window.join(" ");
        candidate == term || is_simple_plural(&candidate, &term)
    })
}

/// Suffix pairs that differ only by regular inflection, e.g. consumer/consumed
const INFLECTION_SUFFIXES: [&str; 9] = ["", "s", "es", "d", "ed", "r", "er", "ing", "ly"];

fn is_inflection(a: &str, b: &str) -> bool {
    let common = a
        .chars()
        .zip(b.chars())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x.len_utf8())
        .sum::<usize>();
    INFLECTION_SUFFIXES.contains(&&a[common..]) && INFLECTION_SUFFIXES.contains(&&b[common..])
}

fn is_simple_plural(a: &str, b: &str) -> bool {
    let plural_of = |word: &str, base: &str| {
        word.strip_prefix(base)
            .map(|suffix| suffix == "s" || suffix == "es")
            .unwrap_or(false)
    };
    plural_of(a, b) || plural_of(b, a)
}
