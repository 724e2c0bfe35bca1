//! Test helper utilities
//!
//! Shared setup for course-gen integration tests: an in-memory course
//! store, a seeded course, and a scripted model that answers every schema
//! with a valid payload and records the prompts it received.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use sqlx::sqlite::SqlitePoolOptions;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

use course_common::config::GenerationConfig;
use course_gen::db::{self, CourseStore, SqliteCourseStore};
use course_gen::models::{Course, JobStatus, LearningOutcome};
use course_gen::services::{GenerativeCall, JobTracker, ProviderError};
use course_gen::validators::SchemaDescriptor;
use course_gen::AppState;

pub const OWNER_ID: &str = "local";
pub const COURSE_ID: &str = "econ-101";
pub const OUTCOME_ID: &str = "lo-1";
pub const OUTCOME: &str = "Explain supply and demand";
pub const TOPIC: &str = "Microeconomics";

pub const GLOSSARY_TERMS: [&str; 10] = [
    "supply",
    "demand",
    "market",
    "equilibrium price",
    "surplus",
    "shortage",
    "elasticity",
    "price ceiling",
    "price floor",
    "consumer",
];

/// Key concepts the scripted model reports for section `n` (1-based)
pub fn concepts_for_section(n: usize) -> [String; 2] {
    [format!("key idea {}-a", n), format!("key idea {}-b", n)]
}

/// One recorded model call
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub schema: &'static str,
    pub system_prompt: String,
    pub user_prompt: String,
}

/// Model double answering by schema name
pub struct ScriptedGenerator {
    outline_sections: usize,
    fail_on: Option<&'static str>,
    fail_on_section: Option<usize>,
    gate: Option<Arc<Semaphore>>,
    section_calls: AtomicUsize,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self {
            outline_sections: 5,
            fail_on: None,
            fail_on_section: None,
            gate: None,
            section_calls: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Outline with this many sections (may be out of bounds on purpose)
    pub fn with_sections(mut self, count: usize) -> Self {
        self.outline_sections = count;
        self
    }

    /// Every call for this schema fails with a provider error
    pub fn failing_on(mut self, schema: &'static str) -> Self {
        self.fail_on = Some(schema);
        self
    }

    /// The n-th (1-based) section call fails with a provider error
    pub fn failing_on_section(mut self, n: usize) -> Self {
        self.fail_on_section = Some(n);
        self
    }

    /// Each call waits for one permit on the returned semaphore
    pub fn gated(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.gate = Some(Arc::clone(&gate));
        (self, gate)
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// User prompts received for one schema, in call order
    pub fn prompts_for(&self, schema: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.schema == schema)
            .map(|c| c.user_prompt)
            .collect()
    }

    fn outline(&self) -> Value {
        let sections: Vec<Value> = (1..=self.outline_sections)
            .map(|n| {
                json!({
                    "heading": format!("Part {}", n),
                    "description": format!("Covers idea number {}.", n),
                    "target_word_count": 500
                })
            })
            .collect();
        json!({
            "title": "Supply and Demand",
            "introduction_summary": "How markets coordinate buyers and sellers.",
            "conclusion_summary": "Prices as signals.",
            "sections": sections
        })
    }

    fn section(n: usize) -> Value {
        let [a, b] = concepts_for_section(n);
        json!({
            "heading": format!("Part {}", n),
            "body": format!(
                "Part {n} builds on the market model. Supply and demand meet at an \
                 equilibrium price; a surplus or shortage appears otherwise. Elasticity \
                 measures how each consumer responds, and a price ceiling or price floor \
                 shifts the outcome. Detail {n}."
            ),
            "key_concepts": [a, b]
        })
    }

    fn assembly() -> Value {
        let glossary: Vec<Value> = GLOSSARY_TERMS
            .iter()
            .map(|term| json!({ "term": term, "definition": format!("Definition of {}.", term) }))
            .collect();
        json!({
            "introduction": "This chapter explains how supply and demand set prices.",
            "conclusion": "Markets clear where supply meets demand.",
            "glossary": glossary,
            "references": [
                "Mankiw, N. G. (2020). Principles of Economics. Cengage.",
                "Marshall, A. (1890). Principles of Economics. Macmillan.",
                "Varian, H. R. (2014). Intermediate Microeconomics. Norton."
            ],
            "image_placeholders": [{
                "figure_label": "Figure 1",
                "caption": "Supply and demand curves crossing at equilibrium",
                "alt_text": "Two lines crossing; the crossing point is labelled equilibrium",
                "image_type": "chart",
                "anchor": "introduction"
            }]
        })
    }
}

#[async_trait]
impl GenerativeCall for ScriptedGenerator {
    async fn call(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        schema: &SchemaDescriptor,
    ) -> Result<Value, ProviderError> {
        self.calls.lock().unwrap().push(RecordedCall {
            schema: schema.name,
            system_prompt: system_prompt.to_string(),
            user_prompt: user_prompt.to_string(),
        });

        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| ProviderError::Network(e.to_string()))?
                .forget();
        }

        if self.fail_on == Some(schema.name) {
            return Err(ProviderError::Network("connection reset".to_string()));
        }

        match schema.name {
            "chapter_outline" => Ok(self.outline()),
            "chapter_section" => {
                let n = self.section_calls.fetch_add(1, Ordering::SeqCst) + 1;
                if self.fail_on_section == Some(n) {
                    return Err(ProviderError::Timeout(Duration::from_secs(120)));
                }
                Ok(Self::section(n))
            }
            "chapter_assembly" => Ok(Self::assembly()),
            "contradiction_report" => Ok(json!({ "findings": "NO CONTRADICTIONS FOUND" })),
            other => Err(ProviderError::MalformedResponse(format!("unexpected schema {}", other))),
        }
    }
}

/// Empty in-memory course store
pub async fn create_test_store() -> Arc<SqliteCourseStore> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    db::init_tables(&pool)
        .await
        .expect("Failed to create tables");
    Arc::new(SqliteCourseStore::new(pool))
}

/// "Microeconomics" with one learning outcome
pub fn test_course() -> Course {
    let mut course = Course::new(COURSE_ID, OWNER_ID, TOPIC);
    course.learning_outcomes.push(LearningOutcome {
        id: OUTCOME_ID.to_string(),
        behavior: OUTCOME.to_string(),
    });
    course
}

pub async fn seed_course(store: &dyn CourseStore) {
    store
        .save(OWNER_ID, &test_course())
        .await
        .expect("Failed to seed course");
}

/// App state over a seeded store
pub async fn create_test_state(
    model: Arc<ScriptedGenerator>,
    max_concurrent_jobs: usize,
) -> (AppState, Arc<SqliteCourseStore>) {
    let store = create_test_store().await;
    seed_course(store.as_ref()).await;

    let generation = GenerationConfig {
        max_concurrent_jobs,
        ..GenerationConfig::default()
    };
    let state = AppState::new(model, store.clone(), &generation);
    (state, store)
}

/// Poll until the job is terminal
pub async fn wait_for_terminal(tracker: &JobTracker, task_id: &str) -> JobStatus {
    wait_for(tracker, task_id, |s| s.is_terminal()).await
}

/// Poll until `predicate` holds for the job
pub async fn wait_for<F>(tracker: &JobTracker, task_id: &str, predicate: F) -> JobStatus
where
    F: Fn(&JobStatus) -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let status = tracker
            .get(task_id)
            .await
            .expect("Job should exist");
        if predicate(&status) {
            return status;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("Timed out waiting on job {}: {:?}", task_id, status);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
