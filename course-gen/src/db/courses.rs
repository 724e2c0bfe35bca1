//! Course document persistence
//!
//! Courses are stored whole as JSON, one row per (owner, course). Loading
//! goes through serde defaults, so documents written by older or newer
//! versions with missing or extra fields still load.

use async_trait::async_trait;
use course_common::{Error, Result};
use sqlx::SqlitePool;

use crate::models::Course;

/// Per-owner course storage
#[async_trait]
pub trait CourseStore: Send + Sync {
    /// Course owned by `owner_id`, or `None` if it does not exist
    async fn load(&self, owner_id: &str, course_id: &str) -> Result<Option<Course>>;

    /// Insert or replace the whole course document
    async fn save(&self, owner_id: &str, course: &Course) -> Result<()>;
}

/// SQLite-backed [`CourseStore`]
#[derive(Clone)]
pub struct SqliteCourseStore {
    pool: SqlitePool,
}

impl SqliteCourseStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl CourseStore for SqliteCourseStore {
    async fn load(&self, owner_id: &str, course_id: &str) -> Result<Option<Course>> {
        let body: Option<String> = sqlx::query_scalar(
            "SELECT body FROM courses WHERE owner_id = ? AND course_id = ?",
        )
        .bind(owner_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;

        match body {
            Some(body) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, owner_id: &str, course: &Course) -> Result<()> {
        if course.owner_id != owner_id {
            return Err(Error::InvalidInput(format!(
                "course {} belongs to {}, not {}",
                course.id, course.owner_id, owner_id
            )));
        }

        let body = serde_json::to_string(course)?;
        let updated_at = course.updated_at.to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO courses (owner_id, course_id, body, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(owner_id, course_id) DO UPDATE SET
                body = excluded.body,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(owner_id)
        .bind(&course.id)
        .bind(&body)
        .bind(&updated_at)
        .execute(&self.pool)
        .await?;

        tracing::debug!(owner_id, course_id = %course.id, "Course saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LearningOutcome;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_store() -> SqliteCourseStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::init_tables(&pool).await.unwrap();
        SqliteCourseStore::new(pool)
    }

    #[tokio::test]
    async fn test_load_missing_is_none() {
        let store = setup_store().await;
        assert!(store.load("alice", "econ-101").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let store = setup_store().await;
        let mut course = Course::new("econ-101", "alice", "Microeconomics");
        course.learning_outcomes.push(LearningOutcome {
            id: "lo-1".to_string(),
            behavior: "Explain supply and demand".to_string(),
        });

        store.save("alice", &course).await.unwrap();
        let loaded = store.load("alice", "econ-101").await.unwrap().unwrap();
        assert_eq!(loaded, course);
    }

    #[tokio::test]
    async fn test_courses_are_scoped_by_owner() {
        let store = setup_store().await;
        store
            .save("alice", &Course::new("econ-101", "alice", "Microeconomics"))
            .await
            .unwrap();

        assert!(store.load("bob", "econ-101").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_replaces_document() {
        let store = setup_store().await;
        let mut course = Course::new("econ-101", "alice", "Microeconomics");
        store.save("alice", &course).await.unwrap();

        course.title = "Intermediate Microeconomics".to_string();
        store.save("alice", &course).await.unwrap();

        let loaded = store.load("alice", "econ-101").await.unwrap().unwrap();
        assert_eq!(loaded.title, "Intermediate Microeconomics");
    }

    #[tokio::test]
    async fn test_save_rejects_owner_mismatch() {
        let store = setup_store().await;
        let course = Course::new("econ-101", "alice", "Microeconomics");
        let err = store.save("bob", &course).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
