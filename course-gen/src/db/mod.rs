//! Database access for course-gen
//!
//! One SQLite file under the root folder holds course documents.

pub mod courses;

pub use courses::{CourseStore, SqliteCourseStore};

use course_common::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;

/// Open (creating if needed) the database and ensure tables exist
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!(url = %db_url, "Connecting to database");

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&db_url)
        .await?;

    init_tables(&pool).await?;
    Ok(pool)
}

/// Create course-gen tables if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS courses (
            owner_id TEXT NOT NULL,
            course_id TEXT NOT NULL,
            body TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (owner_id, course_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
