//! Concurrency tests for the job tracker and generation queue

mod helpers;

use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::task::JoinSet;

use course_gen::models::{JobState, JobUpdate};
use course_gen::services::JobTracker;

use helpers::*;

#[tokio::test]
async fn test_concurrent_updates_to_different_jobs_do_not_interfere() {
    let tracker = JobTracker::new();
    let mut set = JoinSet::new();

    for worker in 0..20 {
        let tracker = tracker.clone();
        set.spawn(async move {
            let task_id = tracker.create("textbook").await;
            for step in 1..=10 {
                tracker
                    .update(
                        &task_id,
                        JobUpdate::running(step as f64 / 20.0, format!("worker {} step {}", worker, step)),
                    )
                    .await
                    .unwrap();
                tokio::task::yield_now().await;
            }
            tracker
                .update(&task_id, JobUpdate::completed(json!({ "worker": worker })))
                .await
                .unwrap();
            (worker, task_id)
        });
    }

    let mut ids = HashSet::new();
    while let Some(result) = set.join_next().await {
        let (worker, task_id) = result.unwrap();
        let status = tracker.get(&task_id).await.unwrap();
        assert_eq!(status.status, JobState::Completed);
        assert_eq!(status.progress, 1.0);
        assert_eq!(status.result, Some(json!({ "worker": worker })));
        assert!(ids.insert(task_id));
    }
    assert_eq!(tracker.len().await, 20);
}

#[tokio::test]
async fn test_readers_never_see_progress_go_backwards() {
    let tracker = JobTracker::new();
    let task_id = tracker.create("textbook").await;

    let writer = {
        let tracker = tracker.clone();
        let task_id = task_id.clone();
        tokio::spawn(async move {
            for step in 0..=100 {
                tracker
                    .update(&task_id, JobUpdate::running(step as f64 / 100.0, "step"))
                    .await
                    .unwrap();
                tokio::task::yield_now().await;
            }
        })
    };

    let mut last = 0.0;
    while !writer.is_finished() {
        let status = tracker.get(&task_id).await.unwrap();
        assert!(status.progress >= last);
        last = status.progress;
        tokio::task::yield_now().await;
    }
    writer.await.unwrap();
}

#[tokio::test]
async fn test_many_submissions_all_complete_under_limit() {
    let model = Arc::new(ScriptedGenerator::new());
    let (state, _store) = create_test_state(model, 2).await;

    let mut task_ids = Vec::new();
    for _ in 0..6 {
        task_ids.push(
            state
                .queue
                .submit(OWNER_ID, COURSE_ID, OUTCOME_ID)
                .await
                .unwrap(),
        );
    }

    for task_id in &task_ids {
        let status = wait_for_terminal(&state.tracker, task_id).await;
        assert_eq!(status.status, JobState::Completed, "{:?}", status.error);
    }

    assert_eq!(state.queue.running_count(), 0);
    assert_eq!(state.tracker.active_count().await, 0);
}
