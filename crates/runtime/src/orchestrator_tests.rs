// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg(unix)]

use super::*;
use fm_engine::FakeOracle;

fn config(root: &std::path::Path) -> OrchestratorConfig {
    let mut config = OrchestratorConfig::default()
        .workspace_root(root)
        .worker_program("sh")
        .worker_args(vec!["-c".to_string(), ". '{task_file}'".to_string()])
        .max_workers(2);
    // Wide open so tests observe every event.
    config.event_rate_per_sec = 100_000.0;
    config.event_burst = 100_000.0;
    config
}

#[tokio::test]
async fn runs_a_batch_and_reports_summary() {
    let root = tempfile::tempdir().unwrap();
    let orchestrator = Orchestrator::with_oracle(
        config(root.path()),
        Arc::new(FakeOracle::approving()),
        SystemClock,
    )
    .unwrap();

    let results = orchestrator
        .run(vec![
            WorkerTask::new("t1", "first", "echo alpha"),
            WorkerTask::new("t2", "second", "echo beta"),
        ])
        .await;

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.success));

    let summary = orchestrator.summary();
    assert_eq!(summary.total_workers, 2);
    assert_eq!(summary.completed_workers, 2);
    assert_eq!(orchestrator.engine_stats().total_decisions(), 0);
}

#[tokio::test]
async fn event_stream_sees_status_transitions() {
    let root = tempfile::tempdir().unwrap();
    let orchestrator = Orchestrator::with_oracle(
        config(root.path()),
        Arc::new(FakeOracle::approving()),
        SystemClock,
    )
    .unwrap();
    let mut events = orchestrator.subscribe();

    orchestrator.run(vec![WorkerTask::new("t1", "only", "echo hi")]).await;

    let mut saw_completed = false;
    while let Ok(event) = events.try_recv() {
        if let Event::Status { state, .. } = event {
            if state == fm_core::WorkerState::Completed {
                saw_completed = true;
            }
        }
    }
    assert!(saw_completed);
}

#[tokio::test]
async fn shutdown_cancels_in_flight_work() {
    let root = tempfile::tempdir().unwrap();
    let orchestrator = Arc::new(
        Orchestrator::with_oracle(
            config(root.path()),
            Arc::new(FakeOracle::approving()),
            SystemClock,
        )
        .unwrap(),
    );

    let runner = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            orchestrator.run(vec![WorkerTask::new("t1", "sleeper", "sleep 60")]).await
        })
    };
    tokio::time::sleep(std::time::Duration::from_millis(400)).await;
    orchestrator.shutdown();

    let results = runner.await.unwrap();
    assert_eq!(results.len(), 1);
    assert!(!results[0].success);
}

#[test]
fn workspace_root_creation_failure_is_a_build_error() {
    let root = tempfile::tempdir().unwrap();
    let blocker = root.path().join("blocked");
    std::fs::write(&blocker, "file").unwrap();

    let err = Orchestrator::with_oracle(
        OrchestratorConfig::default().workspace_root(blocker.join("nested")),
        Arc::new(FakeOracle::approving()),
        SystemClock,
    )
    .err()
    .unwrap();
    assert!(matches!(err, BuildError::WorkspaceRoot { .. }));
}
