// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    spawning   = { WorkerState::Spawning, true, false },
    running    = { WorkerState::Running, true, false },
    waiting    = { WorkerState::Waiting, true, false },
    completed  = { WorkerState::Completed, false, true },
    error      = { WorkerState::Error, false, true },
    terminated = { WorkerState::Terminated, false, true },
)]
fn state_classification(state: WorkerState, active: bool, terminal: bool) {
    assert_eq!(state.is_active(), active);
    assert_eq!(state.is_terminal(), terminal);
}

#[yare::parameterized(
    spawning   = { WorkerState::Spawning, "spawning" },
    running    = { WorkerState::Running, "running" },
    waiting    = { WorkerState::Waiting, "waiting" },
    completed  = { WorkerState::Completed, "completed" },
    error      = { WorkerState::Error, "error" },
    terminated = { WorkerState::Terminated, "terminated" },
)]
fn state_serde_matches_display(state: WorkerState, expected: &str) {
    assert_eq!(state.to_string(), expected);
    assert_eq!(serde_json::to_string(&state).unwrap(), format!("\"{}\"", expected));
}

#[yare::parameterized(
    healthy   = { HealthStatus::Healthy, "healthy" },
    idle      = { HealthStatus::Idle, "idle" },
    stalled   = { HealthStatus::Stalled, "stalled" },
    unhealthy = { HealthStatus::Unhealthy, "unhealthy" },
)]
fn health_serde_matches_display(health: HealthStatus, expected: &str) {
    assert_eq!(health.to_string(), expected);
    assert_eq!(serde_json::to_string(&health).unwrap(), format!("\"{}\"", expected));
}

fn sample_status() -> WorkerStatus {
    WorkerStatus {
        worker_id: WorkerId::new("worker_001"),
        state: WorkerState::Running,
        current_task: "build".to_string(),
        progress: 42,
        elapsed_secs: 10.0,
        output_lines: 120,
        confirmation_count: 2,
        last_activity: 1_000_010.0,
        health: HealthStatus::Healthy,
        memory_mb: None,
        cpu_percent: None,
        error_message: None,
        started_at: 1_000_000.0,
        completed_at: None,
    }
}

#[test]
fn status_serde_omits_absent_optionals() {
    let json = serde_json::to_string(&sample_status()).unwrap();
    assert!(!json.contains("memory_mb"));
    assert!(!json.contains("cpu_percent"));
    assert!(!json.contains("error_message"));
    assert!(!json.contains("completed_at"));
}

#[test]
fn status_serde_roundtrip() {
    let mut status = sample_status();
    status.state = WorkerState::Error;
    status.error_message = Some("exit code 2".to_string());
    status.completed_at = Some(1_000_020.0);

    let json = serde_json::to_string(&status).unwrap();
    let parsed: WorkerStatus = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, status);
    assert!(parsed.is_terminal());
}

#[test]
fn summary_default_has_no_average() {
    let summary = StatusSummary::default();
    assert_eq!(summary.total_workers, 0);
    assert_eq!(summary.avg_progress, None);
    let json = serde_json::to_string(&summary).unwrap();
    assert!(!json.contains("avg_progress"));
}
