// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn task_id_generate_has_prefix_and_length() {
    let id = TaskId::generate();
    assert!(id.as_str().starts_with("tsk-"));
    assert_eq!(id.as_str().len(), 23);
}

#[test]
fn task_id_generate_is_unique() {
    assert_ne!(TaskId::generate(), TaskId::generate());
}

#[test]
fn worker_task_builder_defaults() {
    let task = WorkerTask::builder().build();
    assert_eq!(task.id, "tsk-test");
    assert_eq!(task.name, "test task");
    assert!(task.dependencies.is_empty());
}

#[test]
fn worker_task_serde_omits_empty_dependencies() {
    let task = WorkerTask::new("t1", "build", "Build the module.");
    let json = serde_json::to_string(&task).unwrap();
    assert!(!json.contains("dependencies"));
    let parsed: WorkerTask = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, task);
}

#[test]
fn worker_task_serde_roundtrips_dependencies() {
    let mut task = WorkerTask::new("t2", "test", "Run tests.");
    task.dependencies.insert(TaskId::new("t1"));
    let json = serde_json::to_string(&task).unwrap();
    let parsed: WorkerTask = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.dependencies.len(), 1);
    assert!(parsed.dependencies.contains("t1"));
}

#[test]
fn task_result_failed_helper() {
    let result = TaskResult::failed(WorkerId::new("worker_001"), "build", "spawn failed");
    assert!(!result.success);
    assert_eq!(result.duration_secs, 0.0);
    assert_eq!(result.error_message.as_deref(), Some("spawn failed"));
    assert!(result.output.is_empty());
}

#[test]
fn task_result_serde_omits_absent_error() {
    let result = TaskResult {
        worker_id: WorkerId::new("worker_001"),
        name: "build".to_string(),
        output: "done".to_string(),
        success: true,
        duration_secs: 1.5,
        error_message: None,
    };
    let json = serde_json::to_string(&result).unwrap();
    assert!(!json.contains("error_message"));
}
