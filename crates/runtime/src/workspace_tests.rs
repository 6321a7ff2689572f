// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn prepare_creates_dir_and_task_file() {
    let root = tempfile::tempdir().unwrap();
    let worker_id = WorkerId::new("worker_001");

    let ws = WorkerWorkspace::prepare(root.path(), &worker_id, "Build the parser.").unwrap();

    assert!(ws.dir().is_absolute());
    assert!(ws.dir().ends_with("worker_001"));
    let prompt = std::fs::read_to_string(ws.task_file()).unwrap();
    assert_eq!(prompt, "Build the parser.");
}

#[test]
fn prepare_is_idempotent() {
    let root = tempfile::tempdir().unwrap();
    let worker_id = WorkerId::new("worker_002");

    WorkerWorkspace::prepare(root.path(), &worker_id, "first").unwrap();
    let ws = WorkerWorkspace::prepare(root.path(), &worker_id, "second").unwrap();

    assert_eq!(std::fs::read_to_string(ws.task_file()).unwrap(), "second");
}

#[test]
fn prepare_fails_when_root_is_a_file() {
    let root = tempfile::tempdir().unwrap();
    let blocker = root.path().join("blocked");
    std::fs::write(&blocker, "not a dir").unwrap();

    let err = WorkerWorkspace::prepare(&blocker, &WorkerId::new("worker_003"), "x").unwrap_err();
    assert!(matches!(err, WorkspaceError::Create { .. }));
}
