// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn worker_id_display_and_as_str() {
    let id = WorkerId::new("worker_001");
    assert_eq!(format!("{}", id), "worker_001");
    assert_eq!(id.as_str(), "worker_001");
}

#[yare::parameterized(
    first  = { 1, "worker_001" },
    tenth  = { 10, "worker_010" },
    large  = { 1234, "worker_1234" },
)]
fn worker_id_for_index(index: usize, expected: &str) {
    assert_eq!(WorkerId::for_index(index), expected);
}

#[test]
fn worker_id_from_conversions() {
    let a: WorkerId = "w".into();
    let b: WorkerId = String::from("w").into();
    assert_eq!(a, b);
    assert_eq!(a, *"w");
}

#[test]
fn worker_id_serde_is_transparent() {
    let id = WorkerId::new("worker_007");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"worker_007\"");
    let parsed: WorkerId = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, id);
}
