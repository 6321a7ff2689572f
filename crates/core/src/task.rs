// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task types: the unit of work submitted to the pool and its outcome.

use crate::worker::WorkerId;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;

/// Unique identifier for a subtask.
///
/// Task decomposition supplies stable ids; `generate` covers tasks loaded
/// from files that omit one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(pub String);

impl TaskId {
    /// Create a new TaskId from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a random TaskId, e.g. `tsk-V1StGXR8_Z5jdHi6B-myT`.
    pub fn generate() -> Self {
        Self(format!("tsk-{}", nanoid::nanoid!(19)))
    }

    /// Get the string value of this TaskId.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl PartialEq<&str> for TaskId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl From<String> for TaskId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl PartialEq<str> for TaskId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl Borrow<str> for TaskId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// One subtask produced by decomposition. Immutable after submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerTask {
    pub id: TaskId,
    pub name: String,
    pub prompt: String,
    /// Tasks that must reach a terminal state before this one starts.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub dependencies: BTreeSet<TaskId>,
}

impl WorkerTask {
    pub fn new(id: impl Into<TaskId>, name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            prompt: prompt.into(),
            dependencies: BTreeSet::new(),
        }
    }
}

crate::builder! {
    pub struct WorkerTaskBuilder => WorkerTask {
        into {
            id: TaskId = "tsk-test",
            name: String = "test task",
            prompt: String = "Do the thing.",
        }
        set {
            dependencies: BTreeSet<TaskId> = BTreeSet::new(),
        }
    }
}

/// Outcome of one worker's run. Immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub worker_id: WorkerId,
    pub name: String,
    pub output: String,
    pub success: bool,
    pub duration_secs: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl TaskResult {
    /// A failure result that never ran a worker (spawn/workspace errors,
    /// pool-level termination).
    pub fn failed(
        worker_id: WorkerId,
        name: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            worker_id,
            name: name.into(),
            output: String::new(),
            success: false,
            duration_secs: 0.0,
            error_message: Some(error_message.into()),
        }
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
