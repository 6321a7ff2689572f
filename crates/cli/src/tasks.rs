// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task file loading.
//!
//! ```toml
//! [[task]]
//! id = "t1"              # optional, generated when omitted
//! name = "build parser"
//! prompt = "Implement the parser described in docs/parser.md"
//! depends_on = []        # optional, ids of tasks in this file
//! ```

use anyhow::Context;
use fm_core::{TaskId, WorkerTask};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct TaskFile {
    #[serde(default)]
    task: Vec<TaskEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TaskEntry {
    id: Option<String>,
    name: String,
    prompt: String,
    #[serde(default)]
    depends_on: Vec<String>,
}

/// Load and validate a task file.
pub fn load(path: &Path) -> anyhow::Result<Vec<WorkerTask>> {
    let contents = std::fs::read_to_string(path)?;
    let file: TaskFile = toml::from_str(&contents).context("parsing task file")?;

    let mut tasks = Vec::with_capacity(file.task.len());
    for entry in file.task {
        anyhow::ensure!(!entry.name.trim().is_empty(), "task with empty name");
        anyhow::ensure!(!entry.prompt.trim().is_empty(), "task {:?} has an empty prompt", entry.name);
        let id = entry.id.map(TaskId::new).unwrap_or_else(TaskId::generate);
        let mut task = WorkerTask::new(id, entry.name, entry.prompt);
        task.dependencies = entry.depends_on.into_iter().map(TaskId::new).collect();
        tasks.push(task);
    }

    // Dependencies must refer to ids declared in the same file.
    let ids: std::collections::BTreeSet<&TaskId> = tasks.iter().map(|t| &t.id).collect();
    for task in &tasks {
        for dep in &task.dependencies {
            anyhow::ensure!(
                ids.contains(dep),
                "task {:?} depends on unknown task {dep}",
                task.name
            );
        }
    }
    Ok(tasks)
}

#[cfg(test)]
#[path = "tasks_tests.rs"]
mod tests;
