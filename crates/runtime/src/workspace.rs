// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-worker workspace preparation.
//!
//! Each worker gets its own directory under the orchestrator's workspace
//! root, holding the task prompt and every artifact the session writes.
//! Recorded paths are always absolute.

use fm_core::WorkerId;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The task prompt file name inside a worker workspace.
pub const TASK_FILE: &str = "task.txt";

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("failed to create workspace at {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// An initialized worker workspace directory.
#[derive(Debug, Clone)]
pub struct WorkerWorkspace {
    dir: PathBuf,
}

impl WorkerWorkspace {
    /// Create `<root>/<worker_id>/`, write the task prompt, and return the
    /// absolute workspace handle.
    pub fn prepare(
        root: &Path,
        worker_id: &WorkerId,
        prompt: &str,
    ) -> Result<Self, WorkspaceError> {
        let dir = root.join(worker_id.as_str());
        std::fs::create_dir_all(&dir)
            .map_err(|source| WorkspaceError::Create { path: dir.clone(), source })?;
        let dir = dir
            .canonicalize()
            .map_err(|source| WorkspaceError::Create { path: dir.clone(), source })?;

        let task_file = dir.join(TASK_FILE);
        std::fs::write(&task_file, prompt)
            .map_err(|source| WorkspaceError::Write { path: task_file.clone(), source })?;

        Ok(Self { dir })
    }

    /// Absolute workspace directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Absolute path of the task prompt file.
    pub fn task_file(&self) -> PathBuf {
        self.dir.join(TASK_FILE)
    }
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
