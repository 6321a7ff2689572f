// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator configuration.
//!
//! Everything has a sensible default; a TOML file overrides selectively.
//! Durations are expressed in seconds to keep the file format flat.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OrchestratorConfig {
    /// Root directory that holds one subdirectory per worker.
    pub workspace_root: PathBuf,
    pub max_workers: usize,
    /// Worker CLI invocation; `{task_file}` and `{workspace}` placeholders
    /// are substituted per worker.
    pub worker_program: String,
    pub worker_args: Vec<String>,
    /// Arbiter CLI invocation; `{system_prompt}` placeholder substituted
    /// per request, question delivered on stdin.
    pub arbiter_program: String,
    pub arbiter_args: Vec<String>,
    pub arbiter_timeout_secs: u64,
    pub project_name: String,
    pub project_goal: String,
    pub max_iterations: usize,
    pub expect_timeout_secs: u64,
    pub session_timeout_secs: u64,
    pub pool_timeout_secs: u64,
    pub close_grace_secs: u64,
    pub heartbeat_secs: u64,
    pub event_rate_per_sec: f64,
    pub event_burst: f64,
    pub event_buffer: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            workspace_root: PathBuf::from("workspace"),
            max_workers: 4,
            worker_program: "sh".to_string(),
            worker_args: vec!["-c".to_string(), "claude --print < '{task_file}'".to_string()],
            arbiter_program: "claude".to_string(),
            arbiter_args: vec![
                "--print".to_string(),
                "--system-prompt".to_string(),
                "{system_prompt}".to_string(),
            ],
            arbiter_timeout_secs: 60,
            project_name: "unnamed project".to_string(),
            project_goal: "complete the submitted tasks".to_string(),
            max_iterations: 75,
            expect_timeout_secs: 3,
            session_timeout_secs: 900,
            pool_timeout_secs: 1800,
            close_grace_secs: 5,
            heartbeat_secs: 15,
            event_rate_per_sec: 15.0,
            event_burst: 8.0,
            event_buffer: 256,
        }
    }
}

impl OrchestratorConfig {
    /// Load a TOML config file; absent keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        toml::from_str(&contents)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    pub fn arbiter_timeout(&self) -> Duration {
        Duration::from_secs(self.arbiter_timeout_secs)
    }

    pub fn expect_timeout(&self) -> Duration {
        Duration::from_secs(self.expect_timeout_secs)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_secs(self.session_timeout_secs)
    }

    pub fn pool_timeout(&self) -> Duration {
        Duration::from_secs(self.pool_timeout_secs)
    }

    pub fn close_grace(&self) -> Duration {
        Duration::from_secs(self.close_grace_secs)
    }

    pub fn heartbeat(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs)
    }

    fm_core::setters! {
        into {
            workspace_root: PathBuf,
            worker_program: String,
            project_name: String,
            project_goal: String,
        }
        set {
            max_workers: usize,
            worker_args: Vec<String>,
            session_timeout_secs: u64,
            pool_timeout_secs: u64,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
