// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker state, health, and the status snapshot served to observers.

use crate::worker::WorkerId;
use serde::{Deserialize, Serialize};

/// Worker execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Worker process is being created
    Spawning,
    /// Worker is actively executing
    Running,
    /// Worker is waiting for an orchestrator response
    Waiting,
    /// Worker finished successfully
    Completed,
    /// Worker encountered an error
    Error,
    /// Worker was forcefully stopped
    Terminated,
}

crate::simple_display! {
    WorkerState {
        Spawning => "spawning",
        Running => "running",
        Waiting => "waiting",
        Completed => "completed",
        Error => "error",
        Terminated => "terminated",
    }
}

impl WorkerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkerState::Completed | WorkerState::Error | WorkerState::Terminated)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, WorkerState::Spawning | WorkerState::Running | WorkerState::Waiting)
    }
}

/// Worker health, derived from activity timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Normal operation
    Healthy,
    /// No activity for a moderate duration
    Idle,
    /// No activity for an extended duration
    Stalled,
    /// Critical issue detected
    Unhealthy,
}

crate::simple_display! {
    HealthStatus {
        Healthy => "healthy",
        Idle => "idle",
        Stalled => "stalled",
        Unhealthy => "unhealthy",
    }
}

/// Point-in-time status snapshot for one worker.
///
/// `elapsed_secs`, `progress`, and `health` are derived at read time by the
/// status monitor; everything else is recorded state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerStatus {
    pub worker_id: WorkerId,
    pub state: WorkerState,
    pub current_task: String,
    /// 0–100 heuristic
    pub progress: u8,
    pub elapsed_secs: f64,
    pub output_lines: u64,
    pub confirmation_count: u64,
    /// Epoch seconds of the last observed activity
    pub last_activity: f64,
    pub health: HealthStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_mb: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub started_at: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<f64>,
}

impl WorkerStatus {
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// Aggregate view across all registered workers.
///
/// Totals are always present (zero-valued for an empty set); the average is
/// absent when no workers are registered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub total_workers: usize,
    pub active_workers: usize,
    pub completed_workers: usize,
    pub error_workers: usize,
    pub total_confirmations: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_progress: Option<f64>,
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
