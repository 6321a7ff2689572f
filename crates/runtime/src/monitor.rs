// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thread-safe worker status tracking.
//!
//! The monitor is the single authority for worker state, progress, and
//! health. Mutating operations refresh `last_activity`; `elapsed_secs`,
//! `progress`, and `health` are derived on read. Terminal states are
//! sticky: the first terminal transition wins and later mutations are
//! no-ops.

use fm_core::{Clock, HealthStatus, StatusSummary, SystemClock, WorkerId, WorkerState, WorkerStatus};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Seconds with no activity before a worker is considered idle.
const IDLE_THRESHOLD_SECS: f64 = 30.0;
/// Seconds with no activity before a worker is considered stalled.
const STALLED_THRESHOLD_SECS: f64 = 120.0;
/// Assumed output volume of a significant task, for the progress heuristic.
const PROGRESS_FULL_OUTPUT_LINES: f64 = 50.0;
/// Assumed confirmation count of a significant task.
const PROGRESS_FULL_CONFIRMATIONS: f64 = 5.0;
/// Assumed wall time of a significant task, in seconds.
const PROGRESS_FULL_ELAPSED_SECS: f64 = 300.0;

struct StatusEntry {
    state: WorkerState,
    current_task: String,
    progress: u8,
    output_lines: u64,
    confirmation_count: u64,
    last_activity: f64,
    started_at: f64,
    completed_at: Option<f64>,
    memory_mb: Option<f64>,
    cpu_percent: Option<f64>,
    error_message: Option<String>,
}

/// Central worker-status map, shared across sessions and observers.
pub struct StatusMonitor<C: Clock = SystemClock> {
    clock: C,
    entries: Mutex<HashMap<WorkerId, StatusEntry>>,
}

impl<C: Clock> StatusMonitor<C> {
    pub fn new(clock: C) -> Self {
        Self { clock, entries: Mutex::new(HashMap::new()) }
    }

    /// Register a new worker in `Spawning` state.
    pub fn register_worker(&self, worker_id: &WorkerId, task_name: &str) -> WorkerStatus {
        let now = self.clock.epoch_secs();
        let mut entries = self.entries.lock();
        let entry = entries.entry(worker_id.clone()).or_insert_with(|| StatusEntry {
            state: WorkerState::Spawning,
            current_task: task_name.to_string(),
            progress: 0,
            output_lines: 0,
            confirmation_count: 0,
            last_activity: now,
            started_at: now,
            completed_at: None,
            memory_mb: None,
            cpu_percent: None,
            error_message: None,
        });
        snapshot(worker_id, entry, now)
    }

    /// Transition worker state, optionally updating the task label or
    /// recording an error message. A second terminal transition is a no-op.
    pub fn update_state(
        &self,
        worker_id: &WorkerId,
        state: WorkerState,
        task: Option<&str>,
        error_message: Option<&str>,
    ) {
        let now = self.clock.epoch_secs();
        let mut entries = self.entries.lock();
        let Some(entry) = entries.get_mut(worker_id) else {
            drop(entries);
            self.register_worker(worker_id, task.unwrap_or("unknown task"));
            if state != WorkerState::Spawning {
                self.update_state(worker_id, state, task, error_message);
            }
            return;
        };
        if entry.state.is_terminal() {
            return;
        }

        entry.state = state;
        entry.last_activity = now;
        if let Some(task) = task {
            entry.current_task = task.to_string();
        }
        if let Some(message) = error_message {
            entry.error_message = Some(message.to_string());
        }
        if state.is_terminal() {
            entry.completed_at = Some(now);
            if state == WorkerState::Completed {
                entry.progress = 100;
            }
            // ERROR/TERMINATED freeze progress at the last observed value.
        } else {
            entry.progress = compute_progress(entry, now - entry.started_at);
        }
    }

    /// Record the total observed output line count.
    pub fn update_output_metrics(&self, worker_id: &WorkerId, output_lines: u64) {
        self.touch(worker_id, |entry| entry.output_lines = output_lines);
    }

    /// Record the total handled confirmation count.
    pub fn update_confirmation_count(&self, worker_id: &WorkerId, confirmation_count: u64) {
        self.touch(worker_id, |entry| entry.confirmation_count = confirmation_count);
    }

    /// Record process resource usage.
    pub fn update_performance(
        &self,
        worker_id: &WorkerId,
        memory_mb: Option<f64>,
        cpu_percent: Option<f64>,
    ) {
        self.touch(worker_id, |entry| {
            if memory_mb.is_some() {
                entry.memory_mb = memory_mb;
            }
            if cpu_percent.is_some() {
                entry.cpu_percent = cpu_percent;
            }
        });
    }

    /// Snapshot one worker.
    pub fn get(&self, worker_id: &WorkerId) -> Option<WorkerStatus> {
        let now = self.clock.epoch_secs();
        let mut entries = self.entries.lock();
        let entry = entries.get_mut(worker_id)?;
        refresh_progress(entry, now);
        Some(snapshot(worker_id, entry, now))
    }

    /// Snapshot all registered workers.
    pub fn get_all(&self) -> Vec<WorkerStatus> {
        let now = self.clock.epoch_secs();
        let mut entries = self.entries.lock();
        let mut statuses: Vec<WorkerStatus> = entries
            .iter_mut()
            .map(|(id, entry)| {
                refresh_progress(entry, now);
                snapshot(id, entry, now)
            })
            .collect();
        statuses.sort_by(|a, b| a.worker_id.as_str().cmp(b.worker_id.as_str()));
        statuses
    }

    /// Aggregate totals; the average is absent for an empty set.
    pub fn get_summary(&self) -> StatusSummary {
        let statuses = self.get_all();
        if statuses.is_empty() {
            return StatusSummary::default();
        }
        let total_workers = statuses.len();
        StatusSummary {
            total_workers,
            active_workers: statuses.iter().filter(|s| s.is_active()).count(),
            completed_workers: statuses
                .iter()
                .filter(|s| s.state == WorkerState::Completed)
                .count(),
            error_workers: statuses.iter().filter(|s| s.state == WorkerState::Error).count(),
            total_confirmations: statuses.iter().map(|s| s.confirmation_count).sum(),
            avg_progress: Some(round1(
                statuses.iter().map(|s| f64::from(s.progress)).sum::<f64>() / total_workers as f64,
            )),
        }
    }

    /// Remove a worker from monitoring. Returns whether it was present.
    pub fn remove(&self, worker_id: &WorkerId) -> bool {
        self.entries.lock().remove(worker_id).is_some()
    }

    fn touch(&self, worker_id: &WorkerId, update: impl FnOnce(&mut StatusEntry)) {
        let now = self.clock.epoch_secs();
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get_mut(worker_id) {
            if entry.state.is_terminal() {
                return;
            }
            update(entry);
            entry.last_activity = now;
            entry.progress = compute_progress(entry, now - entry.started_at);
        }
    }
}

fn refresh_progress(entry: &mut StatusEntry, now: f64) {
    if !entry.state.is_terminal() {
        entry.progress = compute_progress(entry, now - entry.started_at);
    }
}

fn snapshot(worker_id: &WorkerId, entry: &StatusEntry, now: f64) -> WorkerStatus {
    WorkerStatus {
        worker_id: worker_id.clone(),
        state: entry.state,
        current_task: entry.current_task.clone(),
        progress: entry.progress,
        elapsed_secs: (now - entry.started_at).max(0.0),
        output_lines: entry.output_lines,
        confirmation_count: entry.confirmation_count,
        last_activity: entry.last_activity,
        health: compute_health(entry, now),
        memory_mb: entry.memory_mb,
        cpu_percent: entry.cpu_percent,
        error_message: entry.error_message.clone(),
        started_at: entry.started_at,
        completed_at: entry.completed_at,
    }
}

/// Piecewise progress heuristic: output, confirmations, and elapsed time
/// each contribute a capped share; capped at 95 until completion.
fn compute_progress(entry: &StatusEntry, elapsed_secs: f64) -> u8 {
    match entry.state {
        WorkerState::Completed => return 100,
        WorkerState::Error | WorkerState::Terminated => return entry.progress,
        WorkerState::Spawning => return 5,
        WorkerState::Running | WorkerState::Waiting => {}
    }

    let mut progress = 10.0;
    progress += (entry.output_lines as f64 / PROGRESS_FULL_OUTPUT_LINES * 40.0).min(40.0);
    progress += (entry.confirmation_count as f64 / PROGRESS_FULL_CONFIRMATIONS * 30.0).min(30.0);
    progress += (elapsed_secs.max(0.0) / PROGRESS_FULL_ELAPSED_SECS * 20.0).min(20.0);
    progress.min(95.0) as u8
}

fn compute_health(entry: &StatusEntry, now: f64) -> HealthStatus {
    // Terminal states are healthy by definition.
    if entry.state.is_terminal() {
        return HealthStatus::Healthy;
    }
    let since_activity = now - entry.last_activity;
    if since_activity > STALLED_THRESHOLD_SECS {
        HealthStatus::Stalled
    } else if since_activity > IDLE_THRESHOLD_SECS {
        HealthStatus::Idle
    } else {
        HealthStatus::Healthy
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
