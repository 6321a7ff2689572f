// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded parallel scheduler for worker sessions.
//!
//! Runs up to `max_workers` sessions at once, gates tasks on their declared
//! dependencies (a dependency is satisfied once its session reaches any
//! terminal state), and returns results in submission order regardless of
//! completion order. On pool timeout the cancel signal propagates to every
//! session; unfinished workers come back as TERMINATED with partial
//! transcripts already on disk.

use crate::session::{InteractiveSession, SessionConfig, SessionDeps};
use fm_core::{Clock, TaskId, TaskResult, WorkerId, WorkerState, WorkerTask};
use fm_engine::ArbiterContext;
use fm_term::WorkerCommand;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Pool-level limits.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum concurrently running sessions.
    pub max_workers: usize,
    /// Wall-clock budget for one `submit` call.
    pub pool_timeout: Duration,
    pub session: SessionConfig,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            pool_timeout: Duration::from_secs(1800),
            session: SessionConfig::default(),
        }
    }
}

/// Project context shared by every session of a submission.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    pub name: String,
    pub goal: String,
}

impl Default for ProjectContext {
    fn default() -> Self {
        Self {
            name: "unnamed project".to_string(),
            goal: "complete the submitted tasks".to_string(),
        }
    }
}

struct DependencyBoard {
    done: parking_lot::Mutex<HashSet<TaskId>>,
    changed: Notify,
}

impl DependencyBoard {
    fn new() -> Self {
        Self { done: parking_lot::Mutex::new(HashSet::new()), changed: Notify::new() }
    }

    fn mark_done(&self, id: TaskId) {
        self.done.lock().insert(id);
        self.changed.notify_waiters();
    }

    fn all_done(&self, wanted: &HashSet<TaskId>) -> bool {
        let done = self.done.lock();
        wanted.iter().all(|id| done.contains(id))
    }

    /// Wait until every id in `wanted` is terminal, or the token fires.
    async fn wait_for(&self, wanted: &HashSet<TaskId>, cancel: &CancellationToken) {
        loop {
            if wanted.is_empty() || self.all_done(wanted) {
                return;
            }
            let notified = self.changed.notified();
            if self.all_done(wanted) {
                return;
            }
            tokio::select! {
                () = cancel.cancelled() => return,
                () = notified => {}
            }
        }
    }
}

/// Parallel session scheduler.
pub struct WorkerPool<C: Clock> {
    deps: SessionDeps<C>,
    config: PoolConfig,
    workspace_root: PathBuf,
    command: WorkerCommand,
    project: ProjectContext,
}

impl<C: Clock> WorkerPool<C> {
    pub fn new(
        deps: SessionDeps<C>,
        config: PoolConfig,
        workspace_root: impl Into<PathBuf>,
        command: WorkerCommand,
        project: ProjectContext,
    ) -> Self {
        Self { deps, config, workspace_root: workspace_root.into(), command, project }
    }

    /// Run every task to completion (or pool timeout) and return results in
    /// submission order. The returned cancel token can be used for external
    /// cancellation via [`WorkerPool::submit_with_cancel`].
    pub async fn submit(&self, tasks: Vec<WorkerTask>) -> Vec<TaskResult> {
        self.submit_with_cancel(tasks, CancellationToken::new()).await
    }

    /// As [`WorkerPool::submit`], with an externally controlled cancel signal.
    pub async fn submit_with_cancel(
        &self,
        tasks: Vec<WorkerTask>,
        cancel: CancellationToken,
    ) -> Vec<TaskResult> {
        if tasks.is_empty() {
            return Vec::new();
        }
        let total = tasks.len();
        info!(
            workers = total,
            max_concurrent = self.config.max_workers,
            timeout_secs = self.config.pool_timeout.as_secs(),
            "starting parallel execution"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_workers.max(1)));
        let board = Arc::new(DependencyBoard::new());
        let batch_ids: HashSet<TaskId> = tasks.iter().map(|t| t.id.clone()).collect();

        let mut join_set: JoinSet<(usize, TaskResult)> = JoinSet::new();
        let mut names: Vec<(WorkerId, String)> = Vec::with_capacity(total);

        for (index, task) in tasks.into_iter().enumerate() {
            let worker_id = WorkerId::for_index(index + 1);
            names.push((worker_id.clone(), task.name.clone()));

            // Dependencies outside this submission are treated as satisfied.
            let wanted: HashSet<TaskId> =
                task.dependencies.iter().filter(|d| batch_ids.contains(*d)).cloned().collect();

            let deps = self.deps.clone();
            let config = self.config.session.clone();
            let workspace_root = self.workspace_root.clone();
            let command = self.command.clone();
            let cancel = cancel.clone();
            let semaphore = semaphore.clone();
            let board = board.clone();
            let ctx = ArbiterContext::new(worker_id.clone(), task.name.clone())
                .project_name(self.project.name.clone())
                .project_goal(self.project.goal.clone());

            join_set.spawn(async move {
                board.wait_for(&wanted, &cancel).await;
                let task_id = task.id.clone();
                let result = if cancel.is_cancelled() {
                    cancelled_result(&deps, &worker_id, &task.name)
                } else {
                    match semaphore.acquire_owned().await {
                        Ok(_permit) => {
                            let session = InteractiveSession::new(
                                worker_id,
                                task,
                                config,
                                deps,
                                ctx,
                            );
                            session.run(&workspace_root, &command, cancel).await
                        }
                        Err(_) => cancelled_result(&deps, &worker_id, &task.name),
                    }
                };
                board.mark_done(task_id);
                (index, result)
            });
        }

        let mut slots: Vec<Option<TaskResult>> = (0..total).map(|_| None).collect();
        let mut finished = 0usize;
        let timeout = tokio::time::sleep(self.config.pool_timeout);
        tokio::pin!(timeout);

        while finished < total {
            tokio::select! {
                joined = join_set.join_next() => {
                    match joined {
                        Some(Ok((index, result))) => {
                            finished += 1;
                            info!(
                                worker_id = %result.worker_id,
                                success = result.success,
                                finished,
                                total,
                                "worker finished"
                            );
                            slots[index] = Some(result);
                        }
                        Some(Err(e)) => {
                            warn!(error = %e, "session task failed to join");
                            finished += 1;
                        }
                        None => break,
                    }
                }
                () = &mut timeout => {
                    warn!(finished, total, "pool timeout reached, cancelling remaining workers");
                    cancel.cancel();
                    break;
                }
            }
        }

        // After a timeout, give cancelled sessions a moment to close their
        // PTYs and persist partial transcripts, then collect their results.
        if finished < total {
            let drain = tokio::time::timeout(Duration::from_secs(10), async {
                while let Some(joined) = join_set.join_next().await {
                    if let Ok((index, result)) = joined {
                        slots[index] = Some(result);
                    }
                }
            });
            let _ = drain.await;
            join_set.abort_all();
        }

        // Fill any hole with a TERMINATED placeholder so the result list
        // always matches the submission order and length.
        let mut results = Vec::with_capacity(total);
        for (index, slot) in slots.into_iter().enumerate() {
            results.push(slot.unwrap_or_else(|| {
                let (worker_id, name) = names[index].clone();
                terminated_result(&self.deps, &worker_id, &name)
            }));
        }

        let succeeded = results.iter().filter(|r| r.success).count();
        info!(total, succeeded, "parallel execution complete");
        results
    }
}

fn cancelled_result<C: Clock>(
    deps: &SessionDeps<C>,
    worker_id: &WorkerId,
    name: &str,
) -> TaskResult {
    deps.monitor.register_worker(worker_id, name);
    deps.monitor.update_state(worker_id, WorkerState::Terminated, None, Some("cancelled"));
    TaskResult::failed(worker_id.clone(), name, "cancelled")
}

fn terminated_result<C: Clock>(
    deps: &SessionDeps<C>,
    worker_id: &WorkerId,
    name: &str,
) -> TaskResult {
    deps.monitor.update_state(worker_id, WorkerState::Terminated, None, Some("pool timeout"));
    TaskResult::failed(worker_id.clone(), name, "pool timeout")
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
