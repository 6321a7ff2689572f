// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Top-level assembly.
//!
//! Builds the monitor, event bus, detector, and decision engine once per
//! orchestrator instance and wires them into a worker pool. Collaborators
//! are constructor-scoped: no globals, torn down when the orchestrator is
//! dropped.

use crate::config::OrchestratorConfig;
use crate::events::{spawn_heartbeat, EventPublisher, PublisherConfig};
use crate::monitor::StatusMonitor;
use crate::pool::{PoolConfig, ProjectContext, WorkerPool};
use crate::session::{SessionConfig, SessionDeps};
use fm_core::{Clock, Event, StatusSummary, SystemClock, TaskResult, WorkerTask};
use fm_engine::{
    ArbiterClient, CommandOracle, ConfirmationDetector, EngineStats, HybridEngine, Oracle,
    RuleEngine,
};
use fm_term::WorkerCommand;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to create workspace root {path}: {source}")]
    WorkspaceRoot {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid pattern table: {0}")]
    Patterns(#[from] regex::Error),
}

/// One orchestrator instance: shared services plus a pool.
pub struct Orchestrator<C: Clock = SystemClock> {
    deps: SessionDeps<C>,
    pool: WorkerPool<C>,
    config: OrchestratorConfig,
    shutdown: CancellationToken,
    heartbeat: Option<tokio::task::JoinHandle<()>>,
}

impl Orchestrator<SystemClock> {
    /// Build with the configured command-line arbiter oracle.
    pub fn from_config(config: OrchestratorConfig) -> Result<Self, BuildError> {
        let oracle = Arc::new(CommandOracle::new(
            config.arbiter_program.clone(),
            config.arbiter_args.clone(),
        ));
        Self::with_oracle(config, oracle, SystemClock)
    }
}

impl<C: Clock> Orchestrator<C> {
    /// Build with an explicit oracle implementation (tests, embedding).
    pub fn with_oracle(
        config: OrchestratorConfig,
        oracle: Arc<dyn Oracle>,
        clock: C,
    ) -> Result<Self, BuildError> {
        std::fs::create_dir_all(&config.workspace_root).map_err(|source| {
            BuildError::WorkspaceRoot { path: config.workspace_root.clone(), source }
        })?;

        let arbiter = ArbiterClient::new(oracle, config.arbiter_timeout())?;
        let deps = SessionDeps {
            monitor: Arc::new(StatusMonitor::new(clock.clone())),
            publisher: Arc::new(EventPublisher::new(
                clock.clone(),
                PublisherConfig {
                    rate_per_sec: config.event_rate_per_sec,
                    burst: config.event_burst,
                    buffer: config.event_buffer,
                },
            )),
            engine: Arc::new(HybridEngine::new(
                RuleEngine::new(&config.workspace_root),
                arbiter,
                clock.clone(),
            )),
            detector: Arc::new(ConfirmationDetector::new()?),
            clock,
        };

        let command = WorkerCommand::new(config.worker_program.clone())
            .args(config.worker_args.iter().cloned());
        let pool = WorkerPool::new(
            deps.clone(),
            PoolConfig {
                max_workers: config.max_workers,
                pool_timeout: config.pool_timeout(),
                session: SessionConfig {
                    max_iterations: config.max_iterations,
                    expect_timeout: config.expect_timeout(),
                    session_timeout: config.session_timeout(),
                    close_grace: config.close_grace(),
                },
            },
            config.workspace_root.clone(),
            command,
            ProjectContext { name: config.project_name.clone(), goal: config.project_goal.clone() },
        );

        Ok(Self { deps, pool, config, shutdown: CancellationToken::new(), heartbeat: None })
    }

    /// Start the idle-heartbeat task. Requires a tokio runtime.
    pub fn start_heartbeat(&mut self) {
        if self.heartbeat.is_none() {
            self.heartbeat = Some(spawn_heartbeat(
                self.deps.publisher.clone(),
                self.config.heartbeat(),
                self.shutdown.clone(),
            ));
        }
    }

    /// Run a batch of tasks to completion.
    pub async fn run(&self, tasks: Vec<WorkerTask>) -> Vec<TaskResult> {
        self.pool.submit_with_cancel(tasks, self.shutdown.child_token()).await
    }

    /// Subscribe to the event stream (depth filter wide open).
    pub fn subscribe(&self) -> mpsc::Receiver<Event> {
        self.deps.publisher.subscribe_all()
    }

    /// Current aggregate worker status.
    pub fn summary(&self) -> StatusSummary {
        self.deps.monitor.get_summary()
    }

    /// Cumulative decision-engine counters.
    pub fn engine_stats(&self) -> EngineStats {
        self.deps.engine.stats()
    }

    /// Cancel all in-flight work and stop the heartbeat.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl<C: Clock> Drop for Orchestrator<C> {
    fn drop(&mut self) {
        self.shutdown.cancel();
        if let Some(handle) = self.heartbeat.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
