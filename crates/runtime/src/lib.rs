// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fm-runtime: worker sessions, the pool scheduler, transcripts, status
//! monitoring, and the in-process event bus.

pub mod batch;
pub mod config;
pub mod events;
pub mod monitor;
pub mod orchestrator;
pub mod pool;
pub mod session;
pub mod transcript;
pub mod workspace;

pub use batch::{BatchExecutor, BatchOutcome};
pub use config::{ConfigError, OrchestratorConfig};
pub use events::{spawn_heartbeat, EventPublisher, PublisherConfig};
pub use monitor::StatusMonitor;
pub use orchestrator::{BuildError, Orchestrator};
pub use pool::{PoolConfig, ProjectContext, WorkerPool};
pub use session::{InteractiveSession, SessionConfig, SessionDeps};
pub use transcript::TranscriptWriter;
pub use workspace::{WorkerWorkspace, WorkspaceError};
