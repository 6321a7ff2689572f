// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interactive worker session.
//!
//! Drives one worker through its whole life: workspace prep → spawn →
//! loop(poll, detect, decide, respond) → reap. The loop is bounded by an
//! iteration cap and a wall-clock deadline; every observed byte lands in
//! the raw terminal log before any dialogue record that references it.

use crate::events::EventPublisher;
use crate::monitor::StatusMonitor;
use crate::transcript::TranscriptWriter;
use crate::workspace::WorkerWorkspace;
use fm_core::{
    Clock, DecisionRecord, DialogueEntry, Event, TaskResult, WorkerId, WorkerState, WorkerTask,
};
use fm_engine::{ArbiterContext, ConfirmationDetector, HybridEngine};
use fm_term::{strip_ansi, ExpectOutcome, PtySession, WorkerCommand};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// In-band completion phrases, consulted only when the exit code is unknown.
const COMPLETION_MARKERS: &[&str] = &["completed", "done", "success", "finished"];

/// Placeholder in command args replaced with the workspace task file path.
const TASK_FILE_PLACEHOLDER: &str = "{task_file}";
/// Placeholder in command args replaced with the workspace directory path.
const WORKSPACE_PLACEHOLDER: &str = "{workspace}";

/// Loop bounds and timeouts for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Maximum poll/confirm rounds before the session reaps the worker.
    pub max_iterations: usize,
    /// Upper bound for each pattern wait.
    pub expect_timeout: Duration,
    /// Absolute wall-clock budget for the session.
    pub session_timeout: Duration,
    /// Grace period between SIGTERM and SIGKILL on a normal close.
    pub close_grace: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_iterations: 75,
            expect_timeout: Duration::from_secs(3),
            session_timeout: Duration::from_secs(900),
            close_grace: Duration::from_secs(5),
        }
    }
}

/// Shared collaborators, created once per orchestrator and injected.
pub struct SessionDeps<C: Clock> {
    pub monitor: Arc<StatusMonitor<C>>,
    pub publisher: Arc<EventPublisher<C>>,
    pub engine: Arc<HybridEngine<C>>,
    pub detector: Arc<ConfirmationDetector>,
    pub clock: C,
}

impl<C: Clock> Clone for SessionDeps<C> {
    fn clone(&self) -> Self {
        Self {
            monitor: self.monitor.clone(),
            publisher: self.publisher.clone(),
            engine: self.engine.clone(),
            detector: self.detector.clone(),
            clock: self.clock.clone(),
        }
    }
}

enum LoopEnd {
    Eof,
    IterationCap,
    Cancelled,
    TimedOut,
    ArbiterFatal(String),
}

/// One worker, from spawn to terminal state.
pub struct InteractiveSession<C: Clock> {
    worker_id: WorkerId,
    task: WorkerTask,
    config: SessionConfig,
    deps: SessionDeps<C>,
    ctx: ArbiterContext,
}

impl<C: Clock> InteractiveSession<C> {
    pub fn new(
        worker_id: WorkerId,
        task: WorkerTask,
        config: SessionConfig,
        deps: SessionDeps<C>,
        ctx: ArbiterContext,
    ) -> Self {
        Self { worker_id, task, config, deps, ctx }
    }

    /// Run the worker to a terminal state. Always returns a result and
    /// always leaves transcripts persisted up to the point of failure.
    pub async fn run(
        self,
        workspace_root: &Path,
        command_template: &WorkerCommand,
        cancel: CancellationToken,
    ) -> TaskResult {
        let started = self.deps.clock.now();
        self.deps.monitor.register_worker(&self.worker_id, &self.task.name);
        self.publish_status();
        info!(worker_id = %self.worker_id, task = %self.task.name, "spawning worker");

        let workspace =
            match WorkerWorkspace::prepare(workspace_root, &self.worker_id, &self.task.prompt) {
                Ok(ws) => ws,
                Err(e) => return self.fail_early(format!("workspace setup failed: {e}")),
            };
        let mut transcript =
            TranscriptWriter::new(workspace.dir(), &self.worker_id, &self.task.name);

        let command = resolve_command(command_template, &workspace);
        let mut pty = match PtySession::spawn(&command) {
            Ok(pty) => pty,
            Err(e) => {
                transcript.log_orchestrator("ERROR", &format!("spawn failed: {e}"));
                return self.fail_early(format!("spawn failed: {e}"));
            }
        };
        transcript.log_orchestrator("OK", "worker spawned");
        self.set_state(WorkerState::Running, None);

        let mut output = String::new();
        let mut output_lines: u64 = 0;
        let mut confirmations: u64 = 0;
        let deadline = started + self.config.session_timeout;
        let mut end = LoopEnd::IterationCap;

        'main: for _ in 0..self.config.max_iterations {
            if cancel.is_cancelled() {
                end = LoopEnd::Cancelled;
                break;
            }
            // Continuous poll: drain output produced since the last round.
            self.persist_output(&mut transcript, &mut pty, &mut output, &mut output_lines);

            let Some(remaining) = deadline.checked_duration_since(self.deps.clock.now()) else {
                end = LoopEnd::TimedOut;
                break;
            };
            let wait = self.config.expect_timeout.min(remaining);

            let outcome = tokio::select! {
                () = cancel.cancelled() => {
                    end = LoopEnd::Cancelled;
                    break 'main;
                }
                outcome = pty.expect(self.deps.detector.patterns(), wait) => outcome,
            };

            match outcome {
                ExpectOutcome::TimedOut => {
                    transcript.log_orchestrator("POLL", "no new output");
                }
                ExpectOutcome::Eof => {
                    transcript.log_orchestrator("COMPLETE", "worker finished (EOF)");
                    end = LoopEnd::Eof;
                    break;
                }
                ExpectOutcome::Matched { index, prefix, matched } => {
                    // Raw log first, then the dialogue record (the raw
                    // capture must already contain what the record cites).
                    self.persist_output(&mut transcript, &mut pty, &mut output, &mut output_lines);

                    let clean_prefix = strip_ansi(&prefix);
                    if !clean_prefix.is_empty() {
                        let entry = DialogueEntry::output(
                            self.deps.clock.epoch_secs(),
                            clean_prefix.clone(),
                        );
                        transcript.append_dialogue(&entry);
                        transcript.log_orchestrator("OUTPUT", clean_prefix.trim());
                        self.deps.publisher.publish(Event::Dialogue {
                            worker_id: self.worker_id.clone(),
                            entry,
                        });
                    }

                    let clean_matched = strip_ansi(&matched);
                    let request =
                        self.deps.detector.classify(&self.worker_id, index, &clean_matched);
                    confirmations += 1;
                    self.deps.monitor.update_confirmation_count(&self.worker_id, confirmations);
                    self.set_state(WorkerState::Waiting, None);
                    info!(
                        worker_id = %self.worker_id,
                        kind = %request.kind,
                        seq = confirmations,
                        "confirmation detected"
                    );

                    let decided = tokio::select! {
                        () = cancel.cancelled() => {
                            end = LoopEnd::Cancelled;
                            break 'main;
                        }
                        decided = self.deps.engine.decide(&request, &self.ctx) => decided,
                    };

                    let decision = match decided {
                        Ok(decision) => decision,
                        Err(fatal) => {
                            transcript.log_orchestrator("ERROR", &fatal.to_string());
                            end = LoopEnd::ArbiterFatal(fatal.to_string());
                            break;
                        }
                    };

                    let record = DecisionRecord {
                        seq: confirmations,
                        worker_id: self.worker_id.clone(),
                        kind: request.kind,
                        decision: decision.clone(),
                    };
                    transcript.log_orchestrator(
                        "DECISION",
                        &format!(
                            "#{} {} {} ({}, {:.1} ms): {}",
                            record.seq,
                            record.kind,
                            decision.action,
                            decision.decided_by,
                            decision.latency_ms,
                            decision.reasoning,
                        ),
                    );
                    self.deps.publisher.publish(Event::Decision {
                        worker_id: self.worker_id.clone(),
                        confirmation_kind: request.kind,
                        action: decision.action,
                        decided_by: decision.decided_by,
                        latency_ms: decision.latency_ms,
                        is_fallback: decision.is_fallback,
                        safety_level: decision.safety_level,
                    });

                    let response = if decision.approved() { "yes" } else { "no" };
                    if let Err(e) = pty.write_line(response) {
                        warn!(worker_id = %self.worker_id, error = %e, "failed to write response");
                        transcript.log_orchestrator("ERROR", &format!("response write failed: {e}"));
                    }
                    transcript.log_orchestrator("SENT", response);
                    let entry = DialogueEntry::response(
                        self.deps.clock.epoch_secs(),
                        response,
                        request.kind,
                        Some(request.raw_message.clone()),
                    );
                    transcript.append_dialogue(&entry);
                    self.deps.publisher.publish(Event::Dialogue {
                        worker_id: self.worker_id.clone(),
                        entry,
                    });

                    self.set_state(WorkerState::Running, None);
                }
            }
        }

        // Drain whatever is left, then reap.
        self.persist_output(&mut transcript, &mut pty, &mut output, &mut output_lines);
        let grace = match end {
            LoopEnd::Eof | LoopEnd::IterationCap => self.config.close_grace,
            // Cancellation, timeout, and fatal paths close immediately.
            _ => Duration::ZERO,
        };
        let exit_code = pty.close(grace).await;
        let duration_secs =
            self.deps.clock.now().saturating_duration_since(started).as_secs_f64();

        let (state, error_message) = match &end {
            LoopEnd::Cancelled => {
                transcript.log_orchestrator("COMPLETE", "worker cancelled");
                (WorkerState::Terminated, Some("cancelled".to_string()))
            }
            LoopEnd::TimedOut => {
                transcript.log_orchestrator("ERROR", "session timeout");
                (WorkerState::Terminated, Some("session timeout".to_string()))
            }
            LoopEnd::ArbiterFatal(_) => {
                (WorkerState::Error, Some("arbiter unresponsive".to_string()))
            }
            LoopEnd::Eof | LoopEnd::IterationCap => {
                let success = match exit_code {
                    Some(0) => true,
                    Some(_) => false,
                    None => {
                        let lower = output.to_lowercase();
                        COMPLETION_MARKERS.iter().any(|marker| lower.contains(marker))
                    }
                };
                if success {
                    (WorkerState::Completed, None)
                } else {
                    let message = match exit_code {
                        Some(code) => format!("exit code {code}"),
                        None => "exit status unknown".to_string(),
                    };
                    (WorkerState::Error, Some(message))
                }
            }
        };

        self.deps.monitor.update_state(&self.worker_id, state, None, error_message.as_deref());
        self.publish_status();
        info!(
            worker_id = %self.worker_id,
            state = %state,
            duration_secs,
            "worker session finished"
        );

        TaskResult {
            worker_id: self.worker_id.clone(),
            name: self.task.name.clone(),
            output,
            success: state == WorkerState::Completed,
            duration_secs,
            error_message,
        }
    }

    /// Drain PTY output into the raw log, line events, and metrics.
    fn persist_output(
        &self,
        transcript: &mut TranscriptWriter,
        pty: &mut PtySession,
        output: &mut String,
        output_lines: &mut u64,
    ) {
        let chunk = pty.take_output();
        if chunk.is_empty() {
            return;
        }
        transcript.append_raw(&chunk);
        let clean = strip_ansi(&chunk);
        for line in clean.lines().filter(|line| !line.trim().is_empty()) {
            self.deps.publisher.publish(Event::Line {
                worker_id: self.worker_id.clone(),
                content: line.to_string(),
            });
        }
        *output_lines += clean.matches('\n').count() as u64;
        output.push_str(&clean);
        self.deps.monitor.update_output_metrics(&self.worker_id, *output_lines);
    }

    fn set_state(&self, state: WorkerState, error_message: Option<&str>) {
        self.deps.monitor.update_state(&self.worker_id, state, None, error_message);
        self.publish_status();
    }

    fn fail_early(&self, message: String) -> TaskResult {
        warn!(worker_id = %self.worker_id, error = %message, "session failed before running");
        self.deps.monitor.update_state(
            &self.worker_id,
            WorkerState::Error,
            None,
            Some(&message),
        );
        self.publish_status();
        TaskResult::failed(self.worker_id.clone(), self.task.name.clone(), message)
    }

    fn publish_status(&self) {
        if let Some(status) = self.deps.monitor.get(&self.worker_id) {
            self.deps.publisher.publish(Event::Status {
                worker_id: self.worker_id.clone(),
                state: status.state,
                progress: status.progress,
                output_lines: status.output_lines,
                confirmation_count: status.confirmation_count,
                health: status.health,
                timestamp: self.deps.clock.epoch_secs(),
            });
        }
    }
}

fn resolve_command(template: &WorkerCommand, workspace: &WorkerWorkspace) -> WorkerCommand {
    let task_file = workspace.task_file().display().to_string();
    let workspace_dir = workspace.dir().display().to_string();
    let mut command = template.clone();
    command.args = command
        .args
        .into_iter()
        .map(|arg| {
            arg.replace(TASK_FILE_PLACEHOLDER, &task_file)
                .replace(WORKSPACE_PLACEHOLDER, &workspace_dir)
        })
        .collect();
    command.cwd = Some(workspace.dir().to_path_buf());
    command
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
