// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Non-interactive subprocess worker variant.
//!
//! Some worker CLIs run a whole task unattended and stream structured JSONL
//! events instead of asking for confirmations. This executor runs them as a
//! plain subprocess (no PTY), captures the event stream, and writes
//! `codex_events.jsonl` and `codex_summary.txt` into the worker workspace.
//! It never touches the interactive artifacts.

use crate::workspace::WorkerWorkspace;
use chrono::Local;
use fm_core::{Clock, TaskResult, WorkerId, WorkerTask};
use fm_term::WorkerCommand;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::warn;

pub const CODEX_EVENTS_FILE: &str = "codex_events.jsonl";
pub const CODEX_SUMMARY_FILE: &str = "codex_summary.txt";

const RULE_HEAVY: &str =
    "================================================================================";

/// Result of one batch run plus the parsed event count.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub result: TaskResult,
    pub event_count: usize,
}

/// Runs one task through a non-interactive worker CLI.
pub struct BatchExecutor<C: Clock> {
    command: WorkerCommand,
    timeout: Duration,
    clock: C,
}

impl<C: Clock> BatchExecutor<C> {
    /// `command` may use the `{task_file}` and `{workspace}` placeholders.
    pub fn new(command: WorkerCommand, timeout: Duration, clock: C) -> Self {
        Self { command, timeout, clock }
    }

    pub async fn execute(
        &self,
        workspace_root: &Path,
        worker_id: &WorkerId,
        task: &WorkerTask,
    ) -> BatchOutcome {
        let started = self.clock.now();
        let workspace =
            match WorkerWorkspace::prepare(workspace_root, worker_id, &task.prompt) {
                Ok(ws) => ws,
                Err(e) => {
                    return BatchOutcome {
                        result: TaskResult::failed(
                            worker_id.clone(),
                            task.name.clone(),
                            format!("workspace setup failed: {e}"),
                        ),
                        event_count: 0,
                    }
                }
            };

        let run = self.run_process(&workspace, &task.prompt).await;
        let duration_secs =
            self.clock.now().saturating_duration_since(started).as_secs_f64();

        let (stdout, stderr, exit_code, error_message) = match run {
            Ok((stdout, stderr, exit_code)) => {
                let error_message = match exit_code {
                    Some(0) => None,
                    Some(code) => Some(format!("exit code {code}")),
                    None => Some("exit status unknown".to_string()),
                };
                (stdout, stderr, exit_code, error_message)
            }
            Err(message) => (String::new(), String::new(), None, Some(message)),
        };
        let success = error_message.is_none();

        let events = parse_events(&stdout);
        write_events(workspace.dir(), &events);
        write_summary(
            workspace.dir(),
            worker_id,
            &task.name,
            success,
            exit_code,
            duration_secs,
            events.len(),
            &stdout,
            &stderr,
            error_message.as_deref(),
        );

        BatchOutcome {
            result: TaskResult {
                worker_id: worker_id.clone(),
                name: task.name.clone(),
                output: stdout,
                success,
                duration_secs,
                error_message,
            },
            event_count: events.len(),
        }
    }

    async fn run_process(
        &self,
        workspace: &WorkerWorkspace,
        prompt: &str,
    ) -> Result<(String, String, Option<i32>), String> {
        let task_file = workspace.task_file().display().to_string();
        let workspace_dir = workspace.dir().display().to_string();
        let args: Vec<String> = self
            .command
            .args
            .iter()
            .map(|a| a.replace("{task_file}", &task_file).replace("{workspace}", &workspace_dir))
            .collect();

        let mut child = Command::new(&self.command.program)
            .args(&args)
            .current_dir(workspace.dir())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| format!("spawn failed: {e}"))?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(prompt.as_bytes()).await {
                warn!(error = %e, "failed to write prompt to batch worker");
            }
        }

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| format!("timed out after {:?}", self.timeout))?
            .map_err(|e| format!("wait failed: {e}"))?;

        Ok((
            String::from_utf8_lossy(&output.stdout).to_string(),
            String::from_utf8_lossy(&output.stderr).to_string(),
            output.status.code(),
        ))
    }
}

fn parse_events(stdout: &str) -> Vec<serde_json::Value> {
    stdout.lines().filter_map(|line| serde_json::from_str(line.trim()).ok()).collect()
}

fn write_events(dir: &Path, events: &[serde_json::Value]) {
    let mut body = String::new();
    for event in events {
        match serde_json::to_string(event) {
            Ok(line) => {
                body.push_str(&line);
                body.push('\n');
            }
            Err(e) => warn!(error = %e, "event serialization failed"),
        }
    }
    if let Err(e) = std::fs::write(dir.join(CODEX_EVENTS_FILE), body) {
        warn!(error = %e, "failed to write event log");
    }
}

#[allow(clippy::too_many_arguments)]
fn write_summary(
    dir: &Path,
    worker_id: &WorkerId,
    task_name: &str,
    success: bool,
    exit_code: Option<i32>,
    duration_secs: f64,
    event_count: usize,
    stdout: &str,
    stderr: &str,
    error_message: Option<&str>,
) {
    let mut body = format!(
        "{RULE_HEAVY}\nBATCH EXECUTION SUMMARY: {worker_id}\nTask: {task_name}\nStarted: {}\n{RULE_HEAVY}\n\n",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
    );
    body.push_str(&format!("Status: {}\n", if success { "success" } else { "failure" }));
    body.push_str(&format!("Exit Code: {exit_code:?}\n"));
    body.push_str(&format!("Duration: {duration_secs:.1}s\n"));
    body.push_str(&format!("Events: {event_count}\n"));
    if let Some(message) = error_message {
        body.push_str(&format!("\nError Message:\n  {message}\n"));
    }
    body.push_str(&format!("\n{RULE_HEAVY}\nSTDOUT:\n{RULE_HEAVY}\n{stdout}"));
    if !stderr.is_empty() {
        body.push_str(&format!("\n{RULE_HEAVY}\nSTDERR:\n{RULE_HEAVY}\n{stderr}"));
    }
    if let Err(e) = std::fs::write(dir.join(CODEX_SUMMARY_FILE), body) {
        warn!(error = %e, "failed to write execution summary");
    }
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
