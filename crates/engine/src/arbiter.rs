// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! AI arbiter client.
//!
//! The oracle is a pure I/O boundary: text in, `{text, elapsed}` out. The
//! client owns prompt construction, the request-scoped timeout, and parsing
//! of the APPROVED:/DENIED: contract. Unparsable replies are denied.

use async_trait::async_trait;
use fm_core::{ConfirmationRequest, DecisionAction, WorkerId};
use regex::Regex;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

const MAX_REASONING_CHARS: usize = 200;

/// Raw oracle response.
#[derive(Debug, Clone)]
pub struct OracleReply {
    pub text: String,
    pub elapsed: Duration,
}

/// Oracle failures surfaced to the decision pipeline.
#[derive(Debug, Clone, Error)]
pub enum OracleError {
    #[error("oracle timed out after {0:?}")]
    Timeout(Duration),
    #[error("oracle transport: {0}")]
    Transport(String),
    #[error("oracle completely unresponsive: {0}")]
    Unresponsive(String),
}

impl OracleError {
    /// Fatal errors terminate the worker instead of falling back to a
    /// template. Only the explicit unresponsive sentinel qualifies.
    pub fn is_fatal(&self) -> bool {
        match self {
            OracleError::Unresponsive(_) => true,
            OracleError::Transport(msg) => msg.to_lowercase().contains("completely unresponsive"),
            OracleError::Timeout(_) => false,
        }
    }
}

/// External reasoning oracle.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn ask(&self, system_prompt: &str, question: &str) -> Result<OracleReply, OracleError>;
}

/// Context threaded into the arbiter prompt.
#[derive(Debug, Clone)]
pub struct ArbiterContext {
    pub worker_id: WorkerId,
    pub task_name: String,
    pub project_name: String,
    pub project_goal: String,
}

impl ArbiterContext {
    pub fn new(worker_id: WorkerId, task_name: impl Into<String>) -> Self {
        Self {
            worker_id,
            task_name: task_name.into(),
            project_name: "unnamed project".to_string(),
            project_goal: "complete the submitted tasks".to_string(),
        }
    }

    fm_core::setters! {
        into {
            project_name: String,
            project_goal: String,
        }
    }
}

/// Parsed arbiter answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArbiterVerdict {
    pub action: DecisionAction,
    pub reasoning: String,
}

/// Oracle wrapper with prompt construction and response parsing.
pub struct ArbiterClient {
    oracle: Arc<dyn Oracle>,
    timeout: Duration,
    answer_patterns: Vec<(Regex, DecisionAction)>,
}

impl ArbiterClient {
    pub fn new(oracle: Arc<dyn Oracle>, timeout: Duration) -> Result<Self, regex::Error> {
        let answer_patterns = vec![
            (Regex::new(r"(?is)APPROVED\s*:\s*(.+)")?, DecisionAction::Approve),
            (Regex::new(r"(?is)DENIED\s*:\s*(.+)")?, DecisionAction::Deny),
            (Regex::new(r"(?is)APPROVE\s*:\s*(.+)")?, DecisionAction::Approve),
            (Regex::new(r"(?is)DENY\s*:\s*(.+)")?, DecisionAction::Deny),
        ];
        Ok(Self { oracle, timeout, answer_patterns })
    }

    /// Ask the oracle about an inconclusive request.
    pub async fn ask(
        &self,
        request: &ConfirmationRequest,
        ctx: &ArbiterContext,
    ) -> Result<ArbiterVerdict, OracleError> {
        let system_prompt = self.system_prompt(ctx);
        let question = self.question(request, ctx);

        let reply = tokio::time::timeout(self.timeout, self.oracle.ask(&system_prompt, &question))
            .await
            .map_err(|_| OracleError::Timeout(self.timeout))??;

        debug!(
            worker_id = %request.worker_id,
            elapsed_ms = reply.elapsed.as_millis() as u64,
            "oracle replied"
        );
        Ok(self.parse(&reply.text))
    }

    fn system_prompt(&self, ctx: &ArbiterContext) -> String {
        format!(
            "You are the orchestrator of a parallel AI coding system.\n\
             \n\
             Project: {name}\n\
             Goal: {goal}\n\
             \n\
             Your role:\n\
             - Review worker requests for safety and appropriateness\n\
             - Make decisions based on the provided context\n\
             - Give brief reasoning\n\
             \n\
             CRITICAL RESPONSE FORMAT:\n\
             You MUST respond with exactly one of these formats:\n\
             \"APPROVED: [brief reason in 1-2 sentences]\"\n\
             or\n\
             \"DENIED: [brief reason in 1-2 sentences]\"\n",
            name = ctx.project_name,
            goal = ctx.project_goal,
        )
    }

    fn question(&self, request: &ConfirmationRequest, ctx: &ArbiterContext) -> String {
        let mut details = String::new();
        for (key, value) in &request.extracted {
            details.push_str(&format!("  - {key}: {value}\n"));
        }
        format!(
            "=== Context ===\n\
             Worker: {worker}\n\
             Task: {task}\n\
             \n\
             === Request ===\n\
             Type: {kind}\n\
             Message: {message}\n\
             Details:\n{details}\
             \n\
             Should I approve or deny this request?\n\
             Respond with APPROVED: or DENIED:",
            worker = ctx.worker_id,
            task = ctx.task_name,
            kind = request.kind,
            message = request.raw_message,
        )
    }

    /// Parse a free-text reply. Falls back to keyword inference; anything
    /// still ambiguous is denied.
    fn parse(&self, response: &str) -> ArbiterVerdict {
        let normalized = response.trim();

        for (pattern, action) in &self.answer_patterns {
            if let Some(capture) = pattern.captures(normalized).and_then(|c| c.get(1)) {
                return ArbiterVerdict {
                    action: *action,
                    reasoning: truncate(capture.as_str().trim(), MAX_REASONING_CHARS),
                };
            }
        }

        let lower = normalized.to_lowercase();
        if ["yes", "approve", "safe", "ok"].iter().any(|w| lower.contains(w)) {
            return ArbiterVerdict {
                action: DecisionAction::Approve,
                reasoning: format!("inferred approval from response: {}", truncate(normalized, 100)),
            };
        }
        if ["no", "deny", "dangerous", "unsafe"].iter().any(|w| lower.contains(w)) {
            return ArbiterVerdict {
                action: DecisionAction::Deny,
                reasoning: format!("inferred denial from response: {}", truncate(normalized, 100)),
            };
        }

        ArbiterVerdict {
            action: DecisionAction::Deny,
            reasoning: format!("unclear response, denying for safety: {}", truncate(normalized, 100)),
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{head}...")
    }
}

/// Oracle that shells out to an external CLI.
///
/// `{system_prompt}` in any argument is replaced with the built system
/// prompt; the question goes to the child's stdin.
#[derive(Debug, Clone)]
pub struct CommandOracle {
    program: String,
    args: Vec<String>,
}

impl CommandOracle {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self { program: program.into(), args }
    }
}

#[async_trait]
impl Oracle for CommandOracle {
    async fn ask(&self, system_prompt: &str, question: &str) -> Result<OracleReply, OracleError> {
        let started = Instant::now();
        let args: Vec<String> =
            self.args.iter().map(|a| a.replace("{system_prompt}", system_prompt)).collect();

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| OracleError::Transport(format!("spawn {}: {e}", self.program)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(question.as_bytes())
                .await
                .map_err(|e| OracleError::Transport(format!("write question: {e}")))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| OracleError::Transport(format!("wait: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OracleError::Transport(format!(
                "oracle exited with {:?}: {}",
                output.status.code(),
                truncate(stderr.trim(), 200),
            )));
        }

        Ok(OracleReply {
            text: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            elapsed: started.elapsed(),
        })
    }
}

/// Scripted oracle for tests.
#[cfg(any(test, feature = "test-support"))]
pub struct FakeOracle {
    replies: parking_lot::Mutex<std::collections::VecDeque<Result<String, OracleError>>>,
    delay: Duration,
    questions: parking_lot::Mutex<Vec<String>>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeOracle {
    /// Always replies `APPROVED: looks safe`.
    pub fn approving() -> Self {
        Self::with_replies(Vec::new())
    }

    /// Pops scripted replies in order; defaults to approval when exhausted.
    pub fn with_replies(replies: Vec<Result<String, OracleError>>) -> Self {
        Self {
            replies: parking_lot::Mutex::new(replies.into()),
            delay: Duration::ZERO,
            questions: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Questions asked so far.
    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().clone()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl Oracle for FakeOracle {
    async fn ask(&self, _system_prompt: &str, question: &str) -> Result<OracleReply, OracleError> {
        self.questions.lock().push(question.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let reply = self
            .replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok("APPROVED: looks safe".to_string()));
        reply.map(|text| OracleReply { text, elapsed: self.delay })
    }
}

#[cfg(test)]
#[path = "arbiter_tests.rs"]
mod tests;
