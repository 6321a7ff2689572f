// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dialogue transcript records.
//!
//! Each record is one worker↔orchestrator exchange, serialized flat as
//! `{timestamp, direction, type, content, confirmation_kind?, matched_message?}`
//! with `timestamp` in seconds since the Unix epoch. The transcript is
//! append-only and totally ordered by arrival time.

use crate::confirmation::ConfirmationKind;
use serde::{Deserialize, Serialize};

/// Who produced the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "worker→orchestrator")]
    WorkerToOrchestrator,
    #[serde(rename = "orchestrator→worker")]
    OrchestratorToWorker,
}

crate::simple_display! {
    Direction {
        WorkerToOrchestrator => "worker→orchestrator",
        OrchestratorToWorker => "orchestrator→worker",
    }
}

/// Record payload, tagged `type: "output" | "response"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DialogueBody {
    /// Worker output observed before a prompt match (or plain output).
    Output { content: String },
    /// Orchestrator response written into the worker's PTY.
    Response {
        content: String,
        confirmation_kind: ConfirmationKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        matched_message: Option<String>,
    },
}

/// One transcript record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueEntry {
    pub timestamp: f64,
    pub direction: Direction,
    #[serde(flatten)]
    pub body: DialogueBody,
}

impl DialogueEntry {
    /// Worker→orchestrator output record.
    pub fn output(timestamp: f64, content: impl Into<String>) -> Self {
        Self {
            timestamp,
            direction: Direction::WorkerToOrchestrator,
            body: DialogueBody::Output { content: content.into() },
        }
    }

    /// Orchestrator→worker response record.
    pub fn response(
        timestamp: f64,
        content: impl Into<String>,
        confirmation_kind: ConfirmationKind,
        matched_message: Option<String>,
    ) -> Self {
        Self {
            timestamp,
            direction: Direction::OrchestratorToWorker,
            body: DialogueBody::Response {
                content: content.into(),
                confirmation_kind,
                matched_message,
            },
        }
    }

    pub fn content(&self) -> &str {
        match &self.body {
            DialogueBody::Output { content } => content,
            DialogueBody::Response { content, .. } => content,
        }
    }

    pub fn kind_label(&self) -> &'static str {
        match &self.body {
            DialogueBody::Output { .. } => "output",
            DialogueBody::Response { .. } => "response",
        }
    }

    pub fn is_response(&self) -> bool {
        matches!(self.body, DialogueBody::Response { .. })
    }
}

#[cfg(test)]
#[path = "dialogue_tests.rs"]
mod tests;
