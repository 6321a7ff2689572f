// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events published to in-process subscribers.
//!
//! Serializes with `{"type": "name", ...fields}` format; timestamps are
//! epoch seconds.

use crate::confirmation::ConfirmationKind;
use crate::decision::{DecidedBy, DecisionAction, SafetyLevel};
use crate::dialogue::DialogueEntry;
use crate::status::{HealthStatus, WorkerState};
use crate::worker::WorkerId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// Worker status snapshot (emitted on every state transition and
    /// metric update worth broadcasting).
    #[serde(rename = "status")]
    Status {
        worker_id: WorkerId,
        state: WorkerState,
        progress: u8,
        output_lines: u64,
        confirmation_count: u64,
        health: HealthStatus,
        timestamp: f64,
    },

    /// One observed worker output line (ANSI-stripped).
    #[serde(rename = "line")]
    Line { worker_id: WorkerId, content: String },

    /// Mirror of a dialogue transcript record.
    #[serde(rename = "dialogue")]
    Dialogue { worker_id: WorkerId, entry: DialogueEntry },

    /// A confirmation was arbitrated.
    #[serde(rename = "decision")]
    Decision {
        worker_id: WorkerId,
        confirmation_kind: ConfirmationKind,
        action: DecisionAction,
        decided_by: DecidedBy,
        latency_ms: f64,
        is_fallback: bool,
        safety_level: SafetyLevel,
    },

    /// Emitted when the bus has been idle for the configured interval.
    #[serde(rename = "heartbeat")]
    Heartbeat { timestamp: f64 },
}

impl Event {
    /// Topic name, used for per-topic ordering guarantees.
    pub fn topic(&self) -> &'static str {
        match self {
            Event::Status { .. } => "status",
            Event::Line { .. } => "line",
            Event::Dialogue { .. } => "dialogue",
            Event::Decision { .. } => "decision",
            Event::Heartbeat { .. } => "heartbeat",
        }
    }

    /// The worker this event concerns, if any.
    pub fn worker_id(&self) -> Option<&WorkerId> {
        match self {
            Event::Status { worker_id, .. }
            | Event::Line { worker_id, .. }
            | Event::Dialogue { worker_id, .. }
            | Event::Decision { worker_id, .. } => Some(worker_id),
            Event::Heartbeat { .. } => None,
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
