// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Arbitration decisions and their provenance.

use crate::confirmation::ConfirmationKind;
use crate::worker::WorkerId;
use serde::{Deserialize, Serialize};

/// What gets written back to the worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
    Approve,
    Deny,
}

crate::simple_display! {
    DecisionAction {
        Approve => "approve",
        Deny => "deny",
    }
}

/// Which stage of the pipeline produced the decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecidedBy {
    Rules,
    Ai,
    Template,
}

crate::simple_display! {
    DecidedBy {
        Rules => "rules",
        Ai => "ai",
        Template => "template",
    }
}

/// Risk classification derived from action and provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyLevel {
    Safe,
    Caution,
    Dangerous,
    Prohibited,
}

crate::simple_display! {
    SafetyLevel {
        Safe => "safe",
        Caution => "caution",
        Dangerous => "dangerous",
        Prohibited => "prohibited",
    }
}

/// A resolved confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: DecisionAction,
    pub reasoning: String,
    pub decided_by: DecidedBy,
    pub latency_ms: f64,
    pub is_fallback: bool,
    pub safety_level: SafetyLevel,
}

impl Decision {
    pub fn approved(&self) -> bool {
        self.action == DecisionAction::Approve
    }
}

/// One line of the per-worker decision log.
///
/// `seq` is the worker's confirmation sequence number, so `(worker_id, seq)`
/// is unique by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub seq: u64,
    pub worker_id: WorkerId,
    pub kind: ConfirmationKind,
    pub decision: Decision,
}

#[cfg(test)]
#[path = "decision_tests.rs"]
mod tests;
