// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hybrid decision pipeline: rules → AI arbiter → fallback template.
//!
//! Rules handle the clear cases in microseconds; the arbiter handles the
//! ambiguous ones; templates keep the worker moving when the arbiter is
//! unavailable. A completely unresponsive arbiter is the one fatal case —
//! the session terminates the worker rather than guess.

use crate::arbiter::{ArbiterClient, ArbiterContext};
use crate::rules::{RuleEngine, RuleVerdict};
use crate::templates::FallbackTemplates;
use fm_core::{
    Clock, ConfirmationRequest, DecidedBy, Decision, DecisionAction, SafetyLevel, SystemClock,
};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{info, warn};

/// Raised when the arbiter is completely unresponsive; the worker must stop.
#[derive(Debug, Error)]
#[error("arbiter unresponsive: {0}")]
pub struct EngineFatal(pub String);

/// Cumulative pipeline counters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineStats {
    pub rules_decisions: u64,
    pub ai_decisions: u64,
    pub template_fallbacks: u64,
    pub total_latency_ms: f64,
}

impl EngineStats {
    pub fn total_decisions(&self) -> u64 {
        self.rules_decisions + self.ai_decisions + self.template_fallbacks
    }

    pub fn average_latency_ms(&self) -> f64 {
        let total = self.total_decisions();
        if total == 0 {
            0.0
        } else {
            self.total_latency_ms / total as f64
        }
    }

    pub fn rules_percentage(&self) -> f64 {
        let total = self.total_decisions();
        if total == 0 {
            0.0
        } else {
            self.rules_decisions as f64 / total as f64 * 100.0
        }
    }
}

/// The decision engine shared by all sessions of one orchestrator.
pub struct HybridEngine<C: Clock = SystemClock> {
    rules: RuleEngine,
    arbiter: ArbiterClient,
    clock: C,
    stats: Mutex<EngineStats>,
}

impl<C: Clock> HybridEngine<C> {
    pub fn new(rules: RuleEngine, arbiter: ArbiterClient, clock: C) -> Self {
        Self { rules, arbiter, clock, stats: Mutex::new(EngineStats::default()) }
    }

    pub fn stats(&self) -> EngineStats {
        self.stats.lock().clone()
    }

    /// Decide one confirmation. Every return path stamps wall-clock latency
    /// and updates the cumulative counters.
    pub async fn decide(
        &self,
        request: &ConfirmationRequest,
        ctx: &ArbiterContext,
    ) -> Result<Decision, EngineFatal> {
        let started = self.clock.now();

        let verdict = self.rules.evaluate(request);
        if verdict.is_conclusive() {
            let (action, reasoning, safety_level) = match verdict {
                RuleVerdict::Approve(reason) => (DecisionAction::Approve, reason, SafetyLevel::Safe),
                RuleVerdict::Deny(reason) => (DecisionAction::Deny, reason, SafetyLevel::Dangerous),
                RuleVerdict::Inconclusive => unreachable!("conclusive verdict checked above"),
            };
            let decision = Decision {
                action,
                reasoning,
                decided_by: DecidedBy::Rules,
                latency_ms: self.elapsed_ms(started),
                is_fallback: false,
                safety_level,
            };
            self.record(&decision);
            return Ok(decision);
        }

        info!(worker_id = %request.worker_id, kind = %request.kind, "rules inconclusive, consulting arbiter");

        match self.arbiter.ask(request, ctx).await {
            Ok(verdict) => {
                let safety_level = match verdict.action {
                    DecisionAction::Approve => SafetyLevel::Caution,
                    DecisionAction::Deny => SafetyLevel::Dangerous,
                };
                let decision = Decision {
                    action: verdict.action,
                    reasoning: verdict.reasoning,
                    decided_by: DecidedBy::Ai,
                    latency_ms: self.elapsed_ms(started),
                    is_fallback: false,
                    safety_level,
                };
                self.record(&decision);
                Ok(decision)
            }
            Err(error) if error.is_fatal() => Err(EngineFatal(error.to_string())),
            Err(error) => {
                warn!(worker_id = %request.worker_id, %error, "arbiter failed, using template");
                let template = FallbackTemplates::for_kind(request.kind);
                let decision = Decision {
                    action: template.action,
                    reasoning: format!("{} ({error})", template.message),
                    decided_by: DecidedBy::Template,
                    latency_ms: self.elapsed_ms(started),
                    is_fallback: true,
                    safety_level: SafetyLevel::Caution,
                };
                self.record(&decision);
                Ok(decision)
            }
        }
    }

    fn elapsed_ms(&self, started: std::time::Instant) -> f64 {
        self.clock.now().saturating_duration_since(started).as_secs_f64() * 1000.0
    }

    fn record(&self, decision: &Decision) {
        let mut stats = self.stats.lock();
        match decision.decided_by {
            DecidedBy::Rules => stats.rules_decisions += 1,
            DecidedBy::Ai => stats.ai_decisions += 1,
            DecidedBy::Template => stats.template_fallbacks += 1,
        }
        stats.total_latency_ms += decision.latency_ms;
    }
}

#[cfg(test)]
#[path = "hybrid_tests.rs"]
mod tests;
