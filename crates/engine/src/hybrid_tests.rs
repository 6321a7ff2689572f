// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::arbiter::{ArbiterClient, ArbiterContext, FakeOracle, OracleError};
use crate::rules::RuleEngine;
use fm_core::{ConfirmationKind, WorkerId};
use std::sync::Arc;
use std::time::Duration;

fn engine_with(
    dir: &tempfile::TempDir,
    oracle: FakeOracle,
) -> HybridEngine<SystemClock> {
    let rules = RuleEngine::new(dir.path());
    let arbiter = ArbiterClient::new(Arc::new(oracle), Duration::from_secs(5)).unwrap();
    HybridEngine::new(rules, arbiter, SystemClock)
}

fn ctx() -> ArbiterContext {
    ArbiterContext::new(WorkerId::new("worker_001"), "build feature")
}

fn request(kind: ConfirmationKind, key: &str, value: &str) -> ConfirmationRequest {
    ConfirmationRequest::new(WorkerId::new("worker_001"), kind, "prompt").with_detail(key, value)
}

#[tokio::test]
async fn safe_file_write_is_decided_by_rules() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("src")).unwrap();
    let engine = engine_with(&dir, FakeOracle::approving());

    let decision = engine
        .decide(&request(ConfirmationKind::FileWrite, "file", "src/models/user.py"), &ctx())
        .await
        .unwrap();

    assert_eq!(decision.action, DecisionAction::Approve);
    assert_eq!(decision.decided_by, DecidedBy::Rules);
    assert_eq!(decision.safety_level, SafetyLevel::Safe);
    assert!(!decision.is_fallback);
    assert_eq!(engine.stats().rules_decisions, 1);
}

#[tokio::test]
async fn protected_deletion_is_denied_by_rules() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with(&dir, FakeOracle::approving());

    let decision = engine
        .decide(&request(ConfirmationKind::FileDelete, "file", "config.py"), &ctx())
        .await
        .unwrap();

    assert_eq!(decision.action, DecisionAction::Deny);
    assert_eq!(decision.decided_by, DecidedBy::Rules);
    assert_eq!(decision.safety_level, SafetyLevel::Dangerous);
}

#[tokio::test]
async fn unknown_prompt_escalates_to_ai() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with(
        &dir,
        FakeOracle::with_replies(vec![Ok("APPROVED: scoped refactor is safe".to_string())])
            .with_delay(Duration::from_millis(5)),
    );

    let req = ConfirmationRequest::new(
        WorkerId::new("worker_001"),
        ConfirmationKind::PermissionRequest,
        "Do you want to refactor authentication across modules?",
    );
    let decision = engine.decide(&req, &ctx()).await.unwrap();

    assert_eq!(decision.action, DecisionAction::Approve);
    assert_eq!(decision.decided_by, DecidedBy::Ai);
    assert_eq!(decision.safety_level, SafetyLevel::Caution);
    assert!(decision.latency_ms > 0.0);
    assert_eq!(engine.stats().ai_decisions, 1);
}

#[tokio::test]
async fn ai_denial_is_dangerous() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with(
        &dir,
        FakeOracle::with_replies(vec![Ok("DENIED: too broad".to_string())]),
    );

    let req = ConfirmationRequest::new(
        WorkerId::new("worker_001"),
        ConfirmationKind::Unknown,
        "Rewrite everything?",
    );
    let decision = engine.decide(&req, &ctx()).await.unwrap();

    assert_eq!(decision.action, DecisionAction::Deny);
    assert_eq!(decision.safety_level, SafetyLevel::Dangerous);
}

#[tokio::test]
async fn timeout_on_file_read_falls_back_to_approve_template() {
    let dir = tempfile::tempdir().unwrap();
    let oracle = FakeOracle::with_replies(vec![Ok("APPROVED: late".to_string())])
        .with_delay(Duration::from_secs(10));
    let rules = RuleEngine::new(dir.path());
    let arbiter = ArbiterClient::new(Arc::new(oracle), Duration::from_millis(50)).unwrap();
    let engine = HybridEngine::new(rules, arbiter, SystemClock);

    // A read outside the workspace: rules inconclusive, arbiter times out.
    let decision = engine
        .decide(&request(ConfirmationKind::FileRead, "file", "/srv/shared/data.csv"), &ctx())
        .await
        .unwrap();

    assert_eq!(decision.action, DecisionAction::Approve);
    assert_eq!(decision.decided_by, DecidedBy::Template);
    assert!(decision.is_fallback);
    assert_eq!(decision.safety_level, SafetyLevel::Caution);
    assert_eq!(engine.stats().template_fallbacks, 1);
}

#[tokio::test]
async fn transport_failure_on_delete_falls_back_to_deny_template() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with(
        &dir,
        FakeOracle::with_replies(vec![Err(OracleError::Transport("boom".to_string()))]),
    );

    let decision = engine
        .decide(&request(ConfirmationKind::FileDelete, "file", "scratch/tmp.txt"), &ctx())
        .await
        .unwrap();

    assert_eq!(decision.action, DecisionAction::Deny);
    assert_eq!(decision.decided_by, DecidedBy::Template);
    assert!(decision.is_fallback);
}

#[tokio::test]
async fn unresponsive_arbiter_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let engine = engine_with(
        &dir,
        FakeOracle::with_replies(vec![Err(OracleError::Unresponsive(
            "no reply after retries".to_string(),
        ))]),
    );

    let req = ConfirmationRequest::new(
        WorkerId::new("worker_001"),
        ConfirmationKind::Unknown,
        "anything",
    );
    let err = engine.decide(&req, &ctx()).await.unwrap_err();
    assert!(err.to_string().contains("arbiter unresponsive"));
    // Fatal paths record nothing.
    assert_eq!(engine.stats().total_decisions(), 0);
}

#[tokio::test]
async fn stats_accumulate_across_decisions() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("src")).unwrap();
    let engine = engine_with(
        &dir,
        FakeOracle::with_replies(vec![
            Ok("APPROVED: fine".to_string()),
            Err(OracleError::Transport("down".to_string())),
        ]),
    );

    engine
        .decide(&request(ConfirmationKind::FileWrite, "file", "src/a.py"), &ctx())
        .await
        .unwrap();
    engine
        .decide(
            &ConfirmationRequest::new(
                WorkerId::new("worker_001"),
                ConfirmationKind::Unknown,
                "?",
            ),
            &ctx(),
        )
        .await
        .unwrap();
    engine
        .decide(
            &ConfirmationRequest::new(
                WorkerId::new("worker_001"),
                ConfirmationKind::Unknown,
                "?",
            ),
            &ctx(),
        )
        .await
        .unwrap();

    let stats = engine.stats();
    assert_eq!(stats.rules_decisions, 1);
    assert_eq!(stats.ai_decisions, 1);
    assert_eq!(stats.template_fallbacks, 1);
    assert_eq!(stats.total_decisions(), 3);
    assert!(stats.average_latency_ms() >= 0.0);
    assert!((stats.rules_percentage() - 33.333).abs() < 0.01);
}
