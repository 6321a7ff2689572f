// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Confirmation prompt detection.
//!
//! An ordered table of `(regex, kind)` rules, compiled once and reused. The
//! PTY layer matches the raw stream against `patterns()`; the winning index
//! comes back here so `classify` can extract the kind-specific capture
//! (file path, command, package, URL). Pattern order is part of the
//! contract: index N always means the same rule.

use fm_core::{ConfirmationKind, ConfirmationRequest, WorkerId};
use regex::Regex;

/// `(pattern, kind)` table. Quoted-target rules capture group 1.
const RULES: &[(&str, ConfirmationKind)] = &[
    // File operations
    (r#"(?i)write\s+(?:to\s+)?(?:file\s+)?['"]([^'"]+)['"].*\?"#, ConfirmationKind::FileWrite),
    (r#"(?i)create\s+(?:file\s+)?['"]([^'"]+)['"].*\?"#, ConfirmationKind::FileWrite),
    (r#"(?i)delete\s+(?:file\s+)?['"]([^'"]+)['"].*\?"#, ConfirmationKind::FileDelete),
    (r#"(?i)remove\s+(?:file\s+)?['"]([^'"]+)['"].*\?"#, ConfirmationKind::FileDelete),
    (r#"(?i)read\s+(?:file\s+)?['"]([^'"]+)['"].*\?"#, ConfirmationKind::FileRead),
    // Command execution
    (r#"(?i)execute\s+(?:command\s+)?['"]([^'"]+)['"].*\?"#, ConfirmationKind::CommandExecute),
    (r#"(?i)run\s+(?:command\s+)?['"]([^'"]+)['"].*\?"#, ConfirmationKind::CommandExecute),
    // Package management
    (r#"(?i)install\s+(?:package\s+)?['"]?([^'"?\s]+)['"]?.*\?"#, ConfirmationKind::PackageInstall),
    // Network access
    (r#"(?i)(?:access|connect\s+to)\s+['"]?(https?://[^'"\s?]+)['"]?.*\?"#, ConfirmationKind::NetworkAccess),
    // Generic permission
    (r"(?i)(?:do\s+you\s+want\s+to\s+)?(?:proceed|continue).*\?", ConfirmationKind::PermissionRequest),
    (r"(?i)allow.*\(y/n\)", ConfirmationKind::PermissionRequest),
    (r"(?i)approve.*\?", ConfirmationKind::PermissionRequest),
];

/// Compiled prompt detector.
pub struct ConfirmationDetector {
    patterns: Vec<Regex>,
    kinds: Vec<ConfirmationKind>,
}

impl ConfirmationDetector {
    /// Compile the rule table. The table is static, so this only fails if a
    /// rule is edited into an invalid expression.
    pub fn new() -> Result<Self, regex::Error> {
        let mut patterns = Vec::with_capacity(RULES.len());
        let mut kinds = Vec::with_capacity(RULES.len());
        for (pattern, kind) in RULES {
            patterns.push(Regex::new(pattern)?);
            kinds.push(*kind);
        }
        Ok(Self { patterns, kinds })
    }

    /// Compiled patterns, in table order, for the PTY `expect` call.
    pub fn patterns(&self) -> &[Regex] {
        &self.patterns
    }

    /// Build a [`ConfirmationRequest`] from the matched pattern index and
    /// the matched text.
    pub fn classify(&self, worker_id: &WorkerId, index: usize, matched: &str) -> ConfirmationRequest {
        let kind = self.kinds.get(index).copied().unwrap_or(ConfirmationKind::Unknown);
        let mut request = ConfirmationRequest::new(worker_id.clone(), kind, matched.trim());

        if let (Some(key), Some(re)) = (kind.detail_key(), self.patterns.get(index)) {
            if let Some(capture) = re.captures(matched).and_then(|c| c.get(1)) {
                request = request.with_detail(key, capture.as_str());
            }
        }
        request
    }

    /// Try every rule against a standalone piece of text (used for text that
    /// did not come through the PTY `expect` path).
    pub fn detect(&self, worker_id: &WorkerId, text: &str) -> Option<ConfirmationRequest> {
        let (index, matched) = self
            .patterns
            .iter()
            .enumerate()
            .filter_map(|(i, re)| re.find(text).map(|m| (i, m)))
            .min_by_key(|(i, m)| (m.start(), *i))?;
        Some(self.classify(worker_id, index, matched.as_str()))
    }
}

#[cfg(test)]
#[path = "detect_tests.rs"]
mod tests;
