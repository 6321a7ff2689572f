// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Confirmation prompts detected in worker output.

use crate::worker::WorkerId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What a worker is asking permission for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfirmationKind {
    FileWrite,
    FileRead,
    FileDelete,
    PackageInstall,
    CommandExecute,
    NetworkAccess,
    PermissionRequest,
    Unknown,
}

crate::simple_display! {
    ConfirmationKind {
        FileWrite => "file_write",
        FileRead => "file_read",
        FileDelete => "file_delete",
        PackageInstall => "package_install",
        CommandExecute => "command_execute",
        NetworkAccess => "network_access",
        PermissionRequest => "permission_request",
        Unknown => "unknown",
    }
}

impl ConfirmationKind {
    /// The `extracted` key the detector populates for this kind, if any.
    pub fn detail_key(&self) -> Option<&'static str> {
        match self {
            ConfirmationKind::FileWrite
            | ConfirmationKind::FileRead
            | ConfirmationKind::FileDelete => Some("file"),
            ConfirmationKind::CommandExecute => Some("command"),
            ConfirmationKind::PackageInstall => Some("package"),
            ConfirmationKind::NetworkAccess => Some("url"),
            ConfirmationKind::PermissionRequest | ConfirmationKind::Unknown => None,
        }
    }
}

/// A detected confirmation prompt, ready for arbitration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationRequest {
    pub worker_id: WorkerId,
    pub kind: ConfirmationKind,
    /// The prompt text as matched (ANSI-stripped, trimmed).
    pub raw_message: String,
    /// Kind-specific captures: `file`, `command`, `package`, `url`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extracted: BTreeMap<String, String>,
}

impl ConfirmationRequest {
    pub fn new(worker_id: WorkerId, kind: ConfirmationKind, raw_message: impl Into<String>) -> Self {
        Self { worker_id, kind, raw_message: raw_message.into(), extracted: BTreeMap::new() }
    }

    /// The capture for this request's kind-specific key, if present.
    pub fn target(&self) -> Option<&str> {
        self.kind.detail_key().and_then(|key| self.extracted.get(key)).map(String::as_str)
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extracted.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
#[path = "confirmation_tests.rs"]
mod tests;
