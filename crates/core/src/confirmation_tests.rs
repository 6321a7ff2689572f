// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    file_write = { ConfirmationKind::FileWrite, "file_write" },
    file_read = { ConfirmationKind::FileRead, "file_read" },
    file_delete = { ConfirmationKind::FileDelete, "file_delete" },
    package_install = { ConfirmationKind::PackageInstall, "package_install" },
    command_execute = { ConfirmationKind::CommandExecute, "command_execute" },
    network_access = { ConfirmationKind::NetworkAccess, "network_access" },
    permission_request = { ConfirmationKind::PermissionRequest, "permission_request" },
    unknown = { ConfirmationKind::Unknown, "unknown" },
)]
fn kind_serde_matches_display(kind: ConfirmationKind, expected: &str) {
    assert_eq!(kind.to_string(), expected);
    let json = serde_json::to_string(&kind).unwrap();
    assert_eq!(json, format!("\"{}\"", expected));
    let parsed: ConfirmationKind = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, kind);
}

#[yare::parameterized(
    write = { ConfirmationKind::FileWrite, Some("file") },
    read = { ConfirmationKind::FileRead, Some("file") },
    delete = { ConfirmationKind::FileDelete, Some("file") },
    command = { ConfirmationKind::CommandExecute, Some("command") },
    package = { ConfirmationKind::PackageInstall, Some("package") },
    network = { ConfirmationKind::NetworkAccess, Some("url") },
    permission = { ConfirmationKind::PermissionRequest, None },
    unknown = { ConfirmationKind::Unknown, None },
)]
fn detail_keys(kind: ConfirmationKind, expected: Option<&'static str>) {
    assert_eq!(kind.detail_key(), expected);
}

#[test]
fn request_target_reads_kind_specific_detail() {
    let request = ConfirmationRequest::new(
        WorkerId::new("worker_001"),
        ConfirmationKind::FileWrite,
        "Write to file \"src/main.rs\"?",
    )
    .with_detail("file", "src/main.rs");

    assert_eq!(request.target(), Some("src/main.rs"));
}

#[test]
fn request_target_none_without_detail() {
    let request = ConfirmationRequest::new(
        WorkerId::new("worker_001"),
        ConfirmationKind::PermissionRequest,
        "Proceed?",
    );
    assert_eq!(request.target(), None);
}

#[test]
fn request_serde_roundtrip() {
    let request = ConfirmationRequest::new(
        WorkerId::new("worker_002"),
        ConfirmationKind::PackageInstall,
        "Install package 'pytest'?",
    )
    .with_detail("package", "pytest");

    let json = serde_json::to_string(&request).unwrap();
    let parsed: ConfirmationRequest = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, request);
}
