// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    file_write = { ConfirmationKind::FileWrite, DecisionAction::Approve },
    file_read = { ConfirmationKind::FileRead, DecisionAction::Approve },
    file_delete = { ConfirmationKind::FileDelete, DecisionAction::Deny },
    package_install = { ConfirmationKind::PackageInstall, DecisionAction::Approve },
    command_execute = { ConfirmationKind::CommandExecute, DecisionAction::Approve },
    network_access = { ConfirmationKind::NetworkAccess, DecisionAction::Approve },
    permission_request = { ConfirmationKind::PermissionRequest, DecisionAction::Approve },
    unknown = { ConfirmationKind::Unknown, DecisionAction::Approve },
)]
fn safe_defaults(kind: ConfirmationKind, expected: DecisionAction) {
    let template = FallbackTemplates::for_kind(kind);
    assert_eq!(template.action, expected);
    assert!(!template.message.is_empty());
}

#[test]
fn deletion_is_the_only_denied_kind() {
    let denied: Vec<ConfirmationKind> = [
        ConfirmationKind::FileWrite,
        ConfirmationKind::FileRead,
        ConfirmationKind::FileDelete,
        ConfirmationKind::PackageInstall,
        ConfirmationKind::CommandExecute,
        ConfirmationKind::NetworkAccess,
        ConfirmationKind::PermissionRequest,
        ConfirmationKind::Unknown,
    ]
    .into_iter()
    .filter(|k| FallbackTemplates::for_kind(*k).action == DecisionAction::Deny)
    .collect();
    assert_eq!(denied, vec![ConfirmationKind::FileDelete]);
}
