// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic safety rules.
//!
//! Pure and synchronous: the verdict is a function of the request, the
//! workspace root, and the dependency manifest snapshot taken at
//! construction. No I/O happens during evaluation.

use fm_core::{ConfirmationKind, ConfirmationRequest};
use std::path::{Component, Path, PathBuf};

/// Protected artifacts: version-control metadata, environment files,
/// lockfiles, top-level config. Matched as case-insensitive substrings of
/// the target path.
const PROTECTED_FILES: &[&str] = &[
    ".git/",
    ".git\\",
    ".env",
    "config.py",
    "settings.py",
    "requirements.txt",
    "setup.py",
    "pyproject.toml",
    "cargo.toml",
    "cargo.lock",
    "package.json",
    "package-lock.json",
];

/// Destructive shell fragments: recursive deletion, disk formatting, raw
/// block-device writes.
const DANGEROUS_COMMANDS: &[&str] =
    &["rm -r", "rm -fr", "del /f /s /q", "format c:", "dd if=", "mkfs", "> /dev/sd"];

/// Manifest files consulted for the package-install rule, in priority order.
const MANIFEST_CANDIDATES: &[&str] = &["requirements.txt", "Cargo.toml"];

/// Outcome of rule evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleVerdict {
    Approve(String),
    Deny(String),
    /// Rules cannot decide; escalate to the arbiter.
    Inconclusive,
}

impl RuleVerdict {
    pub fn is_conclusive(&self) -> bool {
        !matches!(self, RuleVerdict::Inconclusive)
    }
}

/// Workspace-aware rule engine.
pub struct RuleEngine {
    workspace_root: PathBuf,
    /// Lowercased dependency names from the workspace manifest.
    manifest_packages: Vec<String>,
}

impl RuleEngine {
    /// Snapshot the workspace root and its dependency manifest.
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        let raw: PathBuf = workspace_root.into();
        let workspace_root = raw.canonicalize().unwrap_or(raw);
        let manifest_packages = load_manifest_packages(&workspace_root);
        Self { workspace_root, manifest_packages }
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Evaluate a request. Safe patterns approve, dangerous patterns deny,
    /// everything else is inconclusive.
    pub fn evaluate(&self, request: &ConfirmationRequest) -> RuleVerdict {
        if let Some(verdict) = self.check_safe(request) {
            return verdict;
        }
        if let Some(verdict) = self.check_dangerous(request) {
            return verdict;
        }
        RuleVerdict::Inconclusive
    }

    fn check_safe(&self, request: &ConfirmationRequest) -> Option<RuleVerdict> {
        match request.kind {
            ConfirmationKind::FileWrite => {
                let file = request.target()?;
                self.contains(file).then(|| {
                    RuleVerdict::Approve("file creation in workspace is safe".to_string())
                })
            }
            ConfirmationKind::FileRead => {
                let file = request.target()?;
                self.contains(file).then(|| {
                    RuleVerdict::Approve("file reading in workspace is safe".to_string())
                })
            }
            ConfirmationKind::PackageInstall => {
                let package = request.target()?;
                self.in_manifest(package).then(|| {
                    RuleVerdict::Approve("package is listed in the dependency manifest".to_string())
                })
            }
            _ => None,
        }
    }

    fn check_dangerous(&self, request: &ConfirmationRequest) -> Option<RuleVerdict> {
        match request.kind {
            ConfirmationKind::FileDelete => {
                let file = request.target()?.to_lowercase();
                PROTECTED_FILES
                    .iter()
                    .any(|p| file.contains(p))
                    .then(|| RuleVerdict::Deny("cannot delete protected files".to_string()))
            }
            ConfirmationKind::CommandExecute => {
                let command = request.target()?.to_lowercase();
                DANGEROUS_COMMANDS
                    .iter()
                    .any(|c| command.contains(c))
                    .then(|| RuleVerdict::Deny("destructive system command".to_string()))
            }
            _ => None,
        }
    }

    /// Whether a (possibly relative) path resolves under the workspace root.
    fn contains(&self, path: &str) -> bool {
        let candidate = Path::new(path);
        let joined = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.workspace_root.join(candidate)
        };
        match normalize(&joined) {
            Some(normalized) => normalized.starts_with(&self.workspace_root),
            None => false,
        }
    }

    fn in_manifest(&self, package: &str) -> bool {
        let name = strip_version_suffix(package).to_lowercase();
        self.manifest_packages.iter().any(|p| *p == name)
    }
}

/// Lexical normalization: resolves `.` and `..` without touching the
/// filesystem (targets usually do not exist yet).
fn normalize(path: &Path) -> Option<PathBuf> {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // `..` above the root escapes; refuse to normalize.
                match parts.last() {
                    Some(Component::Normal(_)) => {
                        parts.pop();
                    }
                    _ => return None,
                }
            }
            other => parts.push(other),
        }
    }
    Some(parts.iter().collect())
}

fn strip_version_suffix(package: &str) -> &str {
    let mut name = package;
    for sep in ["==", ">=", "<=", "~=", "!="] {
        if let Some((head, _)) = name.split_once(sep) {
            name = head;
        }
    }
    name.trim()
}

fn load_manifest_packages(workspace_root: &Path) -> Vec<String> {
    for candidate in MANIFEST_CANDIDATES {
        let path = workspace_root.join(candidate);
        let Ok(contents) = std::fs::read_to_string(&path) else { continue };
        return match *candidate {
            "Cargo.toml" => cargo_packages(&contents),
            _ => requirements_packages(&contents),
        };
    }
    Vec::new()
}

fn requirements_packages(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| strip_version_suffix(line).to_lowercase())
        .collect()
}

fn cargo_packages(contents: &str) -> Vec<String> {
    let Ok(value) = contents.parse::<toml::Table>() else { return Vec::new() };
    let mut packages = Vec::new();
    for table in ["dependencies", "dev-dependencies"] {
        if let Some(deps) = value.get(table).and_then(|v| v.as_table()) {
            packages.extend(deps.keys().map(|k| k.to_lowercase()));
        }
    }
    packages
}

#[cfg(test)]
#[path = "rules_tests.rs"]
mod tests;
