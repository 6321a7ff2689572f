// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable per-worker artifacts.
//!
//! Four files per worker, all UTF-8, all opened in append mode and flushed
//! per write so tailers see records within a poll interval:
//!
//! - `raw_terminal.log` — ANSI-stripped PTY capture
//! - `dialogue_transcript.jsonl` — one JSON object per dialogue record
//! - `dialogue_transcript.txt` — human-readable rendering
//! - `orchestrator_terminal.log` — decision trace, one line per event
//!
//! Writes never fail into the hot path; errors are demoted to warnings.

use chrono::{DateTime, Local, Utc};
use fm_core::{DialogueBody, DialogueEntry, WorkerId};
use fm_term::strip_ansi;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const RAW_TERMINAL_FILE: &str = "raw_terminal.log";
pub const DIALOGUE_JSONL_FILE: &str = "dialogue_transcript.jsonl";
pub const DIALOGUE_TXT_FILE: &str = "dialogue_transcript.txt";
pub const ORCHESTRATOR_LOG_FILE: &str = "orchestrator_terminal.log";

const RULE_HEAVY: &str =
    "================================================================================";
const RULE_LIGHT: &str =
    "--------------------------------------------------------------------------------";

/// Streaming writer for one worker's artifacts.
pub struct TranscriptWriter {
    worker_id: WorkerId,
    raw_path: PathBuf,
    orchestrator_path: PathBuf,
    raw: Option<File>,
    jsonl: Option<File>,
    txt: Option<File>,
    orchestrator: Option<File>,
}

impl TranscriptWriter {
    /// Open all four artifacts under `dir` and write their headers.
    pub fn new(dir: &Path, worker_id: &WorkerId, task_name: &str) -> Self {
        let raw_path = dir.join(RAW_TERMINAL_FILE);
        let orchestrator_path = dir.join(ORCHESTRATOR_LOG_FILE);
        let mut writer = Self {
            worker_id: worker_id.clone(),
            raw: open_append(&raw_path),
            jsonl: open_append(&dir.join(DIALOGUE_JSONL_FILE)),
            txt: open_append(&dir.join(DIALOGUE_TXT_FILE)),
            orchestrator: open_append(&orchestrator_path),
            raw_path,
            orchestrator_path,
        };

        let started = Local::now().format("%Y-%m-%d %H:%M:%S");
        writer.write(
            Artifact::Raw,
            &format!(
                "=== Worker Terminal Output: {} ===\n=== Task: {} ===\n=== Started: {} ===\n\n",
                writer.worker_id, task_name, started
            ),
        );
        writer.write(
            Artifact::Orchestrator,
            &format!(
                "=== Orchestrator Terminal Output ===\n=== Worker: {} ===\n=== Started: {} ===\n\n",
                writer.worker_id, started
            ),
        );
        writer.write(
            Artifact::Txt,
            &format!(
                "{RULE_HEAVY}\nDIALOGUE TRANSCRIPT: {}\nTask: {}\nStarted: {}\n{RULE_HEAVY}\n\n",
                writer.worker_id, task_name, started
            ),
        );
        writer
    }

    /// Absolute path of the raw PTY capture.
    pub fn raw_terminal_path(&self) -> &Path {
        &self.raw_path
    }

    /// Absolute path of the decision trace.
    pub fn decision_log_path(&self) -> &Path {
        &self.orchestrator_path
    }

    /// Append PTY output to `raw_terminal.log`, stripped of ANSI sequences.
    pub fn append_raw(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let mut clean = strip_ansi(text);
        if !clean.ends_with('\n') {
            clean.push('\n');
        }
        self.write(Artifact::Raw, &clean);
    }

    /// Append one dialogue record to both the JSONL and text transcripts.
    pub fn append_dialogue(&mut self, entry: &DialogueEntry) {
        match serde_json::to_string(entry) {
            Ok(line) => {
                self.write(Artifact::Jsonl, &format!("{line}\n"));
            }
            Err(e) => warn!(worker_id = %self.worker_id, error = %e, "dialogue record serialization failed"),
        }

        let mut rendered = format!(
            "[{}] {} ({})\n",
            format_entry_time(entry.timestamp),
            entry.direction,
            entry.kind_label(),
        );
        if let DialogueBody::Response { confirmation_kind, matched_message, .. } = &entry.body {
            rendered.push_str(&format!("  Confirmation Kind: {confirmation_kind}\n"));
            if let Some(matched) = matched_message {
                rendered.push_str(&format!("  Matched Message: {matched}\n"));
            }
        }
        rendered.push_str(&format!("{RULE_LIGHT}\n{}\n{RULE_HEAVY}\n\n", entry.content()));
        self.write(Artifact::Txt, &rendered);
    }

    /// Append one line to the orchestrator decision trace.
    pub fn log_orchestrator(&mut self, category: &str, message: &str) {
        let clean = strip_ansi(message);
        let line =
            format!("[{}] [{}] {}\n", Local::now().format("%H:%M:%S"), category, clean.trim_end());
        self.write(Artifact::Orchestrator, &line);
    }

    fn write(&mut self, artifact: Artifact, data: &str) {
        let (file, label) = match artifact {
            Artifact::Raw => (&mut self.raw, RAW_TERMINAL_FILE),
            Artifact::Jsonl => (&mut self.jsonl, DIALOGUE_JSONL_FILE),
            Artifact::Txt => (&mut self.txt, DIALOGUE_TXT_FILE),
            Artifact::Orchestrator => (&mut self.orchestrator, ORCHESTRATOR_LOG_FILE),
        };
        if let Some(f) = file {
            if let Err(e) = f.write_all(data.as_bytes()).and_then(|()| f.flush()) {
                warn!(worker_id = %self.worker_id, artifact = label, error = %e, "transcript write failed");
            }
        }
    }
}

enum Artifact {
    Raw,
    Jsonl,
    Txt,
    Orchestrator,
}

fn open_append(path: &Path) -> Option<File> {
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => Some(file),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to open transcript artifact");
            None
        }
    }
}

fn format_entry_time(epoch_secs: f64) -> String {
    let secs = epoch_secs.trunc() as i64;
    let nanos = (epoch_secs.fract() * 1e9) as u32;
    match DateTime::<Utc>::from_timestamp(secs, nanos) {
        Some(dt) => dt.with_timezone(&Local).format("%H:%M:%S%.3f").to_string(),
        None => format!("{epoch_secs:.3}"),
    }
}

#[cfg(test)]
#[path = "transcript_tests.rs"]
mod tests;
