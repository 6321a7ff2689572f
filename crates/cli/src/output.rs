// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Result rendering for the terminal.

use fm_core::{StatusSummary, TaskResult};
use std::fmt::Write;

/// One line per task, in submission order.
pub fn render_results(results: &[TaskResult]) -> String {
    let mut out = String::new();
    for result in results {
        let mark = if result.success { "ok " } else { "FAIL" };
        let _ = write!(
            &mut out,
            "{mark}  {}  {}  {:.1}s",
            result.worker_id, result.name, result.duration_secs
        );
        if let Some(message) = &result.error_message {
            let _ = write!(&mut out, "  ({message})");
        }
        out.push('\n');
    }
    out
}

pub fn render_summary(summary: &StatusSummary) -> String {
    format!(
        "{} workers: {} completed, {} failed, {} confirmations handled",
        summary.total_workers,
        summary.completed_workers,
        summary.error_workers,
        summary.total_confirmations,
    )
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
