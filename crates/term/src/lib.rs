// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fm-term: pseudo-terminal supervision for worker processes.
//!
//! Wraps one worker process in an OS PTY (Unix PTY or ConPTY via
//! `portable-pty`) and exposes the four primitives the session loop needs:
//! non-blocking output drain, pattern wait (`expect`), line write, and
//! graceful close. Reads and writes are byte-level on the wire; decoding to
//! UTF-8 happens at the read boundary with replace-on-error semantics.

pub mod ansi;
pub mod decode;
pub mod pty;

pub use ansi::strip_ansi;
pub use decode::LossyDecoder;
pub use pty::{ExpectOutcome, PtySession, TermError, WorkerCommand};
