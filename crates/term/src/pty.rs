// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One worker process supervised over a pseudo-terminal.
//!
//! A blocking reader thread drains the PTY master and hands chunks to the
//! session over a channel, so `expect` can be async and cancellable while
//! the underlying read stays a plain blocking `Read`. All consumed text is
//! also accumulated in an "unlogged" buffer that the caller drains with
//! [`PtySession::take_output`] for persistence, so no bytes are lost between
//! pattern waits.

use crate::decode::LossyDecoder;
use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use regex::Regex;
use std::io::Read;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

const PTY_ROWS: u16 = 24;
const PTY_COLS: u16 = 80;
const READ_BUF: usize = 4096;
const CHUNK_CHANNEL_DEPTH: usize = 256;

/// Errors from the PTY layer.
#[derive(Debug, Error)]
pub enum TermError {
    /// Executable missing, PTY allocation failed, or plumbing setup failed.
    #[error("failed to spawn worker: {0}")]
    SpawnFailed(String),
    #[error("pty i/o: {0}")]
    Io(#[from] std::io::Error),
}

/// Command line for a worker process.
#[derive(Debug, Clone)]
pub struct WorkerCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub cwd: Option<PathBuf>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into(), args: Vec::new(), env: Vec::new(), cwd: None }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }
}

/// Result of waiting for a prompt pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectOutcome {
    /// One of the patterns matched. `prefix` is everything read before the
    /// match start; `matched` is the matching text itself. Earliest match in
    /// the stream wins; ties go to the lowest pattern index.
    Matched { index: usize, prefix: String, matched: String },
    TimedOut,
    Eof,
}

enum Chunk {
    Data(Vec<u8>),
    Eof,
    ReadError(String),
}

/// An open PTY bound to one worker process.
pub struct PtySession {
    child: Box<dyn Child + Send>,
    writer: Box<dyn std::io::Write + Send>,
    rx: mpsc::Receiver<Chunk>,
    decoder: LossyDecoder,
    /// Decoded text not yet consumed by `expect`.
    pending: String,
    /// Decoded text not yet handed to the caller for persistence.
    unlogged: String,
    saw_eof: bool,
    // Held to keep the PTY master open for the lifetime of the session.
    _master: Box<dyn MasterPty + Send>,
}

impl PtySession {
    /// Spawn a worker under a fresh PTY.
    pub fn spawn(command: &WorkerCommand) -> Result<Self, TermError> {
        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(PtySize { rows: PTY_ROWS, cols: PTY_COLS, pixel_width: 0, pixel_height: 0 })
            .map_err(|e| TermError::SpawnFailed(e.to_string()))?;

        let mut builder = CommandBuilder::new(&command.program);
        builder.args(&command.args);
        builder.env("TERM", "xterm-256color");
        for (key, value) in &command.env {
            builder.env(key, value);
        }
        if let Some(cwd) = &command.cwd {
            builder.cwd(cwd);
        }

        debug!(program = %command.program, args = ?command.args, "spawning worker in pty");

        let child = pair
            .slave
            .spawn_command(builder)
            .map_err(|e| TermError::SpawnFailed(e.to_string()))?;

        let mut reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| TermError::SpawnFailed(e.to_string()))?;
        let writer =
            pair.master.take_writer().map_err(|e| TermError::SpawnFailed(e.to_string()))?;

        // Closing the slave here means the master sees EOF once the child exits.
        drop(pair.slave);

        let (tx, rx) = mpsc::channel::<Chunk>(CHUNK_CHANNEL_DEPTH);
        std::thread::spawn(move || {
            let mut buf = [0u8; READ_BUF];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => {
                        let _ = tx.blocking_send(Chunk::Eof);
                        break;
                    }
                    Ok(n) => {
                        if tx.blocking_send(Chunk::Data(buf[..n].to_vec())).is_err() {
                            break;
                        }
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                    Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        std::thread::sleep(Duration::from_millis(1));
                    }
                    Err(e) => {
                        // On Unix the master read fails with EIO once the
                        // child exits; report it and let the session treat
                        // the stream as closed.
                        let _ = tx.blocking_send(Chunk::ReadError(e.to_string()));
                        break;
                    }
                }
            }
        });

        Ok(Self {
            child,
            writer,
            rx,
            decoder: LossyDecoder::new(),
            pending: String::new(),
            unlogged: String::new(),
            saw_eof: false,
            _master: pair.master,
        })
    }

    /// Drain everything read since the last call, for persistence.
    ///
    /// Returns decoded text including anything consumed by `expect` matches
    /// since the previous drain. Never blocks.
    pub fn take_output(&mut self) -> String {
        self.drain_channel();
        std::mem::take(&mut self.unlogged)
    }

    /// True once the worker side of the PTY has closed.
    pub fn is_eof(&self) -> bool {
        self.saw_eof
    }

    /// Wait until one of `patterns` matches the stream, EOF, or `timeout`.
    pub async fn expect(&mut self, patterns: &[Regex], timeout: Duration) -> ExpectOutcome {
        let deadline = Instant::now() + timeout;
        loop {
            self.drain_channel();
            if let Some((index, start, end)) = earliest_match(patterns, &self.pending) {
                let matched = self.pending[start..end].to_string();
                let prefix = self.pending[..start].to_string();
                self.pending.replace_range(..end, "");
                return ExpectOutcome::Matched { index, prefix, matched };
            }
            if self.saw_eof {
                return ExpectOutcome::Eof;
            }
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                return ExpectOutcome::TimedOut;
            };
            match tokio::time::timeout(remaining, self.rx.recv()).await {
                Err(_) => return ExpectOutcome::TimedOut,
                Ok(None) => self.mark_eof(),
                Ok(Some(chunk)) => self.ingest(chunk),
            }
        }
    }

    /// Write a line (with trailing newline) to the worker's stdin.
    pub fn write_line(&mut self, line: &str) -> Result<(), TermError> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    /// Close the worker: graceful terminate, wait up to `grace`, then kill.
    ///
    /// Returns the exit code when the worker exited on its own (or within
    /// the grace period); `None` when it had to be killed or the status is
    /// unknown.
    pub async fn close(&mut self, grace: Duration) -> Option<i32> {
        if let Ok(Some(status)) = self.child.try_wait() {
            return Some(status.exit_code() as i32);
        }
        if !grace.is_zero() {
            self.request_terminate();
            let deadline = Instant::now() + grace;
            while Instant::now() < deadline {
                if let Ok(Some(status)) = self.child.try_wait() {
                    return Some(status.exit_code() as i32);
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            debug!("grace period expired, killing worker");
        }
        let _ = self.child.kill();
        let _ = self.child.wait();
        None
    }

    #[cfg(unix)]
    fn request_terminate(&mut self) {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;
        match self.child.process_id() {
            Some(pid) => {
                let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
            }
            None => {
                let _ = self.child.kill();
            }
        }
    }

    #[cfg(not(unix))]
    fn request_terminate(&mut self) {
        let _ = self.child.kill();
    }

    fn drain_channel(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(chunk) => self.ingest(chunk),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    self.mark_eof();
                    break;
                }
            }
        }
    }

    fn ingest(&mut self, chunk: Chunk) {
        match chunk {
            Chunk::Data(bytes) => {
                let text = self.decoder.feed(&bytes);
                self.pending.push_str(&text);
                self.unlogged.push_str(&text);
            }
            Chunk::Eof => self.mark_eof(),
            Chunk::ReadError(e) => {
                warn!(error = %e, "pty read error, treating stream as closed");
                self.mark_eof();
            }
        }
    }

    fn mark_eof(&mut self) {
        if !self.saw_eof {
            let tail = self.decoder.finish();
            self.pending.push_str(&tail);
            self.unlogged.push_str(&tail);
            self.saw_eof = true;
        }
    }
}

fn earliest_match(patterns: &[Regex], text: &str) -> Option<(usize, usize, usize)> {
    let mut best: Option<(usize, usize, usize)> = None;
    for (i, re) in patterns.iter().enumerate() {
        if let Some(m) = re.find(text) {
            let earlier = match best {
                None => true,
                Some((_, start, _)) => m.start() < start,
            };
            if earlier {
                best = Some((i, m.start(), m.end()));
            }
        }
    }
    best
}

#[cfg(test)]
#[path = "pty_tests.rs"]
mod tests;
