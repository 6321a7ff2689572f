// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! fm: run a batch of AI coding tasks under supervision.

mod output;
mod tasks;

use anyhow::Context;
use clap::{Parser, Subcommand};
use fm_runtime::{Orchestrator, OrchestratorConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fm", about = "Foreman: parallel AI coding worker orchestrator", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run every task in a task file through the worker pool.
    Run {
        /// TOML file with `[[task]]` entries (name, prompt, depends_on).
        #[arg(long)]
        tasks: PathBuf,
        /// Orchestrator config file; defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Append orchestrator logs to this file instead of stderr.
        #[arg(long)]
        log_file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run { tasks, config, log_file } => {
            let _log_guard = init_tracing(log_file.as_deref())?;

            let config = match config {
                Some(path) => OrchestratorConfig::load(&path)
                    .with_context(|| format!("loading config {}", path.display()))?,
                None => OrchestratorConfig::default(),
            };
            let batch = tasks::load(&tasks)
                .with_context(|| format!("loading tasks {}", tasks.display()))?;
            anyhow::ensure!(!batch.is_empty(), "no tasks in {}", tasks.display());

            let mut orchestrator =
                Orchestrator::from_config(config).context("building orchestrator")?;
            orchestrator.start_heartbeat();

            let results = orchestrator.run(batch).await;
            print!("{}", output::render_results(&results));
            println!("{}", output::render_summary(&orchestrator.summary()));

            if results.iter().any(|r| !r.success) {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

fn init_tracing(
    log_file: Option<&std::path::Path>,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match log_file {
        Some(path) => {
            let dir = path.parent().unwrap_or_else(|| std::path::Path::new("."));
            let name = path.file_name().map(PathBuf::from).unwrap_or_else(|| "fm.log".into());
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer).init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            Ok(None)
        }
    }
}
