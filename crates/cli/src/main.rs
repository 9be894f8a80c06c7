// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `cicero`: operator entry point for the reconciliation engine.
//!
//! A thin binary — config loading, logging setup, and wiring the engine's
//! task loops into a running process (`serve`), plus a minimal operator
//! escape hatch (`cancel <run-id>`) standing in for the out-of-scope web UI.

mod commands;
mod config;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "cicero", about = "Fact-driven workflow reconciliation engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the Brain, Invoker, and job-event consumer until shut down.
    Serve,
    /// Cancel a Run: delete its RunOutput and deregister its job.
    Cancel {
        /// The Run ID (also the Kubernetes job name's UUID suffix).
        run_id: uuid::Uuid,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = config::Config::load()?;

    match cli.command {
        Command::Serve => commands::serve::run(config).await,
        Command::Cancel { run_id } => commands::cancel::run(config, cicero_core::RunId::from(run_id)).await,
    }
}
