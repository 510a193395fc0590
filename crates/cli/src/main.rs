// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dx: operator CLI for trajectory dump storage and job tracking

mod color;
mod commands;
mod env;
mod exit_error;
mod logging;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::dump::DumpArgs;
use commands::jobs::JobsArgs;
use output::OutputFormat;

#[derive(Parser)]
#[command(name = "dx", version, about = "Trajectory dump storage and job tracking", styles = color::styles())]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, default_value_t, global = true)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store, fetch and inspect trajectory dumps
    Dump(DumpArgs),
    /// Inspect and repair job completion tracking
    Jobs(JobsArgs),
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Dump(args) => {
            let storage = commands::dump::storage();
            commands::dump::handle(args.command, &storage, cli.output).await
        }
        Command::Jobs(args) => {
            let tracker = commands::jobs::connect().await?;
            commands::jobs::handle(args.command, &tracker, cli.output).await
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init();

    if let Err(err) = run(cli).await {
        let (code, message) = exit_error::exit_status(&err);
        if let Some(message) = message {
            eprintln!("error: {message}");
        }
        std::process::exit(code);
    }
}
