// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Docscan command-line tool.
//
// Entry point. Initialises logging, loads the scanner configuration, and runs
// one subcommand. Failures are printed as plain-language messages.

mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;
use docscan_core::ScannerConfig;
use docscan_core::error::Result;
use docscan_core::human_errors::humanize_error;

use cli::{Args, Command};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    tracing::debug!(?args, "Docscan starting");

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            let human = humanize_error(&err);
            eprintln!("{}", human.message);
            eprintln!("{}", human.suggestion);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => ScannerConfig::load(path)?,
        None => ScannerConfig::default(),
    };

    match args.command {
        Command::Rectify {
            input,
            corners,
            output,
            rotate,
            format,
        } => {
            let path = commands::rectify(config, &input, corners, output, rotate, format).await?;
            println!("{}", path.display());
        }
        Command::Rotate {
            input,
            times,
            output,
        } => {
            let path = commands::rotate(&config, &input, times, output)?;
            println!("{}", path.display());
        }
        Command::Preview {
            input,
            viewport,
            corners,
            output,
        } => {
            let path = commands::preview(&config, &input, viewport, corners, output)?;
            println!("{}", path.display());
        }
        Command::Attach {
            scanned,
            store,
            record,
            field,
            prefix,
            table,
        } => {
            let (url, row) =
                commands::attach(&scanned, &store, &table, &record, &field, &prefix)?;
            println!("{url}");
            tracing::debug!(record = %serde_json::to_string(&row)?, "Record after upload");
        }
    }
    Ok(())
}
