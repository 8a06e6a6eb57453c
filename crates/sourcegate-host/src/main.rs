// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sourcegate: native capability bridge for sandboxed source pages
//
// Entry point. Initialises logging (stderr only, stdout carries protocol
// lines), loads the bridge configuration and runs the chosen subcommand.

mod data_dir;
mod protocol;
mod serve;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio::io::BufReader;

use sourcegate_bridge::{ScriptInjector, ScriptVariant};
use sourcegate_core::config::BridgeConfig;
use sourcegate_core::error::Result;
use sourcegate_security::BridgeNames;

#[derive(Debug, Parser)]
#[command(name = "sourcegate", version, about = "Native capability bridge for sandboxed source pages")]
struct Cli {
    /// Data directory holding config.json, the file sandbox and downloads.
    #[arg(long, global = true, env = "SOURCEGATE_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one bridge session over line-delimited JSON on stdin/stdout.
    Serve {
        /// Serve the run-only script for the decoy URL.
        #[arg(long)]
        minimal: bool,
    },
    /// Print a fresh session's injection script.
    Inject {
        #[arg(long)]
        minimal: bool,
        /// Append the orientation/close shim.
        #[arg(long)]
        basic: bool,
    },
    /// Print the effective configuration as JSON.
    Config {
        /// Also write it to config.json in the data directory.
        #[arg(long)]
        write: bool,
    },
}

fn variant(minimal: bool) -> ScriptVariant {
    if minimal {
        ScriptVariant::Minimal
    } else {
        ScriptVariant::Full
    }
}

async fn run(cli: Cli) -> Result<()> {
    let dir = data_dir::data_dir(cli.data_dir.as_deref());
    let config = BridgeConfig::load(&dir);
    tracing::debug!(path = %dir.display(), "data directory");

    match cli.command {
        Command::Serve { minimal } => {
            let stdin = BufReader::new(tokio::io::stdin());
            serve::serve(&config, variant(minimal), stdin, tokio::io::stdout()).await
        }
        Command::Inject { minimal, basic } => {
            let injector = ScriptInjector::new(BridgeNames::generate());
            print!("{}", injector.script(variant(minimal)));
            if basic {
                print!("{}", injector.basic_script());
            }
            Ok(())
        }
        Command::Config { write } => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            if write {
                config.persist(&dir)?;
                tracing::info!(path = %dir.display(), "configuration written");
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Sourcegate starting");

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "sourcegate failed");
            ExitCode::FAILURE
        }
    }
}
