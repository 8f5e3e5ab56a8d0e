//! # Tarball Main Entry Point
//!
//! File: cli/src/main.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! This file serves as the main entry point for the `tarball` CLI.
//! It handles:
//! - Command-line argument parsing using Clap
//! - Setting up the logging system based on verbosity flags
//! - Loading configuration and routing to the command handlers
//! - Wiring Ctrl-C to cooperative cancellation
//! - Rendering errors and choosing the process exit code
//!
//! ## Examples
//!
//! ```bash
//! # Get help
//! tarball --help
//!
//! # Create with increased verbosity
//! tarball -vv create -s ./photos -o photos.tar.gz
//!
//! # Use a specific configuration file
//! tarball --config ./ci-tarball.toml create -s dist -o dist.tar.gz
//! ```
//!
//! ## Exit Codes
//!
//! `0` on success. Archive failures exit with the code of their `ErrorKind`
//! (`NotFound` 2, `PermissionDenied` 3, `IOError` 4, `CorruptArchive` 5,
//! `PathTraversal` 6, `AlreadyExists` 7, `InvalidInput` 8, `Cancelled` 130);
//! anything else (configuration, prompts) exits with `1`.
//!
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

mod commands; // Subcommand handlers (create, extract, list)
mod common; // Archive engine and shared utilities
mod core; // Errors, configuration, cancellation

use crate::core::cancel::CancelToken;
use crate::core::error::{find_archive_error, Result};

/// Defines the top-level command-line arguments structure using Clap's derive macros.
#[derive(Parser, Debug)]
#[command(
    name = "tarball",
    about = "Create, extract and list tar archives with optional gzip compression",
    propagate_version = true,
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Read settings from this file instead of the user and project config files
    #[arg(long, global = true, env = "TARBALL_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(alias = "c")]
    Create(commands::create::CreateArgs),
    #[command(alias = "x")]
    Extract(commands::extract::ExtractArgs),
    #[command(alias = "ls")]
    List(commands::list::ListArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    tracing::debug!("Parsed CLI arguments: {:?}", cli);

    let cancel = CancelToken::new();
    watch_for_interrupt(cancel.clone());

    if let Err(e) = run(cli, cancel).await {
        tracing::error!("Command execution failed: {:?}", e);
        eprintln!("{}", render_error(&e));
        std::process::exit(exit_code(&e));
    }
}

async fn run(cli: Cli, cancel: CancelToken) -> Result<()> {
    let config =
        core::config::load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    match cli.command {
        Commands::Create(args) => {
            commands::create::handle_create(args, &config.create, cancel).await
        }
        Commands::Extract(args) => {
            commands::extract::handle_extract(args, &config.extract, cancel).await
        }
        Commands::List(args) => commands::list::handle_list(args).await,
    }
}

/// First Ctrl-C asks the running operation to stop after the current entry;
/// a second one exits at once.
fn watch_for_interrupt(cancel: CancelToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        eprintln!("Interrupted: stopping after the current entry (Ctrl-C again to quit now)");
        cancel.cancel();
        if tokio::signal::ctrl_c().await.is_ok() {
            std::process::exit(130);
        }
    });
}

fn render_error(err: &anyhow::Error) -> String {
    match find_archive_error(err) {
        Some(archive_err) => format!("Error [{}]: {}", archive_err.kind(), archive_err.detail()),
        None => format!("Error: {:#}", err),
    }
}

fn exit_code(err: &anyhow::Error) -> i32 {
    find_archive_error(err)
        .map(|archive_err| archive_err.kind().exit_code())
        .unwrap_or(1)
}
