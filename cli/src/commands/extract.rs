//! # Extract Command (`tarball extract`)
//!
//! File: cli/src/commands/extract.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Restores a tarball under a destination directory, which is created if it
//! does not exist. Gzip-compressed and plain archives are both accepted; the
//! format is detected from the file itself.
//!
//! Entries that would land outside the destination abort the extraction with
//! `PathTraversal` before anything is written for them.
//!
//! ```bash
//! tarball extract -t photos.tar.gz -d ./restore
//! tarball extract -t photos.tar.gz -d ./restore --no-overwrite
//! ```
//!
use crate::{
    common::{
        archive::{self, ExtractConfig, ExtractReport, OverwritePolicy},
        ui::prompt,
    },
    core::{cancel::CancelToken, config::ExtractDefaults, error::Result},
};
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(about = "Extract a tarball into a directory")]
pub struct ExtractArgs {
    /// Tarball to extract (prompted for when omitted)
    #[arg(short, long)]
    tarball: Option<PathBuf>,

    /// Destination directory (prompted for when omitted)
    #[arg(short, long)]
    destination: Option<PathBuf>,

    /// Fail instead of replacing files that already exist
    #[arg(long)]
    no_overwrite: bool,
}

/// Resolves the arguments, extracts on the blocking pool, and prints a summary.
pub async fn handle_extract(
    args: ExtractArgs,
    defaults: &ExtractDefaults,
    cancel: CancelToken,
) -> Result<()> {
    let config = resolve(args, defaults, prompt::prompt_path)?;
    info!(
        "Handling extract command (tarball: {:?}, destination: {:?}, {:?})",
        config.tarball, config.destination, config.overwrite
    );

    let report = tokio::task::spawn_blocking(move || archive::extract_archive(&config, &cancel))
        .await
        .context("Extract task terminated unexpectedly")?
        .context("Failed to extract tarball")?;

    print_report(&report);
    Ok(())
}

fn resolve<P>(args: ExtractArgs, defaults: &ExtractDefaults, mut prompt_for: P) -> Result<ExtractConfig>
where
    P: FnMut(&str) -> Result<PathBuf>,
{
    let tarball = match args.tarball {
        Some(path) => path,
        None => prompt_for("Enter tarball path")?,
    };
    let destination = match args.destination {
        Some(path) => path,
        None => prompt_for("Enter destination path")?,
    };
    Ok(ExtractConfig {
        tarball,
        destination,
        overwrite: OverwritePolicy::from_flag(defaults.overwrite && !args.no_overwrite),
    })
}

fn print_report(report: &ExtractReport) {
    let counts = &report.counts;
    println!(
        "Extracted {} files, {} directories, {} symlinks ({} bytes) into {} from {} archive",
        counts.files,
        counts.directories,
        counts.symlinks,
        counts.payload_bytes,
        report.destination.display(),
        report.format
    );
    if !report.unsupported.is_empty() {
        eprintln!("Skipped {} unsupported entries:", report.unsupported.len());
        for entry in &report.unsupported {
            eprintln!("- {} ({})", entry.path, entry.kind);
        }
    }
}
