//! # Create Command (`tarball create`)
//!
//! File: cli/src/commands/create.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Archives a directory or a single file into a tarball, gzip-compressed unless
//! told otherwise.
//!
//! ## Workflow
//!
//! 1. Combine the command-line flags with the `[create]` section of the
//!    configuration (flags win) into an immutable `CreateConfig`, prompting for
//!    `--source` / `--output` when they were not given.
//! 2. Run `archive::create_archive` on Tokio's blocking pool.
//! 3. Print a one-line summary, file counts by media type, and any entries
//!    that had to be skipped, once the archive is safely in place.
//!
//! ## Examples
//!
//! ```bash
//! tarball create -s ./photos -o photos.tar.gz
//! tarball create -s ./photos -o photos.tar --no-compress
//! tarball create -s ~/Pictures -o pics.tar.gz --filter photos
//! tarball create -s ./site -o site.tar.gz --file-type html --file-type css --reproducible
//! ```
//!
use crate::{
    common::{
        archive::{
            self, Compression, CreateConfig, CreateReport, EntryFilter, FilterMode, TypeCounts,
        },
        ui::prompt,
    },
    core::{cancel::CancelToken, config::CreateDefaults, error::Result},
};
use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, warn};

/// # Create Arguments (`CreateArgs`)
///
/// Flags left unset fall back to the configuration file, then to the built-in
/// defaults (gzip level 6, recursive, no filter).
#[derive(Parser, Debug)]
#[command(about = "Create a tarball from a directory or file")]
pub struct CreateArgs {
    /// Source directory or file to archive (prompted for when omitted)
    #[arg(short, long)]
    source: Option<PathBuf>,

    /// Output tarball path (prompted for when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Compress the archive with gzip
    #[arg(long, overrides_with = "no_compress")]
    compress: bool,

    /// Write a plain, uncompressed tar
    #[arg(long, overrides_with = "compress")]
    no_compress: bool,

    /// Gzip compression level, 0 (fastest) to 9 (smallest)
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=9))]
    level: Option<u32>,

    /// Only archive the top level of the source directory
    #[arg(long)]
    no_recursive: bool,

    /// Which files to include
    #[arg(long, value_enum)]
    filter: Option<FilterMode>,

    /// Only include files with this extension (repeatable; `--filter all` only)
    #[arg(long = "file-type", value_name = "EXT")]
    file_types: Vec<String>,

    /// Store all modification times as 0 so identical trees give identical archives
    #[arg(long)]
    reproducible: bool,
}

/// # Handle Create Command (`handle_create`)
///
/// Resolves the arguments (prompting on stdin for missing paths), runs the
/// archive pipeline off the async runtime, and reports the result.
///
/// ## Errors
///
/// Returns an error if a prompt fails or the archive engine fails. The
/// `ArchiveError` stays in the error chain so `main` can pick the exit code.
pub async fn handle_create(
    args: CreateArgs,
    defaults: &CreateDefaults,
    cancel: CancelToken,
) -> Result<()> {
    let config = resolve(args, defaults, prompt::prompt_path)?;
    info!(
        "Handling create command (source: {:?}, output: {:?}, {})",
        config.source, config.output, config.compression
    );

    let report = tokio::task::spawn_blocking(move || archive::create_archive(&config, &cancel))
        .await
        .context("Archive task terminated unexpectedly")?
        .context("Failed to create tarball")?;

    print_report(&report);
    Ok(())
}

/// Merges flags, configuration and prompt answers into a `CreateConfig`.
fn resolve<P>(args: CreateArgs, defaults: &CreateDefaults, mut prompt_for: P) -> Result<CreateConfig>
where
    P: FnMut(&str) -> Result<PathBuf>,
{
    let source = match args.source {
        Some(path) => path,
        None => prompt_for("Enter source path")?,
    };
    let output = match args.output {
        Some(path) => path,
        None => prompt_for("Enter output tarball path")?,
    };

    let compress = if args.no_compress {
        false
    } else {
        args.compress || defaults.compress
    };
    let level = args.level.unwrap_or(defaults.compression_level);
    let mode = args.filter.unwrap_or(defaults.filter_mode);
    let file_types = if args.file_types.is_empty() {
        defaults.file_types.clone()
    } else {
        args.file_types
    };
    if mode != FilterMode::All && !file_types.is_empty() {
        warn!(
            "File types {:?} are ignored with the '{}' filter",
            file_types, mode
        );
    }

    Ok(CreateConfig {
        source,
        output,
        recursive: defaults.recursive && !args.no_recursive,
        filter: EntryFilter::new(mode, file_types),
        compression: Compression::from_settings(compress, level),
        normalize_mtime: args.reproducible || defaults.normalize_mtime,
    })
}

fn print_report(report: &CreateReport) {
    let counts = &report.counts;
    println!(
        "Created {} ({} files, {} directories, {} symlinks, {} bytes, {})",
        report.output.display(),
        counts.files,
        counts.directories,
        counts.symlinks,
        report.archive_bytes,
        report.compression
    );
    if counts.files > 0 {
        println!("By type: {}", format_types(&report.types));
    }
    if report.filtered > 0 {
        println!("{} entries left out by the filter", report.filtered);
    }
    if !report.skipped.is_empty() {
        eprintln!("Skipped {} unreadable entries:", report.skipped.len());
        for skipped in &report.skipped {
            eprintln!("- {}: {}", skipped.path.display(), skipped.error);
        }
    }
}

/// `photos 2 (jpg 1, png 1), videos 0, other 1 (txt 1)`
fn format_types(types: &TypeCounts) -> String {
    [("photos", &types.photos), ("videos", &types.videos), ("other", &types.others)]
        .iter()
        .map(|(label, family)| {
            let total = TypeCounts::total(family);
            if total == 0 {
                return format!("{} 0", label);
            }
            let detail: Vec<String> = family
                .iter()
                .map(|(ext, n)| {
                    let ext = if ext.is_empty() { "no extension" } else { ext.as_str() };
                    format!("{} {}", ext, n)
                })
                .collect();
            format!("{} {} ({})", label, total, detail.join(", "))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CreateArgs {
        CreateArgs::try_parse_from(std::iter::once("create").chain(args.iter().copied()))
            .expect("arguments should parse")
    }

    fn no_prompt(label: &str) -> Result<PathBuf> {
        panic!("unexpected prompt: {}", label)
    }

    #[test]
    fn test_flags_parse() {
        let args = parse(&[
            "-s", "src", "-o", "out.tar", "--no-compress", "--level", "3", "--filter", "videos",
            "--file-type", "mp4", "--file-type", "mov", "--reproducible", "--no-recursive",
        ]);
        assert_eq!(args.source, Some(PathBuf::from("src")));
        assert_eq!(args.output, Some(PathBuf::from("out.tar")));
        assert!(args.no_compress);
        assert_eq!(args.level, Some(3));
        assert_eq!(args.filter, Some(FilterMode::Videos));
        assert_eq!(args.file_types, vec!["mp4", "mov"]);
        assert!(args.reproducible);
        assert!(args.no_recursive);
    }

    #[test]
    fn test_level_out_of_range_rejected() {
        assert!(CreateArgs::try_parse_from(["create", "--level", "10"]).is_err());
        assert!(CreateArgs::try_parse_from(["create", "--filter", "music"]).is_err());
    }

    #[test]
    fn test_defaults_come_from_config() -> Result<()> {
        let defaults = CreateDefaults {
            compress: false,
            compression_level: 9,
            recursive: true,
            filter_mode: FilterMode::Photos,
            file_types: Vec::new(),
            normalize_mtime: true,
        };
        let config = resolve(parse(&["-s", "a", "-o", "b.tar"]), &defaults, no_prompt)?;
        assert_eq!(config.compression, Compression::None);
        assert_eq!(config.filter.mode(), FilterMode::Photos);
        assert!(config.normalize_mtime);
        assert!(config.recursive);
        Ok(())
    }

    #[test]
    fn test_flags_override_config() -> Result<()> {
        let defaults = CreateDefaults {
            compress: false,
            ..CreateDefaults::default()
        };
        let args = parse(&["-s", "a", "-o", "b.tgz", "--compress", "--level", "1", "--no-recursive"]);
        let config = resolve(args, &defaults, no_prompt)?;
        assert_eq!(config.compression, Compression::Gzip { level: 1 });
        assert!(!config.recursive);

        // The last of --compress / --no-compress wins.
        let args = parse(&["-s", "a", "-o", "b", "--compress", "--no-compress"]);
        assert_eq!(resolve(args, &CreateDefaults::default(), no_prompt)?.compression, Compression::None);
        Ok(())
    }

    #[test]
    fn test_missing_paths_are_prompted() -> Result<()> {
        let mut asked = Vec::new();
        let config = resolve(parse(&[]), &CreateDefaults::default(), |label| {
            asked.push(label.to_string());
            Ok(PathBuf::from(format!("answer-{}", asked.len())))
        })?;
        assert_eq!(asked, vec!["Enter source path", "Enter output tarball path"]);
        assert_eq!(config.source, PathBuf::from("answer-1"));
        assert_eq!(config.output, PathBuf::from("answer-2"));
        assert_eq!(config.compression, Compression::gzip(6));
        Ok(())
    }

    #[test]
    fn test_format_types() {
        let mut types = TypeCounts::default();
        for path in ["t/a.jpg", "t/b.png", "t/c.JPG", "t/notes.txt", "t/Makefile"] {
            types.record(&archive::Entry::file(path, 1, 0o644, 0));
        }
        assert_eq!(
            format_types(&types),
            "photos 3 (jpg 2, png 1), videos 0, other 2 (no extension 1, txt 1)"
        );
    }
}
