//! # List Command (`tarball list`)
//!
//! File: cli/src/commands/list.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Prints the entries of a tarball in archive order without extracting
//! anything. The short form prints one path per line; `--long` adds an
//! `ls -l`-style mode string, size and UTC modification time:
//!
//! ```text
//! drwxr-xr-x          0 2024-05-01 09:30 photos
//! -rw-r--r--    2345678 2024-05-01 09:29 photos/beach.jpg
//! lrwxrwxrwx          0 2024-05-01 09:31 photos/latest -> beach.jpg
//! ```
//!
use crate::{
    common::{
        archive::{self, Entry, EntryKind},
        ui::prompt,
    },
    core::error::{ArchiveError, Result},
};
use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Parser;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(about = "List the contents of a tarball")]
pub struct ListArgs {
    /// Tarball to list (prompted for when omitted)
    #[arg(short, long)]
    tarball: Option<PathBuf>,

    /// Show mode, size and modification time
    #[arg(short, long)]
    long: bool,
}

pub async fn handle_list(args: ListArgs) -> Result<()> {
    let tarball = match args.tarball {
        Some(path) => path,
        None => prompt::prompt_path("Enter tarball path")?,
    };
    info!("Handling list command (tarball: {:?})", tarball);

    let long = args.long;
    let listed = tokio::task::spawn_blocking(move || {
        let mut out = BufWriter::new(io::stdout().lock());
        let seen = archive::list_archive(&tarball, |entry| {
            if long {
                writeln!(out, "{}", format_long(entry))
            } else {
                writeln!(out, "{}", entry.path)
            }
        })?;
        out.flush()
            .map_err(|e| ArchiveError::from_io(e, "Failed to write listing"))?;
        Ok::<_, ArchiveError>(seen)
    })
    .await
    .context("List task terminated unexpectedly")?
    .context("Failed to list tarball")?;

    debug!("Listed {} entries", listed);
    Ok(())
}

fn format_long(entry: &Entry) -> String {
    let when = i64::try_from(entry.mtime)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "????-??-?? ??:??".to_string());
    let mut line = format!(
        "{} {:>10} {} {}",
        entry.mode_string(),
        entry.size,
        when,
        entry.path
    );
    if entry.kind == EntryKind::Symlink {
        if let Some(target) = &entry.link_target {
            line.push_str(" -> ");
            line.push_str(target);
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_parse() {
        let args = ListArgs::try_parse_from(["list", "-t", "x.tar.gz", "-l"]).unwrap();
        assert_eq!(args.tarball, Some(PathBuf::from("x.tar.gz")));
        assert!(args.long);
    }

    #[test]
    fn test_format_long() {
        let file = Entry::file("photos/beach.jpg", 2_345_678, 0o644, 1_714_555_740);
        assert_eq!(
            format_long(&file),
            "-rw-r--r--    2345678 2024-05-01 09:29 photos/beach.jpg"
        );
        let link = Entry::symlink("photos/latest", "beach.jpg", 0);
        assert_eq!(
            format_long(&link),
            "lrwxrwxrwx          0 1970-01-01 00:00 photos/latest -> beach.jpg"
        );
    }
}
