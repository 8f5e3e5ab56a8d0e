//! # Tarball Archive Engine (`common::archive`)
//!
//! File: cli/src/common/archive/mod.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! This module is the archive engine behind every `tarball` command. It turns a
//! filesystem tree into a tar stream (optionally gzip-compressed) and back,
//! streaming entry by entry so memory use does not depend on the size of the
//! tree or of any file in it.
//!
//! ## Architecture
//!
//! ```text
//! create:   Walker ─▶ EntryFilter ─▶ ArchiveEncoder ─▶ CompressWriter ─▶ temp file ─▶ rename
//! extract:  file ─▶ DecompressReader ─▶ ArchiveDecoder ─▶ Unpacker ─▶ destination
//! list:     file ─▶ DecompressReader ─▶ ArchiveDecoder
//! ```
//!
//! - **`walker`**: deterministic, non-following traversal of the source tree.
//! - **`filter`**: the `FilterMode` / file-type selection of entries.
//! - **`header`**: block helpers, `tar::Header` field decoding and pax records.
//! - **`encoder`** / **`decoder`**: the tar stream writer and reader.
//! - **`compression`**: gzip on write, auto-detection on read.
//! - **`unpack`**: safe restoration under a destination root.
//! - **`state`**: the `Validating → Streaming → Finalizing → Done` tracker.
//!
//! The three public operations (`create_archive`, `extract_archive`,
//! `list_archive`) take an immutable config value and a `CancelToken`, and
//! return a report or a structured `ArchiveError`. They never print anything;
//! rendering is the job of the command handlers.
//!
//! ## Usage
//!
//! ```rust
//! use crate::common::archive::{self, CreateConfig, Compression, EntryFilter};
//! use crate::core::cancel::CancelToken;
//!
//! let config = CreateConfig {
//!     source: "photos".into(),
//!     output: "photos.tar.gz".into(),
//!     recursive: true,
//!     filter: EntryFilter::all(),
//!     compression: Compression::default(),
//!     normalize_mtime: false,
//! };
//! let report = archive::create_archive(&config, &CancelToken::new())?;
//! println!("{} files archived", report.counts.files);
//! ```
//!
pub mod compression;
pub mod decoder;
pub mod encoder;
pub mod entry;
pub mod filter;
pub mod header;
pub mod state;
pub mod unpack;
pub mod walker;

pub use compression::{Compression, StreamFormat};
pub use entry::{Entry, EntryCounts, EntryKind};
pub use filter::{EntryFilter, FilterMode, MediaFamily, TypeCounts};
pub use unpack::OverwritePolicy;
pub use walker::SkippedEntry;

use crate::common::fs::io;
use crate::core::cancel::CancelToken;
use crate::core::error::{ArchiveError, ArchiveResult};
use compression::{CompressWriter, DecompressReader};
use decoder::ArchiveDecoder;
use encoder::ArchiveEncoder;
use state::{Operation, Stage};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};
use unpack::Unpacker;
use walker::Walker;

/// Everything `create_archive` needs, resolved up front.
#[derive(Debug, Clone)]
pub struct CreateConfig {
    pub source: PathBuf,
    pub output: PathBuf,
    pub recursive: bool,
    pub filter: EntryFilter,
    pub compression: Compression,
    /// Store every mtime as 0 so identical trees give identical archives.
    pub normalize_mtime: bool,
}

#[derive(Debug)]
pub struct CreateReport {
    pub output: PathBuf,
    pub compression: Compression,
    pub counts: EntryCounts,
    /// Archived files per extension, by media family.
    pub types: TypeCounts,
    /// Entries left out by the filter.
    pub filtered: u64,
    /// Entries below the root that could not be read.
    pub skipped: Vec<SkippedEntry>,
    /// Size of the finished archive file.
    pub archive_bytes: u64,
}

#[derive(Debug, Clone)]
pub struct ExtractConfig {
    pub tarball: PathBuf,
    pub destination: PathBuf,
    pub overwrite: OverwritePolicy,
}

#[derive(Debug)]
pub struct ExtractReport {
    pub destination: PathBuf,
    pub format: StreamFormat,
    pub counts: EntryCounts,
    /// Entries of kinds this tool does not restore.
    pub unsupported: Vec<Entry>,
}

/// Archives `config.source` into `config.output`.
///
/// The archive is written to a temporary file next to the output and renamed
/// into place only once it is complete. On any error (cancellation included)
/// the temporary file is removed and an existing output file is untouched.
pub fn create_archive(config: &CreateConfig, cancel: &CancelToken) -> ArchiveResult<CreateReport> {
    let mut op = Operation::begin("create");
    info!(
        "Creating {:?} from {:?} ({})",
        config.output, config.source, config.compression
    );
    let result = run_create(config, cancel, &mut op);
    result.map_err(|e| op.fail(e))
}

fn run_create(
    config: &CreateConfig,
    cancel: &CancelToken,
    op: &mut Operation,
) -> ArchiveResult<CreateReport> {
    let walker = Walker::new(&config.source, config.recursive)?;
    let output_dir = validate_output(config)?;
    let temp = tempfile::Builder::new()
        .prefix(".tarball-")
        .suffix(".partial")
        .tempfile_in(&output_dir)
        .map_err(|e| {
            ArchiveError::from_io(
                e,
                format!("Failed to create a temporary file in {}", output_dir.display()),
            )
        })?;
    debug!("Writing to temporary file {:?}", temp.path());
    let walker = walker.exclude(&config.output).exclude(temp.path());
    cancel.check()?;
    op.advance(Stage::Streaming);

    let sink = CompressWriter::new(BufWriter::new(temp), config.compression);
    let mut encoder = ArchiveEncoder::new(sink);
    let mut counts = EntryCounts::default();
    let mut types = TypeCounts::default();
    let mut filtered = 0;
    let mut skipped = Vec::new();

    for item in walker.entries() {
        cancel.check()?;
        let walked = match item {
            Ok(walked) => walked,
            Err(skip) => {
                warn!("Skipping {:?}: {}", skip.path, skip.error);
                skipped.push(skip);
                continue;
            }
        };
        if !config.filter.accepts(&walked.entry) {
            trace!("Filtered out {} ({} mode)", walked.entry.path, config.filter.mode());
            filtered += 1;
            continue;
        }
        let mut entry = walked.entry;
        if config.normalize_mtime {
            entry.mtime = 0;
        }
        if entry.kind == EntryKind::File {
            let file = match File::open(&walked.source) {
                Ok(file) => file,
                Err(e) => {
                    let error = ArchiveError::from_io(
                        e,
                        format!("Cannot open '{}'", walked.source.display()),
                    );
                    if walked.source == config.source {
                        return Err(error);
                    }
                    warn!("Skipping {:?}: {}", walked.source, error);
                    skipped.push(SkippedEntry {
                        path: walked.source,
                        error,
                    });
                    continue;
                }
            };
            encoder.append_file(&entry, file)?;
        } else {
            encoder.append_entry(&entry)?;
        }
        debug!("Added {} ({})", entry.path, entry.kind);
        counts.record(&entry);
        types.record(&entry);
    }

    op.advance(Stage::Finalizing);
    let tar_bytes = encoder.bytes_written();
    let buffered = encoder
        .finish()?
        .finish()
        .map_err(|e| ArchiveError::from_io(e, "Failed to finish compression"))?;
    let temp = buffered
        .into_inner()
        .map_err(|e| ArchiveError::from_io(e.into_error(), "Failed to flush archive"))?;
    temp.as_file()
        .sync_all()
        .map_err(|e| ArchiveError::from_io(e, "Failed to sync archive to disk"))?;
    io::set_mode(temp.path(), 0o644).map_err(|e| {
        ArchiveError::from_io(e, format!("Failed to set permissions on {}", temp.path().display()))
    })?;
    let archive_bytes = match temp.as_file().metadata() {
        Ok(meta) => meta.len(),
        Err(e) => {
            debug!("Cannot stat finished archive, reporting tar size: {}", e);
            tar_bytes
        }
    };
    temp.persist(&config.output).map_err(|e| {
        ArchiveError::from_io(
            e.error,
            format!("Failed to move archive into place at {}", config.output.display()),
        )
    })?;
    op.advance(Stage::Done);

    info!(
        "Archived {} entries ({} payload bytes, {} tar bytes, {} on disk)",
        counts.total(),
        counts.payload_bytes,
        tar_bytes,
        archive_bytes
    );
    Ok(CreateReport {
        output: config.output.clone(),
        compression: config.compression,
        counts,
        types,
        filtered,
        skipped,
        archive_bytes,
    })
}

/// Checks the output path and returns the directory the archive will live in,
/// creating it if needed.
fn validate_output(config: &CreateConfig) -> ArchiveResult<PathBuf> {
    let output = &config.output;
    if output.as_os_str().is_empty() {
        return Err(ArchiveError::invalid_input("Output path is empty"));
    }
    if let Ok(meta) = fs::metadata(output) {
        if meta.is_dir() {
            return Err(ArchiveError::invalid_input(format!(
                "Output '{}' is a directory",
                output.display()
            )));
        }
        let same = match (fs::canonicalize(output), fs::canonicalize(&config.source)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        };
        if same {
            return Err(ArchiveError::invalid_input(format!(
                "Output '{}' is the source itself",
                output.display()
            )));
        }
    }
    let parent = match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    io::ensure_dir_exists(&parent)?;
    Ok(parent)
}

/// Restores the archive at `config.tarball` under `config.destination`.
///
/// Compression is detected from the file content. Extraction stops at the
/// first fatal error; entries restored before it stay on disk.
pub fn extract_archive(
    config: &ExtractConfig,
    cancel: &CancelToken,
) -> ArchiveResult<ExtractReport> {
    let mut op = Operation::begin("extract");
    info!("Extracting {:?} into {:?}", config.tarball, config.destination);
    let result = run_extract(config, cancel, &mut op);
    result.map_err(|e| op.fail(e))
}

fn run_extract(
    config: &ExtractConfig,
    cancel: &CancelToken,
    op: &mut Operation,
) -> ArchiveResult<ExtractReport> {
    let input = open_tarball(&config.tarball)?;
    io::ensure_dir_exists(&config.destination)?;
    let format = input.format();
    cancel.check()?;
    op.advance(Stage::Streaming);

    let mut decoder = ArchiveDecoder::new(input);
    let mut unpacker = Unpacker::new(&config.destination, config.overwrite);
    let mut counts = EntryCounts::default();
    let mut unsupported = Vec::new();
    loop {
        cancel.check()?;
        let Some(entry) = decoder.next_entry()? else {
            break;
        };
        if unpacker.unpack(&entry, &mut decoder)? {
            debug!("Extracted {} ({})", entry.path, entry.kind);
            counts.record(&entry);
        } else {
            unsupported.push(entry);
        }
    }

    op.advance(Stage::Finalizing);
    unpacker.finish()?;
    decoder.finish()?;
    op.advance(Stage::Done);

    info!(
        "Extracted {} entries ({} payload bytes) from {} archive",
        counts.total(),
        counts.payload_bytes,
        format
    );
    Ok(ExtractReport {
        destination: config.destination.clone(),
        format,
        counts,
        unsupported,
    })
}

/// Reads every header of the archive at `tarball` without restoring anything,
/// handing each entry to `on_entry` as soon as it is decoded.
///
/// Returns the number of entries seen. An error from `on_entry` (a closed
/// stdout, say) stops the listing and is reported as an I/O error.
pub fn list_archive<F>(tarball: &Path, on_entry: F) -> ArchiveResult<u64>
where
    F: FnMut(&Entry) -> std::io::Result<()>,
{
    let mut op = Operation::begin("list");
    let result = run_list(tarball, on_entry, &mut op);
    result.map_err(|e| op.fail(e))
}

fn run_list<F>(tarball: &Path, mut on_entry: F, op: &mut Operation) -> ArchiveResult<u64>
where
    F: FnMut(&Entry) -> std::io::Result<()>,
{
    let input = open_tarball(tarball)?;
    op.advance(Stage::Streaming);
    let mut decoder = ArchiveDecoder::new(input);
    let mut seen = 0;
    while let Some(entry) = decoder.next_entry()? {
        on_entry(&entry)
            .map_err(|e| ArchiveError::from_io(e, "Failed to write listing"))?;
        seen += 1;
    }
    op.advance(Stage::Finalizing);
    decoder.finish()?;
    op.advance(Stage::Done);
    Ok(seen)
}

fn open_tarball(tarball: &Path) -> ArchiveResult<DecompressReader<BufReader<File>>> {
    let meta = fs::metadata(tarball).map_err(|e| {
        ArchiveError::from_io(e, format!("Cannot access tarball '{}'", tarball.display()))
    })?;
    if !meta.is_file() {
        return Err(ArchiveError::invalid_input(format!(
            "Tarball '{}' is not a file",
            tarball.display()
        )));
    }
    let file = File::open(tarball).map_err(|e| {
        ArchiveError::from_io(e, format!("Cannot open tarball '{}'", tarball.display()))
    })?;
    let input = DecompressReader::new(BufReader::new(file))
        .map_err(|e| ArchiveError::from_stream(e, "Failed to read tarball"))?;
    debug!("Detected {} input", input.format());
    Ok(input)
}
