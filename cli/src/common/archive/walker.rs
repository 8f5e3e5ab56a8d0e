//! # Path Walker (`common::archive::walker`)
//!
//! File: cli/src/common/archive/walker.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Enumerates the entries under a source root, lazily, in the order the encoder
//! needs them:
//!
//! - parents before children, so extraction can restore in a single pass;
//! - lexicographic by file name within each directory, so the same tree always
//!   produces the same archive;
//! - symlinks recorded as links and never followed (the root included), which
//!   also rules out cycles.
//!
//! Entry paths are rooted at the name of the source itself: walking `photos/`
//! yields `photos`, `photos/a.jpg`, `photos/trip`, ... and walking a single file
//! yields just that file's name.
//!
//! ## Errors
//!
//! A root that is missing or unreadable is fatal and reported by `Walker::new`.
//! Problems with anything below the root are yielded as `Err` items and the walk
//! carries on, leaving it to the caller to record them.
//!
use super::entry::Entry;
use crate::common::fs::{io, links};
use crate::core::error::{ArchiveError, ArchiveResult, ErrorKind};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

/// An entry found on disk together with the path to read its content from.
#[derive(Debug, Clone)]
pub struct WalkedEntry {
    pub entry: Entry,
    pub source: PathBuf,
}

/// A per-entry failure below the root. The walk continues past it.
#[derive(Debug)]
pub struct SkippedEntry {
    pub path: PathBuf,
    pub error: ArchiveError,
}

/// Configured, not yet started walk over one source root.
#[derive(Debug, Clone)]
pub struct Walker {
    root: PathBuf,
    root_name: String,
    recursive: bool,
    excluded: Vec<PathBuf>,
}

impl Walker {
    /// Validates the root and prepares a walk.
    ///
    /// Fails with `NotFound` / `PermissionDenied` when the root cannot be
    /// inspected, and with `InvalidInput` when it has no usable name (`/`).
    pub fn new(root: &Path, recursive: bool) -> ArchiveResult<Self> {
        let meta = fs::symlink_metadata(root).map_err(|e| {
            ArchiveError::from_io(e, format!("Cannot access source '{}'", root.display()))
        })?;
        if meta.is_dir() {
            // Fail early on an unreadable root rather than yielding a lone header.
            fs::read_dir(root).map_err(|e| {
                ArchiveError::from_io(e, format!("Cannot read source directory '{}'", root.display()))
            })?;
        }
        let root_name = root_name(root)?;
        debug!(
            "Walker rooted at {:?} (archive name '{}', recursive: {})",
            root, root_name, recursive
        );
        Ok(Self {
            root: root.to_path_buf(),
            root_name,
            recursive,
            excluded: Vec::new(),
        })
    }

    /// Skips `path` (and, for a directory, everything below it) during the walk.
    ///
    /// Used to keep the archive being written out of its own source tree. Paths
    /// that do not exist yet are compared after canonicalizing their parent.
    pub fn exclude(mut self, path: &Path) -> Self {
        if let Some(canonical) = canonicalize_lenient(path) {
            self.excluded.push(canonical);
        }
        self
    }

    #[cfg(test)]
    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    /// Starts the walk. Each call starts over from the root.
    pub fn entries(&self) -> impl Iterator<Item = Result<WalkedEntry, SkippedEntry>> + '_ {
        let max_depth = if self.recursive { usize::MAX } else { 1 };
        let root_canonical = canonicalize_lenient(&self.root);
        WalkDir::new(&self.root)
            .follow_links(false)
            .follow_root_links(false)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |dent| {
                if self.excluded.is_empty() || dent.depth() == 0 {
                    return true;
                }
                let keep = match (&root_canonical, dent.path().strip_prefix(&self.root)) {
                    (Some(base), Ok(rel)) => !self.excluded.contains(&base.join(rel)),
                    _ => true,
                };
                if !keep {
                    debug!("Excluding {:?} from the walk", dent.path());
                }
                keep
            })
            .map(move |item| match item {
                Ok(dent) => self.describe(dent.path(), dent.depth()),
                Err(err) => Err(skipped_from_walkdir(err)),
            })
    }

    fn describe(&self, path: &Path, depth: usize) -> Result<WalkedEntry, SkippedEntry> {
        let skip = |error: ArchiveError| SkippedEntry {
            path: path.to_path_buf(),
            error,
        };
        let archive_path = self.archive_path(path, depth).map_err(skip)?;
        let meta = fs::symlink_metadata(path)
            .map_err(|e| skip(ArchiveError::from_io(e, format!("Cannot stat '{}'", path.display()))))?;
        let mtime = io::mtime_secs(&meta);
        let file_type = meta.file_type();

        let entry = if file_type.is_symlink() {
            let target = links::read_link_target(path).map_err(skip)?;
            Entry::symlink(archive_path, target, mtime)
        } else if file_type.is_dir() {
            Entry::directory(archive_path, io::mode_bits(&meta), mtime)
        } else if file_type.is_file() {
            Entry::file(archive_path, meta.len(), io::mode_bits(&meta), mtime)
        } else {
            return Err(skip(ArchiveError::invalid_input(format!(
                "'{}' is not a regular file, directory or symlink",
                path.display()
            ))));
        };
        trace!("Walked {} ({})", entry.path, entry.kind);
        Ok(WalkedEntry {
            entry,
            source: path.to_path_buf(),
        })
    }

    /// `root_name/relative/path`, slash-separated.
    fn archive_path(&self, path: &Path, depth: usize) -> ArchiveResult<String> {
        let mut out = self.root_name.clone();
        if depth == 0 {
            return Ok(out);
        }
        let rel = path.strip_prefix(&self.root).map_err(|_| {
            ArchiveError::invalid_input(format!(
                "'{}' is not below the source root '{}'",
                path.display(),
                self.root.display()
            ))
        })?;
        for component in rel.components() {
            let part = component.as_os_str().to_str().ok_or_else(|| {
                ArchiveError::invalid_input(format!(
                    "'{}' has a name that is not valid UTF-8",
                    path.display()
                ))
            })?;
            out.push('/');
            out.push_str(part);
        }
        Ok(out)
    }
}

fn root_name(root: &Path) -> ArchiveResult<String> {
    let name = match root.components().next_back() {
        Some(Component::Normal(name)) => Some(name.to_os_string()),
        _ => fs::canonicalize(root)
            .ok()
            .and_then(|p| p.file_name().map(|n| n.to_os_string())),
    };
    let name = name.ok_or_else(|| {
        ArchiveError::invalid_input(format!(
            "Source '{}' has no name to store in the archive",
            root.display()
        ))
    })?;
    name.into_string().map_err(|raw| {
        ArchiveError::invalid_input(format!("Source name {:?} is not valid UTF-8", raw))
    })
}

/// Canonical form of `path`, or of its parent joined with its file name when
/// `path` itself does not exist yet.
fn canonicalize_lenient(path: &Path) -> Option<PathBuf> {
    if let Ok(canonical) = fs::canonicalize(path) {
        return Some(canonical);
    }
    let name = path.file_name()?;
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::canonicalize(parent).ok().map(|p| p.join(name))
}

fn skipped_from_walkdir(err: walkdir::Error) -> SkippedEntry {
    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
    let detail = format!("Cannot read '{}'", path.display());
    let error = match err.into_io_error() {
        Some(io_err) => ArchiveError::from_io(io_err, detail),
        None => ArchiveError::new(ErrorKind::IoError, format!("{}: filesystem loop", detail)),
    };
    SkippedEntry { path, error }
}
