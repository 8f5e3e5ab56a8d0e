//! # Entry Restoration (`common::archive::unpack`)
//!
//! File: cli/src/common/archive/unpack.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Restores decoded entries under a destination root. Nothing in an archive is
//! trusted, so every entry goes through the same checks before a single byte is
//! written:
//!
//! 1. **Path sanitizing**: the entry path must be relative and free of `..`
//!    components (`sanitize_entry_path`). Anything else is `PathTraversal`.
//! 2. **Symlinked ancestors**: an existing symlink between the root and the
//!    entry (for example one restored earlier from the same archive) would
//!    redirect the write, so it is also `PathTraversal`.
//! 3. **Existing targets**: files and symlinks are replaced or refused
//!    according to the `OverwritePolicy`; existing directories are reused.
//!
//! Directory permissions and timestamps are applied in `finish`, deepest
//! first, after everything inside them has been written.
//!
use super::decoder::ArchiveDecoder;
use super::entry::{Entry, EntryKind};
use crate::common::fs::{io, links};
use crate::core::error::{ArchiveError, ArchiveResult, ErrorKind};
use std::fs;
use std::io::{ErrorKind as IoErrorKind, Read};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, trace, warn};

/// What to do when an entry's target path already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverwritePolicy {
    /// Replace existing files and symlinks.
    #[default]
    Overwrite,
    /// Fail with `ErrorKind::AlreadyExists`.
    Refuse,
}

impl OverwritePolicy {
    pub fn from_flag(overwrite: bool) -> Self {
        if overwrite {
            OverwritePolicy::Overwrite
        } else {
            OverwritePolicy::Refuse
        }
    }
}

/// Converts an archive path into a relative host path.
///
/// Empty and `.` components are dropped, so the result may be empty (the
/// destination root itself). Rejects empty paths, absolute paths and any `..`.
pub fn sanitize_entry_path(path: &str) -> ArchiveResult<PathBuf> {
    if path.is_empty() || path.starts_with('/') || path.starts_with('\\') {
        return Err(ArchiveError::traversal(path));
    }
    let mut out = PathBuf::new();
    for part in path.split('/') {
        match part {
            "" | "." => continue,
            ".." => return Err(ArchiveError::traversal(path)),
            _ => {}
        }
        // Rejects drive prefixes and separators the host would interpret.
        let mut components = Path::new(part).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => out.push(part),
            _ => return Err(ArchiveError::traversal(path)),
        }
    }
    Ok(out)
}

struct DeferredDir {
    path: PathBuf,
    mode: u32,
    mtime: u64,
}

pub struct Unpacker {
    root: PathBuf,
    policy: OverwritePolicy,
    directories: Vec<DeferredDir>,
}

impl Unpacker {
    /// `root` must already exist.
    pub fn new(root: &Path, policy: OverwritePolicy) -> Self {
        Self {
            root: root.to_path_buf(),
            policy,
            directories: Vec::new(),
        }
    }

    /// Restores one entry, reading file content from `decoder`.
    ///
    /// Returns `false` when the entry was skipped because its kind is not
    /// supported.
    pub fn unpack<R: Read>(
        &mut self,
        entry: &Entry,
        decoder: &mut ArchiveDecoder<R>,
    ) -> ArchiveResult<bool> {
        let relative = sanitize_entry_path(&entry.path)?;
        if let EntryKind::Other(_) = entry.kind {
            warn!("Skipping '{}': {}", entry.path, entry.kind);
            return Ok(false);
        }
        if relative.as_os_str().is_empty() {
            return match entry.kind {
                EntryKind::Directory => Ok(true),
                _ => Err(ArchiveError::traversal(&entry.path)),
            };
        }

        let target = self.root.join(&relative);
        links::ensure_no_symlink_ancestors(&self.root, &target)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                ArchiveError::from_io(e, format!("Failed to create directory {}", parent.display()))
            })?;
        }
        self.clear_target(entry, &target)?;

        match entry.kind {
            EntryKind::File => self.restore_file(entry, &target, decoder)?,
            EntryKind::Directory => self.restore_directory(entry, &target)?,
            EntryKind::Symlink => {
                let link_target = entry.link_target.as_deref().unwrap_or_default();
                links::create_symlink(link_target, &target)?;
            }
            EntryKind::Other(_) => {}
        }
        trace!("Restored {} -> {:?}", entry.path, target);
        Ok(true)
    }

    /// Applies deferred directory modes and timestamps, deepest first.
    pub fn finish(mut self) -> ArchiveResult<()> {
        self.directories
            .sort_by_key(|dir| std::cmp::Reverse(dir.path.components().count()));
        for dir in &self.directories {
            if let Err(e) = io::set_mtime(&dir.path, dir.mtime) {
                debug!("Could not set mtime on {:?}: {}", dir.path, e);
            }
            io::set_mode(&dir.path, dir.mode).map_err(|e| {
                ArchiveError::from_io(e, format!("Failed to set permissions on {}", dir.path.display()))
            })?;
        }
        debug!("Applied permissions to {} directories", self.directories.len());
        Ok(())
    }

    fn clear_target(&self, entry: &Entry, target: &Path) -> ArchiveResult<()> {
        let meta = match fs::symlink_metadata(target) {
            Ok(meta) => meta,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(()),
            Err(e) => {
                return Err(ArchiveError::from_io(
                    e,
                    format!("Failed to inspect {}", target.display()),
                ))
            }
        };
        if meta.is_dir() {
            if entry.kind == EntryKind::Directory {
                return Ok(());
            }
            return Err(ArchiveError::new(
                ErrorKind::AlreadyExists,
                format!(
                    "a directory already exists where {} '{}' belongs",
                    entry.kind, entry.path
                ),
            ));
        }
        match self.policy {
            OverwritePolicy::Overwrite => {
                debug!("Replacing existing {:?}", target);
                fs::remove_file(target).map_err(|e| {
                    ArchiveError::from_io(e, format!("Failed to replace {}", target.display()))
                })
            }
            OverwritePolicy::Refuse => Err(ArchiveError::new(
                ErrorKind::AlreadyExists,
                format!("{} already exists", target.display()),
            )),
        }
    }

    fn restore_file<R: Read>(
        &self,
        entry: &Entry,
        target: &Path,
        decoder: &mut ArchiveDecoder<R>,
    ) -> ArchiveResult<()> {
        let mut file = fs::File::create(target).map_err(|e| {
            ArchiveError::from_io(e, format!("Failed to create {}", target.display()))
        })?;
        decoder.copy_payload(&mut file)?;
        if let Err(e) = io::set_file_mtime(&file, entry.mtime) {
            debug!("Could not set mtime on {:?}: {}", target, e);
        }
        drop(file);
        io::set_mode(target, entry.mode).map_err(|e| {
            ArchiveError::from_io(e, format!("Failed to set permissions on {}", target.display()))
        })
    }

    fn restore_directory(&mut self, entry: &Entry, target: &Path) -> ArchiveResult<()> {
        match fs::create_dir(target) {
            Ok(()) => {}
            Err(e) if e.kind() == IoErrorKind::AlreadyExists && target.is_dir() => {}
            Err(e) => {
                return Err(ArchiveError::from_io(
                    e,
                    format!("Failed to create directory {}", target.display()),
                ))
            }
        }
        self.directories.push(DeferredDir {
            path: target.to_path_buf(),
            mode: entry.mode,
            mtime: entry.mtime,
        });
        Ok(())
    }
}
