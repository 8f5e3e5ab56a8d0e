//! # Tarball Filesystem I/O Operations
//!
//! File: cli/src/common/fs/io.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Small wrappers around `std::fs` used by the archive engine when it prepares
//! an output location or restores entries:
//!
//! - **`ensure_dir_exists`**: creates a directory (and parents) if missing, and
//!   rejects a path that exists but is not a directory.
//! - **`set_mode`**: applies POSIX permission bits (a no-op off Unix).
//! - **`set_mtime`**: applies a modification time given in Unix seconds.
//!
//! All failures are returned as `ArchiveError`s so the engine can propagate them
//! unchanged.
//!
use crate::core::error::{ArchiveError, ArchiveResult, ErrorKind};
use std::fs;
use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// Ensures that a directory exists at the specified path.
///
/// Creates the directory and any missing parents (like `mkdir -p`). If the path
/// already exists but is not a directory, `ErrorKind::InvalidInput` is returned.
pub fn ensure_dir_exists(path: &Path) -> ArchiveResult<()> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => {
            debug!("Directory already exists: {:?}", path);
            Ok(())
        }
        Ok(_) => Err(ArchiveError::new(
            ErrorKind::InvalidInput,
            format!("Path exists but is not a directory: {}", path.display()),
        )),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            fs::create_dir_all(path).map_err(|e| {
                ArchiveError::from_io(e, format!("Failed to create directory {}", path.display()))
            })?;
            info!("Created directory: {:?}", path);
            Ok(())
        }
        Err(e) => Err(ArchiveError::from_io(
            e,
            format!("Failed to inspect {}", path.display()),
        )),
    }
}

/// Sets POSIX permission bits on `path`.
#[cfg(unix)]
pub fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o7777))
}

/// No-op off Unix: POSIX permission bits are not restored.
#[cfg(not(unix))]
pub fn set_mode(_path: &Path, _mode: u32) -> io::Result<()> {
    Ok(())
}

/// Sets the modification time of a file or directory.
///
/// Directories are opened read-only for this, which some platforms refuse;
/// callers treat failures as non-fatal.
pub fn set_mtime(path: &Path, mtime: u64) -> io::Result<()> {
    set_file_mtime(&fs::File::open(path)?, mtime)
}

/// Sets the modification time through an already open handle.
///
/// Archive headers can carry times `SystemTime` cannot represent; those are
/// an `InvalidInput` error rather than an overflow.
pub fn set_file_mtime(file: &fs::File, mtime: u64) -> io::Result<()> {
    let when = UNIX_EPOCH
        .checked_add(Duration::from_secs(mtime))
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("modification time {} is out of range", mtime),
            )
        })?;
    file.set_modified(when)
}

/// Reads a path's modification time as whole seconds since the Unix epoch.
/// Times before the epoch are clamped to 0.
pub fn mtime_secs(meta: &fs::Metadata) -> u64 {
    meta.modified()
        .ok()
        .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Permission bits of a path, with a conventional fallback off Unix.
#[cfg(unix)]
pub fn mode_bits(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
pub fn mode_bits(meta: &fs::Metadata) -> u32 {
    match (meta.is_dir(), meta.permissions().readonly()) {
        (true, _) => 0o755,
        (false, true) => 0o444,
        (false, false) => 0o644,
    }
}
