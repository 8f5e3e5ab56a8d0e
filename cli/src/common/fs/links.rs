//! # Tarball Symbolic Link Management
//!
//! File: cli/src/common/fs/links.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Reads and recreates symbolic links for the archive engine. Links are stored
//! in archives exactly as `readlink` reports them (relative or absolute) and are
//! recreated verbatim; nothing here ever follows a link.
//!
use crate::core::error::{ArchiveError, ArchiveResult, ErrorKind};
use std::path::Path;
use tracing::debug;

/// Reads the target of the symlink at `link` as a UTF-8 string.
pub fn read_link_target(link: &Path) -> ArchiveResult<String> {
    let target = std::fs::read_link(link).map_err(|e| {
        ArchiveError::from_io(e, format!("Failed to read symlink {}", link.display()))
    })?;
    target.into_os_string().into_string().map_err(|raw| {
        ArchiveError::invalid_input(format!(
            "Symlink {} points to a non UTF-8 target {:?}",
            link.display(),
            raw
        ))
    })
}

/// Creates a symbolic link at `link` pointing to `target`.
///
/// The caller is responsible for removing anything already at `link`.
pub fn create_symlink(target: &str, link: &Path) -> ArchiveResult<()> {
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(target, link).map_err(|e| {
            ArchiveError::from_io(
                e,
                format!("Failed to create symlink {} -> {}", link.display(), target),
            )
        })?;
    }
    #[cfg(windows)]
    {
        // Windows needs to know the kind of the target; resolve it relative to the link.
        let resolved = link.parent().unwrap_or_else(|| Path::new(".")).join(target);
        let result = if resolved.is_dir() {
            std::os::windows::fs::symlink_dir(target, link)
        } else {
            std::os::windows::fs::symlink_file(target, link)
        };
        result.map_err(|e| {
            ArchiveError::from_io(
                e,
                format!("Failed to create symlink {} -> {}", link.display(), target),
            )
        })?;
    }
    #[cfg(not(any(unix, windows)))]
    {
        return Err(ArchiveError::new(
            ErrorKind::IoError,
            format!(
                "Symlink creation is not supported on this platform ({} -> {})",
                link.display(),
                target
            ),
        ));
    }
    debug!("Created symlink: {:?} -> {}", link, target);
    Ok(())
}

/// Returns `ErrorKind::PathTraversal` if any existing ancestor of `path` below
/// `root` is a symlink.
///
/// Writing through such a link could land outside `root`, so the caller must
/// refuse the entry. Ancestors that do not exist yet are fine; they will be
/// created as real directories.
pub fn ensure_no_symlink_ancestors(root: &Path, path: &Path) -> ArchiveResult<()> {
    let relative = match path.strip_prefix(root) {
        Ok(rel) => rel,
        Err(_) => {
            return Err(ArchiveError::new(
                ErrorKind::PathTraversal,
                format!("{} is not inside {}", path.display(), root.display()),
            ))
        }
    };
    let mut current = root.to_path_buf();
    let mut components = relative.components().peekable();
    while let Some(component) = components.next() {
        if components.peek().is_none() {
            break; // The entry itself, not an ancestor.
        }
        current.push(component);
        match std::fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() => {
                return Err(ArchiveError::new(
                    ErrorKind::PathTraversal,
                    format!(
                        "{} would be written through the symlink {}",
                        path.display(),
                        current.display()
                    ),
                ));
            }
            Ok(_) => {}
            Err(_) => break,
        }
    }
    Ok(())
}
