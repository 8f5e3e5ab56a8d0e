//! # Tarball Error Types
//!
//! File: cli/src/core/error.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! This module defines the error types used throughout the tarball application.
//! There are two layers, mirroring the split between the archive engine and the
//! command-line front end:
//!
//! - `ArchiveError`: the structured error returned by the archive engine
//!   (`common::archive`). Every failure carries an `ErrorKind` and a detail
//!   string, and keeps the underlying `std::io::Error` as its source when there
//!   is one. The engine never formats prose for a terminal; it only returns these.
//! - `TarballError` + `Result<T>`: application-level errors (configuration,
//!   prompts) and the `anyhow::Result` alias used by command handlers, which add
//!   context with `.context(...)`.
//!
//! ## Examples
//!
//! ```rust
//! // Classify an I/O failure while opening the source tree.
//! let meta = fs::symlink_metadata(&source)
//!     .map_err(|e| ArchiveError::from_io(e, format!("cannot read source '{}'", source.display())))?;
//!
//! // Build a decoder failure directly.
//! return Err(ArchiveError::corrupt("archive ended before the end-of-archive marker"));
//!
//! // Render for the user (main.rs).
//! if let Some(archive_err) = find_archive_error(&err) {
//!     eprintln!("Error [{}]: {}", archive_err.kind(), archive_err.detail());
//! }
//! ```
//!
use std::fmt;
use std::io;
use thiserror::Error;

/// The category of an archive failure.
///
/// The `Display` form is the bare kind name (`NotFound`, `CorruptArchive`, ...)
/// which the CLI prints in every error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The source, tarball, or a referenced path does not exist.
    NotFound,
    /// The OS refused access to a path.
    PermissionDenied,
    /// A read or write failed mid-stream.
    IoError,
    /// The archive stream is malformed or truncated.
    CorruptArchive,
    /// An entry path would resolve outside the destination root.
    PathTraversal,
    /// The overwrite policy forbids replacing an existing path.
    AlreadyExists,
    /// The caller supplied an unusable path or argument.
    InvalidInput,
    /// The operation was stopped through its `CancelToken`.
    Cancelled,
}

impl ErrorKind {
    /// Process exit status used by the CLI for this kind of failure.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::NotFound => 2,
            ErrorKind::PermissionDenied => 3,
            ErrorKind::IoError => 4,
            ErrorKind::CorruptArchive => 5,
            ErrorKind::PathTraversal => 6,
            ErrorKind::AlreadyExists => 7,
            ErrorKind::InvalidInput => 8,
            ErrorKind::Cancelled => 130,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::PermissionDenied => "PermissionDenied",
            ErrorKind::IoError => "IOError",
            ErrorKind::CorruptArchive => "CorruptArchive",
            ErrorKind::PathTraversal => "PathTraversal",
            ErrorKind::AlreadyExists => "AlreadyExists",
            ErrorKind::InvalidInput => "InvalidInput",
            ErrorKind::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured failure returned by every archive operation.
#[derive(Error, Debug)]
#[error("{kind}: {detail}")]
pub struct ArchiveError {
    kind: ErrorKind,
    detail: String,
    #[source]
    source: Option<io::Error>,
}

/// Result alias for the archive engine.
pub type ArchiveResult<T> = std::result::Result<T, ArchiveError>;

impl ArchiveError {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
            source: None,
        }
    }

    /// Wraps an I/O error, classifying it by its `io::ErrorKind`.
    ///
    /// `NotFound` and `PermissionDenied` keep their meaning; every other I/O
    /// failure becomes `ErrorKind::IoError`.
    pub fn from_io(err: io::Error, context: impl Into<String>) -> Self {
        let kind = match err.kind() {
            io::ErrorKind::NotFound => ErrorKind::NotFound,
            io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            io::ErrorKind::AlreadyExists => ErrorKind::AlreadyExists,
            _ => ErrorKind::IoError,
        };
        Self {
            kind,
            detail: format!("{}: {}", context.into(), err),
            source: Some(err),
        }
    }

    /// Wraps an error raised while *reading the archive stream*.
    ///
    /// Running out of bytes, or a decompressor rejecting its input, means the
    /// archive itself is damaged, so those become `CorruptArchive`. Anything
    /// else is classified like `from_io`.
    pub fn from_stream(err: io::Error, context: impl Into<String>) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof
            | io::ErrorKind::InvalidData
            | io::ErrorKind::InvalidInput => Self {
                kind: ErrorKind::CorruptArchive,
                detail: format!("{}: {}", context.into(), err),
                source: Some(err),
            },
            _ => Self::from_io(err, context),
        }
    }

    pub fn corrupt(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::CorruptArchive, detail)
    }

    pub fn traversal(path: &str) -> Self {
        Self::new(
            ErrorKind::PathTraversal,
            format!("entry path '{}' escapes the destination directory", path),
        )
    }

    pub fn invalid_input(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, detail)
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "operation cancelled by request")
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

/// Application-level errors raised outside the archive engine.
#[derive(Error, Debug)]
pub enum TarballError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Prompt error: {0}")]
    Prompt(String),
}

/// Type alias for Result using anyhow::Error for broad compatibility.
/// Anyhow allows for easy context addition and flexible error handling.
pub type Result<T> = anyhow::Result<T>;

/// Finds the `ArchiveError` inside an application error, looking through any
/// context layers added on the way up.
pub fn find_archive_error(err: &anyhow::Error) -> Option<&ArchiveError> {
    err.chain().find_map(|cause| cause.downcast_ref::<ArchiveError>())
}
