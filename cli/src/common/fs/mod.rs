//! # Tarball Filesystem Utilities Module (`common::fs`)
//!
//! File: cli/src/common/fs/mod.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Filesystem helpers used by the archive engine, grouped by concern:
//!
//! - **`io`**: directory creation and metadata helpers (`ensure_dir_exists`,
//!   `set_mode`, `set_mtime`, `mode_bits`, `mtime_secs`).
//! - **`links`**: reading and recreating symbolic links, and the
//!   symlinked-ancestor check used during extraction.
//!
//! ```rust
//! use crate::common::fs::{io, links};
//!
//! io::ensure_dir_exists(destination)?;
//! links::ensure_no_symlink_ancestors(destination, &target)?;
//! links::create_symlink("../shared/lib.so", &target)?;
//! ```
//!

/// Directory creation, permission and timestamp helpers.
pub mod io;
/// Symbolic link reading, creation and safety checks.
pub mod links;
