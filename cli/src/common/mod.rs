//! # Tarball Common Utilities (`common`)
//!
//! File: cli/src/common/mod.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Shared building blocks used by the command handlers. Command-specific logic
//! lives in `commands::`, configuration and errors in `core::`, and everything
//! reusable sits here:
//!
//! - **`archive`**: the streaming tar + gzip engine (`create_archive`,
//!   `extract_archive`, `list_archive`) and its codec, walker and unpacker.
//! - **`fs`**: filesystem helpers for directories, permissions, timestamps and
//!   symbolic links.
//! - **`ui`**: interactive terminal input (path prompts).
//!
//! ```rust
//! use crate::common::{archive, fs, ui};
//!
//! let source = ui::prompt::prompt_path("Source directory")?;
//! fs::io::ensure_dir_exists(&destination)?;
//! let report = archive::create_archive(&config, &cancel)?;
//! ```
//!

/// The tar + gzip archive engine.
pub mod archive;
/// Filesystem operations (I/O helpers, links).
pub mod fs;
/// Terminal interaction (prompts).
pub mod ui;
