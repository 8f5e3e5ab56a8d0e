//! # Tarball Core Infrastructure
//!
//! File: cli/src/core/mod.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! This module aggregates the core infrastructure components shared by the
//! command handlers and the archive engine.
//!
//! ## Architecture
//!
//! - `cancel`: the `CancelToken` used to stop an archive operation between entries
//! - `config`: configuration loading, merging, and validation
//! - `error`: `ArchiveError` / `ErrorKind` for the engine, `TarballError` and the
//!   `anyhow`-based `Result` alias for the application
//!
//! ## Usage
//!
//! ```rust
//! use crate::core::cancel::CancelToken;
//! use crate::core::config;
//! use crate::core::error::{ArchiveError, ErrorKind, Result};
//! ```
//!
pub mod cancel;
pub mod config;
pub mod error;
