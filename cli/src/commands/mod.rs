//! # Tarball Command Modules
//!
//! File: cli/src/commands/mod.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! One module per `tarball` subcommand. Each defines a clap `Args` struct and an
//! async `handle_*` function that `main.rs` dispatches to.
//!
//! Handlers follow the same shape: resolve flags, configuration defaults and
//! prompt answers into an immutable engine config, run the engine on Tokio's
//! blocking pool, then render the report. Errors are returned with context and
//! rendered by `main`.
//!
//! - `create`: archive a directory or file
//! - `extract`: restore a tarball into a directory
//! - `list`: print the entries of a tarball
//!

/// `tarball create`.
pub mod create;
/// `tarball extract`.
pub mod extract;
/// `tarball list`.
pub mod list;
