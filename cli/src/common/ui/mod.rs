//! # Tarball UI Utilities Module (`common::ui`)
//!
//! File: cli/src/common/ui/mod.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Terminal interaction for the command handlers. The archive engine never
//! touches the terminal; commands gather whatever the user left out on the
//! command line through this module and then hand a complete configuration to
//! the engine.
//!
//! - **`prompt`**: line-based prompts for paths, with `~` expansion.
//!

pub mod prompt;
