//! # Path Prompts (`common::ui::prompt`)
//!
//! File: cli/src/common/ui/prompt.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Asks the user for a path the command line did not provide. The prompt goes
//! to stderr so stdout stays clean for command output (`tarball list`), and one
//! line is read from stdin.
//!
//! The answer is trimmed and a leading `~` is expanded to the home directory.
//! An empty answer or a closed stdin is an error: there is no sensible default
//! for a source or destination path.
//!
use crate::core::error::{Result, TarballError};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::debug;

/// Prompts on stderr and reads the answer from stdin.
pub fn prompt_path(label: &str) -> Result<PathBuf> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    read_path(label, &mut input, &mut io::stderr())
}

/// Writes `label` to `output`, then reads one line from `input` as a path.
pub fn read_path<R: BufRead, W: Write>(label: &str, input: &mut R, output: &mut W) -> Result<PathBuf> {
    write!(output, "{}: ", label)?;
    output.flush()?;

    let mut line = String::new();
    let read = input.read_line(&mut line)?;
    if read == 0 {
        return Err(TarballError::Prompt(format!("no input received for '{}'", label)).into());
    }
    let answer = line.trim();
    if answer.is_empty() {
        return Err(TarballError::Prompt(format!("'{}' cannot be empty", label)).into());
    }
    let expanded = shellexpand::tilde(answer).into_owned();
    debug!("Prompt '{}' answered with {:?}", label, expanded);
    Ok(PathBuf::from(expanded))
}
