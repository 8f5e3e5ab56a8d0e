//! # Tarball CLI Integration Test Common Helpers
//!
//! File: cli/tests/common.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Shared helpers for the integration tests in `cli/tests/`. Each test runs the
//! compiled `tarball` binary inside its own `Sandbox`: a temporary directory
//! that is also the working directory and `HOME`, so no user or project
//! configuration from the machine running the tests leaks in.
//!

// Different test files use different helpers.
#![allow(dead_code)]

pub use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Returns a `Command` for the compiled `tarball` binary.
pub fn tarball_cmd() -> Command {
    Command::cargo_bin("tarball").expect("Failed to find tarball binary for testing")
}

/// An isolated working directory for one test.
pub struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create sandbox directory");
        // Stops the project config search from walking above the sandbox.
        fs::create_dir(dir.path().join(".git")).expect("Failed to create .git marker");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn join(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    /// `tarball` running inside the sandbox with a clean environment.
    pub fn cmd(&self) -> Command {
        let mut cmd = tarball_cmd();
        cmd.current_dir(self.path())
            .env("HOME", self.path())
            .env("XDG_CONFIG_HOME", self.path().join(".config"))
            .env_remove("TARBALL_CONFIG")
            .env_remove("RUST_LOG");
        cmd
    }

    /// Writes `content` to `rel`, creating parent directories.
    pub fn write(&self, rel: &str, content: impl AsRef<[u8]>) -> PathBuf {
        let path = self.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&path, content).expect("Failed to write sandbox file");
        path
    }

    /// A small tree under `rel`: two text files, a nested file and an empty directory.
    pub fn sample_tree(&self, rel: &str) -> PathBuf {
        self.write(&format!("{}/notes.txt", rel), "remember the milk\n");
        self.write(&format!("{}/docs/guide.md", rel), "# Guide\n");
        self.write(&format!("{}/docs/deep/data.bin", rel), vec![42u8; 70_000]);
        self.write(&format!("{}/beach.jpg", rel), [0xffu8, 0xd8, 0xff, 0xe0]);
        fs::create_dir_all(self.join(&format!("{}/empty", rel))).expect("Failed to create dir");
        self.join(rel)
    }
}

/// Writes an uncompressed tar holding a single file whose stored name is
/// exactly `name`, bypassing the path checks of the `tar` crate's builder.
pub fn write_raw_tar(path: &Path, name: &str, content: &[u8]) {
    let mut header = tar::Header::new_ustar();
    header.as_old_mut().name[..name.len()].copy_from_slice(name.as_bytes());
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(0);
    header.set_entry_type(tar::EntryType::Regular);
    header.set_cksum();

    let mut bytes = header.as_bytes().to_vec();
    bytes.extend_from_slice(content);
    let padded = bytes.len().div_ceil(512) * 512;
    bytes.resize(padded, 0);
    bytes.extend_from_slice(&[0u8; 1024]);
    fs::write(path, bytes).expect("Failed to write raw tar");
}
