//! # Tarball Extract Command Integration Tests
//!
//! File: cli/tests/extract.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Round trips through the binary, archives written by other tools, and the
//! refusal paths: traversal, truncation, missing input and `--no-overwrite`.
//!

mod common;

use common::{write_raw_tar, Sandbox};
use predicates::prelude::*;
use std::fs;

fn create(sandbox: &Sandbox, source: &str, output: &str, extra: &[&str]) {
    sandbox
        .cmd()
        .args(["create", "-s", source, "-o", output])
        .args(extra)
        .assert()
        .success();
}

#[test]
fn test_extract_round_trip() {
    let sandbox = Sandbox::new();
    sandbox.sample_tree("project");
    create(&sandbox, "project", "project.tar.gz", &[]);

    sandbox
        .cmd()
        .args(["extract", "-t", "project.tar.gz", "-d", "restore"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Extracted 4 files"))
        .stdout(predicate::str::contains("from gzip archive"));

    let restored = sandbox.join("restore/project");
    assert_eq!(
        fs::read_to_string(restored.join("notes.txt")).unwrap(),
        "remember the milk\n"
    );
    assert_eq!(fs::read(restored.join("docs/deep/data.bin")).unwrap(), vec![42u8; 70_000]);
    assert!(restored.join("empty").is_dir());
}

#[test]
fn test_extract_plain_archive_with_alias() {
    let sandbox = Sandbox::new();
    sandbox.sample_tree("project");
    create(&sandbox, "project", "project.tar", &["--no-compress"]);

    sandbox
        .cmd()
        .args(["x", "-t", "project.tar", "-d", "restore"])
        .assert()
        .success()
        .stdout(predicate::str::contains("from plain tar archive"));
    assert!(sandbox.join("restore/project/docs/guide.md").is_file());
}

#[test]
fn test_extract_prompts_for_paths() {
    let sandbox = Sandbox::new();
    sandbox.sample_tree("project");
    create(&sandbox, "project", "project.tgz", &[]);

    sandbox
        .cmd()
        .arg("extract")
        .write_stdin("project.tgz\nrestore\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("Enter tarball path"))
        .stderr(predicate::str::contains("Enter destination path"));
    assert!(sandbox.join("restore/project/notes.txt").is_file());
}

#[test]
fn test_extract_rejects_path_traversal() {
    let sandbox = Sandbox::new();
    write_raw_tar(&sandbox.join("evil.tar"), "../escape.txt", b"gotcha");

    sandbox
        .cmd()
        .args(["extract", "-t", "evil.tar", "-d", "restore"])
        .assert()
        .code(6)
        .stderr(predicate::str::contains("Error [PathTraversal]"));
    assert!(!sandbox.join("escape.txt").exists());
}

#[test]
fn test_extract_rejects_absolute_paths() {
    let sandbox = Sandbox::new();
    write_raw_tar(&sandbox.join("abs.tar"), "/tmp/tarball-abs-test.txt", b"gotcha");

    sandbox
        .cmd()
        .args(["extract", "-t", "abs.tar", "-d", "restore"])
        .assert()
        .code(6);
}

#[test]
fn test_extract_truncated_archive_is_corrupt() {
    let sandbox = Sandbox::new();
    sandbox.sample_tree("project");
    create(&sandbox, "project", "project.tar", &["--no-compress"]);

    let bytes = fs::read(sandbox.join("project.tar")).unwrap();
    fs::write(sandbox.join("cut.tar"), &bytes[..bytes.len() / 2]).unwrap();

    sandbox
        .cmd()
        .args(["extract", "-t", "cut.tar", "-d", "restore"])
        .assert()
        .code(5)
        .stderr(predicate::str::contains("Error [CorruptArchive]"));
}

#[test]
fn test_extract_garbage_is_corrupt() {
    let sandbox = Sandbox::new();
    sandbox.write("notes.tar", "this is not an archive at all");

    sandbox
        .cmd()
        .args(["extract", "-t", "notes.tar", "-d", "restore"])
        .assert()
        .code(5);
}

#[test]
fn test_extract_missing_tarball_is_not_found() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .args(["extract", "-t", "missing.tgz", "-d", "restore"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Error [NotFound]"));
}

#[test]
fn test_extract_no_overwrite_refuses_existing_file() {
    let sandbox = Sandbox::new();
    sandbox.sample_tree("project");
    create(&sandbox, "project", "project.tgz", &[]);
    sandbox.write("restore/project/notes.txt", "keep me");

    sandbox
        .cmd()
        .args(["extract", "-t", "project.tgz", "-d", "restore", "--no-overwrite"])
        .assert()
        .code(7)
        .stderr(predicate::str::contains("Error [AlreadyExists]"));
    assert_eq!(
        fs::read_to_string(sandbox.join("restore/project/notes.txt")).unwrap(),
        "keep me"
    );

    sandbox
        .cmd()
        .args(["extract", "-t", "project.tgz", "-d", "restore"])
        .assert()
        .success();
    assert_eq!(
        fs::read_to_string(sandbox.join("restore/project/notes.txt")).unwrap(),
        "remember the milk\n"
    );
}

#[test]
fn test_extract_archive_from_tar_crate() {
    let sandbox = Sandbox::new();
    let file = fs::File::create(sandbox.join("foreign.tar.gz")).unwrap();
    let gz = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    let mut builder = tar::Builder::new(gz);
    let long_name = format!("foreign/{}/file.txt", "nested-directory".repeat(8));
    let mut header = tar::Header::new_gnu();
    header.set_size(5);
    header.set_mode(0o600);
    header.set_cksum();
    builder
        .append_data(&mut header, &long_name, &b"hello"[..])
        .unwrap();
    builder.into_inner().unwrap().finish().unwrap();

    sandbox
        .cmd()
        .args(["extract", "-t", "foreign.tar.gz", "-d", "restore"])
        .assert()
        .success();
    assert_eq!(
        fs::read_to_string(sandbox.join("restore").join(&long_name)).unwrap(),
        "hello"
    );
}
