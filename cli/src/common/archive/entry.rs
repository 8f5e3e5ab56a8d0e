//! # Archive Entries (`common::archive::entry`)
//!
//! File: cli/src/common/archive/entry.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! `Entry` is the unit that flows through every stage of the engine: the walker
//! produces entries from the filesystem, the encoder turns them into headers, the
//! decoder turns headers back into entries and the unpacker restores them.
//!
//! Paths are always slash-separated, relative, and without a leading separator
//! (`photos/2024/beach.jpg`), whatever the host platform.
//!
use std::fmt;

/// What kind of filesystem object an entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    /// A tar entry type this tool does not restore (hard link, device, FIFO, ...),
    /// carrying its raw typeflag. Only produced by the decoder.
    Other(u8),
}

impl EntryKind {
    /// Single-character marker used by `tarball list --long`.
    pub fn marker(self) -> char {
        match self {
            EntryKind::File => '-',
            EntryKind::Directory => 'd',
            EntryKind::Symlink => 'l',
            EntryKind::Other(_) => '?',
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::File => f.write_str("file"),
            EntryKind::Directory => f.write_str("directory"),
            EntryKind::Symlink => f.write_str("symlink"),
            EntryKind::Other(flag) => write!(f, "unsupported entry type '{}'", *flag as char),
        }
    }
}

/// One filesystem object inside an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Relative, slash-separated path.
    pub path: String,
    pub kind: EntryKind,
    /// Payload length in bytes. Zero for everything but files.
    pub size: u64,
    /// Permission bits (`0o7777` mask).
    pub mode: u32,
    /// Modification time in seconds since the Unix epoch.
    pub mtime: u64,
    /// Symlink target, only for `EntryKind::Symlink`.
    pub link_target: Option<String>,
}

impl Entry {
    pub fn file(path: impl Into<String>, size: u64, mode: u32, mtime: u64) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::File,
            size,
            mode,
            mtime,
            link_target: None,
        }
    }

    pub fn directory(path: impl Into<String>, mode: u32, mtime: u64) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Directory,
            size: 0,
            mode,
            mtime,
            link_target: None,
        }
    }

    pub fn symlink(path: impl Into<String>, target: impl Into<String>, mtime: u64) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Symlink,
            size: 0,
            mode: 0o777,
            mtime,
            link_target: Some(target.into()),
        }
    }

    /// Lowercased extension of the entry's file name, if it has one.
    pub fn extension(&self) -> Option<String> {
        let name = self.path.rsplit('/').next().unwrap_or(&self.path);
        match name.rfind('.') {
            Some(0) | None => None,
            Some(idx) => Some(name[idx + 1..].to_ascii_lowercase()),
        }
    }

    /// `rwxr-xr-x`-style permission string prefixed by the kind marker.
    pub fn mode_string(&self) -> String {
        let mut out = String::with_capacity(10);
        out.push(self.kind.marker());
        for shift in [6u32, 3, 0] {
            let bits = (self.mode >> shift) & 0o7;
            out.push(if bits & 0o4 != 0 { 'r' } else { '-' });
            out.push(if bits & 0o2 != 0 { 'w' } else { '-' });
            out.push(if bits & 0o1 != 0 { 'x' } else { '-' });
        }
        out
    }
}

/// Running totals of the entries an operation has handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryCounts {
    pub files: u64,
    pub directories: u64,
    pub symlinks: u64,
    /// Sum of file payload sizes.
    pub payload_bytes: u64,
}

impl EntryCounts {
    pub fn record(&mut self, entry: &Entry) {
        match entry.kind {
            EntryKind::File => {
                self.files += 1;
                self.payload_bytes += entry.size;
            }
            EntryKind::Directory => self.directories += 1,
            EntryKind::Symlink => self.symlinks += 1,
            EntryKind::Other(_) => {}
        }
    }

    pub fn total(&self) -> u64 {
        self.files + self.directories + self.symlinks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension() {
        assert_eq!(
            Entry::file("photos/Beach.JPG", 1, 0o644, 0).extension().as_deref(),
            Some("jpg")
        );
        assert_eq!(Entry::file("notes/README", 1, 0o644, 0).extension(), None);
        assert_eq!(Entry::file("home/.bashrc", 1, 0o644, 0).extension(), None);
        assert_eq!(
            Entry::file("a.b/archive.tar.gz", 1, 0o644, 0).extension().as_deref(),
            Some("gz")
        );
    }

    #[test]
    fn test_mode_string() {
        assert_eq!(Entry::directory("d", 0o755, 0).mode_string(), "drwxr-xr-x");
        assert_eq!(Entry::file("f", 3, 0o640, 0).mode_string(), "-rw-r-----");
        assert_eq!(Entry::symlink("l", "f", 0).mode_string(), "lrwxrwxrwx");
    }

    #[test]
    fn test_counts() {
        let mut counts = EntryCounts::default();
        counts.record(&Entry::directory("d", 0o755, 0));
        counts.record(&Entry::file("d/a", 10, 0o644, 0));
        counts.record(&Entry::file("d/b", 5, 0o644, 0));
        counts.record(&Entry::symlink("d/c", "a", 0));
        assert_eq!(counts.files, 2);
        assert_eq!(counts.payload_bytes, 15);
        assert_eq!(counts.total(), 4);
    }
}
