//! # Archive Encoder (`common::archive::encoder`)
//!
//! File: cli/src/common/archive/encoder.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Serializes entries into a tar stream, one at a time, onto any `Write`. The
//! headers and block layout come from `tar::Builder`: USTAR headers, with GNU
//! long-name/long-link records for paths and link targets that do not fit.
//! File content is pulled through a `CHUNK_SIZE` buffer, so memory use does
//! not grow with file size.
//!
//! The encoder does not open files itself. The caller opens each file (and can
//! skip it if that fails while the stream is still untouched) and passes the
//! reader to `append_file`. Once a header has been written, any failure leaves
//! the stream unusable and must abort the whole archive.
//!
use super::entry::{Entry, EntryKind};
use crate::core::error::{ArchiveError, ArchiveResult, ErrorKind};
use std::io::{self, BufReader, Read, Write};
use tar::{Builder, EntryType, Header};
use tracing::trace;

/// Size of the buffer used to move file content.
pub const CHUNK_SIZE: usize = 64 * 1024;

pub struct ArchiveEncoder<W: Write> {
    builder: Builder<CountingWriter<W>>,
}

impl<W: Write> ArchiveEncoder<W> {
    pub fn new(out: W) -> Self {
        Self {
            builder: Builder::new(CountingWriter { inner: out, count: 0 }),
        }
    }

    /// Uncompressed bytes emitted so far.
    pub fn bytes_written(&self) -> u64 {
        self.builder.get_ref().count
    }

    /// Writes a directory or symlink entry. Files must go through `append_file`.
    pub fn append_entry(&mut self, entry: &Entry) -> ArchiveResult<()> {
        if entry.kind == EntryKind::File {
            return Err(ArchiveError::invalid_input(format!(
                "'{}' is a file and needs its content",
                entry.path
            )));
        }
        trace!("Encoding {} ({})", entry.path, entry.kind);
        let mut header = header_for(entry);
        let result = match (&entry.kind, &entry.link_target) {
            (EntryKind::Symlink, Some(target)) => {
                self.builder.append_link(&mut header, &entry.path, target)
            }
            _ => self.builder.append_data(&mut header, &entry.path, io::empty()),
        };
        result.map_err(|e| {
            ArchiveError::from_io(e, format!("Failed to write header for '{}'", entry.path))
        })
    }

    /// Writes a file header followed by exactly `entry.size` bytes from `content`.
    ///
    /// A source that ends early is an `IoError`: the header already promised
    /// more bytes than exist, so the stream cannot be completed. Bytes past
    /// `entry.size` are not read.
    pub fn append_file<R: Read>(&mut self, entry: &Entry, content: R) -> ArchiveResult<()> {
        trace!("Encoding {} ({}, {} bytes)", entry.path, entry.kind, entry.size);
        let mut header = header_for(entry);
        let mut source = ExactReader::new(content, entry.size);
        let result = self.builder.append_data(
            &mut header,
            &entry.path,
            BufReader::with_capacity(CHUNK_SIZE, &mut source),
        );
        let Err(e) = result else {
            return Ok(());
        };
        Err(match source.failure {
            Some(SourceFailure::Short) => ArchiveError::new(
                ErrorKind::IoError,
                format!(
                    "'{}' shrank while being archived ({} of {} bytes missing)",
                    entry.path, source.remaining, entry.size
                ),
            ),
            Some(SourceFailure::Read) => {
                ArchiveError::from_io(e, format!("Failed to read '{}'", entry.path))
            }
            None => ArchiveError::from_io(e, format!("Failed to write '{}'", entry.path)),
        })
    }

    /// Writes the end-of-archive marker and returns the underlying writer.
    pub fn finish(self) -> ArchiveResult<W> {
        let mut counted = self
            .builder
            .into_inner()
            .map_err(|e| ArchiveError::from_io(e, "Failed to write end-of-archive marker"))?;
        counted
            .flush()
            .map_err(|e| ArchiveError::from_io(e, "Failed to flush archive"))?;
        trace!("Tar stream complete: {} bytes", counted.count);
        Ok(counted.inner)
    }
}

fn header_for(entry: &Entry) -> Header {
    let mut header = Header::new_ustar();
    header.set_entry_type(match entry.kind {
        EntryKind::File => EntryType::Regular,
        EntryKind::Directory => EntryType::Directory,
        EntryKind::Symlink => EntryType::Symlink,
        EntryKind::Other(flag) => EntryType::new(flag),
    });
    header.set_mode(entry.mode & 0o7777);
    header.set_mtime(entry.mtime);
    header.set_size(if entry.kind == EntryKind::File { entry.size } else { 0 });
    header
}

/// Counts the bytes that reach the underlying writer.
struct CountingWriter<W> {
    inner: W,
    count: u64,
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceFailure {
    Short,
    Read,
}

/// Yields exactly `remaining` bytes of `inner`, and fails if it ends sooner.
struct ExactReader<R> {
    inner: R,
    remaining: u64,
    failure: Option<SourceFailure>,
}

impl<R: Read> ExactReader<R> {
    fn new(inner: R, size: u64) -> Self {
        Self {
            inner,
            remaining: size,
            failure: None,
        }
    }
}

impl<R: Read> Read for ExactReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let want = self.remaining.min(buf.len() as u64) as usize;
        match self.inner.read(&mut buf[..want]) {
            Ok(0) => {
                self.failure = Some(SourceFailure::Short);
                Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "source ended before its recorded size",
                ))
            }
            Ok(n) => {
                self.remaining -= n as u64;
                Ok(n)
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Err(e),
            Err(e) => {
                self.failure = Some(SourceFailure::Read);
                Err(e)
            }
        }
    }
}
