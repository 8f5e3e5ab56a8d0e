//! # Archive Decoder (`common::archive::decoder`)
//!
//! File: cli/src/common/archive/decoder.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Pull-based reader for tar streams. Each `next_entry` call returns the next
//! real entry, after folding any GNU long-name/long-link or pax records into
//! it. The payload of that entry can then be streamed out with `copy_payload`.
//! Anything the caller leaves unread is skipped on the following call.
//!
//! ```rust
//! let mut decoder = ArchiveDecoder::new(DecompressReader::new(input)?);
//! while let Some(entry) = decoder.next_entry()? {
//!     if entry.kind == EntryKind::File {
//!         decoder.copy_payload(&mut file)?;
//!     }
//! }
//! decoder.finish()?;
//! ```
//!
//! ## Corruption
//!
//! Header fields are decoded with `tar::Header`; the block loop stays here so
//! the end marker and truncation can be checked strictly.
//!
//! The stream is trusted for nothing. A bad header checksum, a stream that ends
//! before the two-zero-block end marker, a payload shorter than its header
//! claims, or a name that is not UTF-8 all yield `ErrorKind::CorruptArchive`.
//!
use super::encoder::CHUNK_SIZE;
use super::entry::{Entry, EntryKind};
use super::header::{self, Block, PaxOverrides, RawHeader, BLOCK_SIZE};
use crate::core::error::{ArchiveError, ArchiveResult};
use std::io::{self, Read, Write};
use tar::EntryType;
use tracing::{debug, trace, warn};

/// Upper bound for long-name, long-link and pax records.
const MAX_METADATA_SIZE: u64 = 1024 * 1024;

pub struct ArchiveDecoder<R: Read> {
    input: R,
    /// Path of the entry most recently returned, for error messages.
    current: String,
    /// Unread payload bytes of the current entry.
    remaining: u64,
    /// Padding after the current payload.
    padding: u64,
    finished: bool,
}

impl<R: Read> ArchiveDecoder<R> {
    pub fn new(input: R) -> Self {
        Self {
            input,
            current: String::new(),
            remaining: 0,
            padding: 0,
            finished: false,
        }
    }

    /// Returns the next entry, or `None` once the end-of-archive marker is read.
    pub fn next_entry(&mut self) -> ArchiveResult<Option<Entry>> {
        if self.finished {
            return Ok(None);
        }
        self.skip_current()?;

        let mut long_name: Option<Vec<u8>> = None;
        let mut long_link: Option<Vec<u8>> = None;
        let mut pax = PaxOverrides::default();
        loop {
            let block = self.read_block()?;
            if header::is_zero_block(&block) {
                let second = self.read_block()?;
                if !header::is_zero_block(&second) {
                    return Err(ArchiveError::corrupt(
                        "lone zero block inside the archive",
                    ));
                }
                if long_name.is_some() || long_link.is_some() || pax != PaxOverrides::default() {
                    return Err(ArchiveError::corrupt(
                        "extended header record is not followed by an entry",
                    ));
                }
                debug!("Reached end-of-archive marker");
                self.finished = true;
                return Ok(None);
            }

            let raw = header::parse_block(&block)?;
            match raw.entry_type {
                EntryType::GNULongName => long_name = Some(self.read_metadata(raw.size)?),
                EntryType::GNULongLink => long_link = Some(self.read_metadata(raw.size)?),
                EntryType::XHeader => pax = header::parse_pax(&self.read_metadata(raw.size)?)?,
                EntryType::XGlobalHeader => {
                    self.read_metadata(raw.size)?;
                    trace!("Ignoring pax global header");
                }
                _ => return self.begin_entry(raw, long_name, long_link, pax).map(Some),
            }
        }
    }

    /// Streams the current entry's remaining payload into `out`.
    ///
    /// Returns the number of bytes copied. Read failures and a stream that runs
    /// out early are `CorruptArchive`; write failures are classified as I/O
    /// errors on the destination.
    pub fn copy_payload<W: Write>(&mut self, out: &mut W) -> ArchiveResult<u64> {
        let mut buf = vec![0u8; CHUNK_SIZE.min(self.remaining as usize)];
        let mut copied = 0;
        while self.remaining > 0 {
            let want = self.remaining.min(buf.len() as u64) as usize;
            let n = match self.input.read(&mut buf[..want]) {
                Ok(0) => {
                    return Err(ArchiveError::corrupt(format!(
                        "archive ended inside the content of '{}' ({} bytes missing)",
                        self.current, self.remaining
                    )))
                }
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(ArchiveError::from_stream(
                        e,
                        format!("Failed to read content of '{}'", self.current),
                    ))
                }
            };
            out.write_all(&buf[..n]).map_err(|e| {
                ArchiveError::from_io(e, format!("Failed to write '{}'", self.current))
            })?;
            self.remaining -= n as u64;
            copied += n as u64;
        }
        self.skip_padding()?;
        Ok(copied)
    }

    /// Reads to the end of the stream, past the end marker.
    ///
    /// Runs the remaining input through the decompressor so a damaged gzip
    /// trailer is still reported. Entries not yet read are skipped.
    pub fn finish(mut self) -> ArchiveResult<()> {
        while self.next_entry()?.is_some() {}
        let trailing = io::copy(&mut self.input, &mut io::sink())
            .map_err(|e| ArchiveError::from_stream(e, "Failed to read past the end of the archive"))?;
        if trailing > 0 {
            trace!("Drained {} bytes after the end-of-archive marker", trailing);
        }
        Ok(())
    }

    fn begin_entry(
        &mut self,
        raw: RawHeader,
        long_name: Option<Vec<u8>>,
        long_link: Option<Vec<u8>>,
        pax: PaxOverrides,
    ) -> ArchiveResult<Entry> {
        let name = pax.path.or(long_name).unwrap_or(raw.name);
        let link = pax.linkpath.or(long_link).unwrap_or(raw.linkname);
        let size = pax.size.unwrap_or(raw.size);
        let mtime = pax.mtime.unwrap_or(raw.mtime);

        let mut path = String::from_utf8(name).map_err(|e| {
            ArchiveError::corrupt(format!(
                "entry name {:?} is not valid UTF-8",
                String::from_utf8_lossy(e.as_bytes())
            ))
        })?;
        // `tar` maps the old-style NUL typeflag to `Regular`.
        let kind = match raw.entry_type {
            EntryType::Regular | EntryType::Continuous if path.ends_with('/') => {
                EntryKind::Directory
            }
            EntryType::Regular | EntryType::Continuous => EntryKind::File,
            EntryType::Directory => EntryKind::Directory,
            EntryType::Symlink => EntryKind::Symlink,
            other => EntryKind::Other(other.as_byte()),
        };
        while path.len() > 1 && path.ends_with('/') {
            path.pop();
        }
        let link_target = match kind {
            EntryKind::Symlink => Some(String::from_utf8(link).map_err(|_| {
                ArchiveError::corrupt(format!("link target of '{}' is not valid UTF-8", path))
            })?),
            _ => None,
        };
        if matches!(kind, EntryKind::Directory | EntryKind::Symlink) && size > 0 {
            warn!("Ignoring {} content bytes on {} '{}'", size, kind, path);
        }

        self.current = path.clone();
        self.remaining = size;
        self.padding = header::padding_for(size);
        trace!("Decoded {} ({}, {} bytes)", path, kind, size);

        Ok(Entry {
            path,
            kind,
            size: match kind {
                EntryKind::File | EntryKind::Other(_) => size,
                _ => 0,
            },
            mode: raw.mode,
            mtime,
            link_target,
        })
    }

    fn read_block(&mut self) -> ArchiveResult<Block> {
        let mut block = [0u8; BLOCK_SIZE];
        self.input.read_exact(&mut block).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                ArchiveError::corrupt("archive ended before the end-of-archive marker")
            } else {
                ArchiveError::from_stream(e, "Failed to read archive header")
            }
        })?;
        Ok(block)
    }

    /// Reads the content of an extended header record, NUL padding trimmed.
    fn read_metadata(&mut self, size: u64) -> ArchiveResult<Vec<u8>> {
        if size > MAX_METADATA_SIZE {
            return Err(ArchiveError::corrupt(format!(
                "extended header record of {} bytes exceeds the {} byte limit",
                size, MAX_METADATA_SIZE
            )));
        }
        let mut data = vec![0u8; size as usize];
        self.input
            .read_exact(&mut data)
            .map_err(|e| ArchiveError::from_stream(e, "Failed to read extended header record"))?;
        self.discard(header::padding_for(size))?;
        while data.last() == Some(&0) {
            data.pop();
        }
        Ok(data)
    }

    fn skip_current(&mut self) -> ArchiveResult<()> {
        let left = self.remaining;
        if left > 0 {
            trace!("Skipping {} unread bytes of '{}'", left, self.current);
            self.discard(left)?;
            self.remaining = 0;
        }
        self.skip_padding()
    }

    fn skip_padding(&mut self) -> ArchiveResult<()> {
        let pad = std::mem::take(&mut self.padding);
        self.discard(pad)
    }

    fn discard(&mut self, len: u64) -> ArchiveResult<()> {
        if len == 0 {
            return Ok(());
        }
        let skipped = io::copy(&mut (&mut self.input).take(len), &mut io::sink())
            .map_err(|e| ArchiveError::from_stream(e, "Failed to read archive"))?;
        if skipped < len {
            return Err(ArchiveError::corrupt(format!(
                "archive ended inside the content of '{}'",
                self.current
            )));
        }
        Ok(())
    }
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::archive::encoder::ArchiveEncoder;
    use crate::core::error::ErrorKind;

    fn sample_archive() -> Vec<u8> {
        let mut encoder = ArchiveEncoder::new(Vec::new());
        encoder.append_entry(&Entry::directory("box", 0o755, 100)).unwrap();
        encoder
            .append_file(&Entry::file("box/one.txt", 3, 0o644, 101), &b"one"[..])
            .unwrap();
        encoder
            .append_file(&Entry::file("box/two.txt", 600, 0o600, 102), &[7u8; 600][..])
            .unwrap();
        encoder.append_entry(&Entry::symlink("box/alias", "one.txt", 103)).unwrap();
        encoder.finish().unwrap()
    }

    fn decode_all(bytes: &[u8]) -> ArchiveResult<Vec<(Entry, Vec<u8>)>> {
        let mut decoder = ArchiveDecoder::new(bytes);
        let mut out = Vec::new();
        while let Some(entry) = decoder.next_entry()? {
            let mut content = Vec::new();
            decoder.copy_payload(&mut content)?;
            out.push((entry, content));
        }
        decoder.finish()?;
        Ok(out)
    }

    fn raw_header(name: &[u8], flag: tar::EntryType, size: u64) -> tar::Header {
        let mut header = tar::Header::new_ustar();
        header.as_old_mut().name[..name.len()].copy_from_slice(name);
        header.set_entry_type(flag);
        header.set_size(size);
        header.set_mode(0o644);
        header.set_mtime(0);
        header.set_cksum();
        header
    }

    #[test]
    fn test_decodes_encoded_entries() -> anyhow::Result<()> {
        let entries = decode_all(&sample_archive())?;
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].0, Entry::directory("box", 0o755, 100));
        assert_eq!(entries[1].0, Entry::file("box/one.txt", 3, 0o644, 101));
        assert_eq!(entries[1].1, b"one");
        assert_eq!(entries[2].1, vec![7u8; 600]);
        assert_eq!(entries[3].0, Entry::symlink("box/alias", "one.txt", 103));
        Ok(())
    }

    #[test]
    fn test_unread_payload_is_skipped() -> anyhow::Result<()> {
        let bytes = sample_archive();
        let mut decoder = ArchiveDecoder::new(&bytes[..]);
        let mut paths = Vec::new();
        while let Some(entry) = decoder.next_entry()? {
            paths.push(entry.path);
        }
        assert_eq!(paths, vec!["box", "box/one.txt", "box/two.txt", "box/alias"]);
        Ok(())
    }

    #[test]
    fn test_truncated_stream_is_corrupt() {
        let bytes = sample_archive();
        // Inside the payload of two.txt, then just before the end marker.
        for cut in [4 * BLOCK_SIZE + 100, bytes.len() - 2 * BLOCK_SIZE, bytes.len() - BLOCK_SIZE] {
            let err = decode_all(&bytes[..cut]).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::CorruptArchive, "cut at {}", cut);
        }
        assert_eq!(decode_all(&[]).unwrap_err().kind(), ErrorKind::CorruptArchive);
    }

    #[test]
    fn test_garbage_is_corrupt() {
        let garbage = vec![b'x'; 4 * BLOCK_SIZE];
        let err = decode_all(&garbage).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptArchive);
    }

    #[test]
    fn test_reads_tar_crate_archive_with_long_names() -> anyhow::Result<()> {
        let long = format!("deep/{}/file.txt", "n".repeat(180));
        let mut builder = tar::Builder::new(Vec::new());
        let mut header = tar::Header::new_gnu();
        header.set_size(4);
        header.set_mode(0o640);
        header.set_mtime(55);
        builder.append_data(&mut header, &long, &b"data"[..])?;
        let bytes = builder.into_inner()?;

        let entries = decode_all(&bytes)?;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0.path, long);
        assert_eq!(entries[0].0.mode, 0o640);
        assert_eq!(entries[0].1, b"data");
        Ok(())
    }

    #[test]
    fn test_pax_header_overrides_path() -> anyhow::Result<()> {
        let record = b"27 path=renamed/by/pax.txt\n";
        let mut bytes = Vec::new();
        bytes.extend_from_slice(raw_header(b"PaxHeaders/x", tar::EntryType::XHeader, record.len() as u64).as_bytes());
        bytes.extend_from_slice(record);
        bytes.resize(2 * BLOCK_SIZE, 0);
        bytes.extend_from_slice(raw_header(b"short.txt", tar::EntryType::Regular, 2).as_bytes());
        bytes.extend_from_slice(b"hi");
        bytes.resize(4 * BLOCK_SIZE, 0);
        bytes.extend_from_slice(&[0u8; 2 * BLOCK_SIZE]);

        let entries = decode_all(&bytes)?;
        assert_eq!(entries[0].0.path, "renamed/by/pax.txt");
        assert_eq!(entries[0].1, b"hi");
        Ok(())
    }

    #[test]
    fn test_unsupported_types_are_reported() -> anyhow::Result<()> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(raw_header(b"fifo", tar::EntryType::Fifo, 0).as_bytes());
        bytes.extend_from_slice(raw_header(b"after.txt", tar::EntryType::Regular, 0).as_bytes());
        bytes.extend_from_slice(&[0u8; 2 * BLOCK_SIZE]);

        let entries = decode_all(&bytes)?;
        assert_eq!(entries[0].0.kind, EntryKind::Other(b'6'));
        assert_eq!(entries[1].0.path, "after.txt");
        Ok(())
    }

    #[test]
    fn test_non_utf8_name_is_corrupt() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(raw_header(b"bad\xff.txt", tar::EntryType::Regular, 0).as_bytes());
        bytes.extend_from_slice(&[0u8; 2 * BLOCK_SIZE]);
        assert_eq!(decode_all(&bytes).unwrap_err().kind(), ErrorKind::CorruptArchive);
    }

    #[test]
    fn test_lone_zero_block_is_corrupt() {
        let mut bytes = vec![0u8; BLOCK_SIZE];
        bytes.extend_from_slice(raw_header(b"late.txt", tar::EntryType::Regular, 0).as_bytes());
        bytes.extend_from_slice(&[0u8; 2 * BLOCK_SIZE]);
        assert_eq!(decode_all(&bytes).unwrap_err().kind(), ErrorKind::CorruptArchive);
    }

    #[test]
    fn test_old_style_directory_and_trailing_data() -> anyhow::Result<()> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(raw_header(b"legacy/", tar::EntryType::Regular, 0).as_bytes());
        bytes.extend_from_slice(&[0u8; 2 * BLOCK_SIZE]);
        // Record padding some tar implementations append.
        bytes.extend_from_slice(&[0u8; 8 * BLOCK_SIZE]);

        let entries = decode_all(&bytes)?;
        assert_eq!(entries[0].0.kind, EntryKind::Directory);
        assert_eq!(entries[0].0.path, "legacy");
        Ok(())
    }
}
