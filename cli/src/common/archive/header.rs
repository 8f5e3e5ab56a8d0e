//! # TAR Header Blocks (`common::archive::header`)
//!
//! File: cli/src/common/archive/header.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Block-level helpers for reading tar streams. Header fields are decoded by
//! the `tar` crate (`tar::Header`), which handles the USTAR prefix/name split,
//! octal and GNU base-256 numbers. This module adds what the decoder needs on
//! top of that:
//!
//! - checksum verification of every header block read,
//! - zero-block and padding arithmetic for the end-of-archive marker,
//! - the pax `x` record parser used for archives written by other tools.
//!
use crate::core::error::{ArchiveError, ArchiveResult};
use std::borrow::Cow;
use std::io;
use tar::{EntryType, Header};

pub const BLOCK_SIZE: usize = 512;
pub type Block = [u8; BLOCK_SIZE];

/// Number of zero bytes needed to pad `len` up to a block boundary.
pub fn padding_for(len: u64) -> u64 {
    let rem = len % BLOCK_SIZE as u64;
    if rem == 0 {
        0
    } else {
        BLOCK_SIZE as u64 - rem
    }
}

pub fn is_zero_block(block: &Block) -> bool {
    block.iter().all(|&b| b == 0)
}

/// A header block as stored, before long-name/pax overrides are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawHeader {
    /// Full name, with the USTAR prefix already joined on.
    pub name: Vec<u8>,
    pub entry_type: EntryType,
    pub mode: u32,
    pub size: u64,
    pub mtime: u64,
    pub linkname: Vec<u8>,
}

/// Verifies the checksum of one header block and decodes its fields.
pub fn parse_block(block: &Block) -> ArchiveResult<RawHeader> {
    let header = Header::from_byte_slice(block);
    verify_checksum(header)?;

    Ok(RawHeader {
        name: header.path_bytes().into_owned(),
        entry_type: header.entry_type(),
        mode: header.mode().map_err(invalid_field("mode"))? & 0o7777,
        size: header.entry_size().map_err(invalid_field("size"))?,
        mtime: header.mtime().map_err(invalid_field("mtime"))?,
        linkname: header
            .link_name_bytes()
            .map(Cow::into_owned)
            .unwrap_or_default(),
    })
}

fn verify_checksum(header: &Header) -> ArchiveResult<()> {
    let stored = header.cksum().map_err(invalid_field("checksum"))?;
    let mut expected = header.clone();
    expected.set_cksum();
    let computed = expected.cksum().map_err(invalid_field("checksum"))?;
    if stored != computed {
        return Err(ArchiveError::corrupt(format!(
            "header checksum mismatch (stored {:o}, computed {:o})",
            stored, computed
        )));
    }
    Ok(())
}

fn invalid_field(what: &'static str) -> impl Fn(io::Error) -> ArchiveError {
    move |e| ArchiveError::corrupt(format!("invalid {} field in header: {}", what, e))
}

/// Values taken from a pax extended header (`x` record) for the next entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaxOverrides {
    pub path: Option<Vec<u8>>,
    pub linkpath: Option<Vec<u8>>,
    pub size: Option<u64>,
    pub mtime: Option<u64>,
}

/// Parses `"<len> <key>=<value>\n"` records. Unknown keys are ignored.
pub fn parse_pax(mut data: &[u8]) -> ArchiveResult<PaxOverrides> {
    let mut overrides = PaxOverrides::default();
    let malformed = || ArchiveError::corrupt("malformed pax extended header");
    while !data.is_empty() && data[0] != 0 {
        let space = data.iter().position(|&b| b == b' ').ok_or_else(malformed)?;
        let len: usize = std::str::from_utf8(&data[..space])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(malformed)?;
        if len <= space + 1 || len > data.len() || data[len - 1] != b'\n' {
            return Err(malformed());
        }
        let record = &data[space + 1..len - 1];
        let eq = record.iter().position(|&b| b == b'=').ok_or_else(malformed)?;
        let (key, value) = (&record[..eq], &record[eq + 1..]);
        match key {
            b"path" => overrides.path = Some(value.to_vec()),
            b"linkpath" => overrides.linkpath = Some(value.to_vec()),
            b"size" => overrides.size = Some(parse_pax_integer(value).ok_or_else(malformed)?),
            // Fractional seconds are dropped.
            b"mtime" => {
                let whole = value.split(|&b| b == b'.').next().unwrap_or(value);
                overrides.mtime = Some(parse_pax_integer(whole).unwrap_or(0));
            }
            _ => {}
        }
        data = &data[len..];
    }
    Ok(overrides)
}

fn parse_pax_integer(value: &[u8]) -> Option<u64> {
    std::str::from_utf8(value).ok()?.parse().ok()
}
