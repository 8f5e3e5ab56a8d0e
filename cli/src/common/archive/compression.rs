//! # Stream Compression (`common::archive::compression`)
//!
//! File: cli/src/common/archive/compression.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Wraps the byte stream between the tar codec and the file on disk. The codec
//! itself never knows whether it is talking to gzip or to a plain file:
//!
//! - **`CompressWriter`**: either passes bytes through or gzip-compresses them
//!   with `flate2`. `finish()` writes the gzip trailer and hands back the inner
//!   writer.
//! - **`DecompressReader`**: sniffs the first two bytes of the input. The gzip
//!   magic `1f 8b` selects a multi-member gzip decoder; anything else is read as
//!   a plain tar stream.
//!
//! Gzip output carries a zero header timestamp and no file name, so the same
//! input always compresses to the same bytes.
//!
//! ```rust
//! let out = CompressWriter::new(BufWriter::new(file), Compression::gzip(6));
//! // ... write the tar stream ...
//! let file = out.finish()?.into_inner()?;
//!
//! let mut input = DecompressReader::new(BufReader::new(File::open(path)?))?;
//! ```
//!
use flate2::bufread::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::GzBuilder;
use std::fmt;
use std::io::{self, BufRead, Read, Write};

pub const DEFAULT_LEVEL: u32 = 6;
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// How the tar stream is compressed on the way to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    /// Gzip at `level` 0 (store) to 9 (best).
    Gzip { level: u32 },
}

impl Compression {
    pub fn gzip(level: u32) -> Self {
        Compression::Gzip {
            level: level.min(9),
        }
    }

    /// Builds the setting from the `compress` flag and level used by the CLI
    /// and the configuration file.
    pub fn from_settings(compress: bool, level: u32) -> Self {
        if compress {
            Compression::gzip(level)
        } else {
            Compression::None
        }
    }
}

impl Default for Compression {
    fn default() -> Self {
        Compression::gzip(DEFAULT_LEVEL)
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compression::None => f.write_str("none"),
            Compression::Gzip { level } => write!(f, "gzip (level {})", level),
        }
    }
}

/// Output side of the compression layer.
pub enum CompressWriter<W: Write> {
    Plain(W),
    Gzip(GzEncoder<W>),
}

impl<W: Write> CompressWriter<W> {
    pub fn new(inner: W, compression: Compression) -> Self {
        match compression {
            Compression::None => CompressWriter::Plain(inner),
            Compression::Gzip { level } => CompressWriter::Gzip(
                GzBuilder::new()
                    .mtime(0)
                    .write(inner, flate2::Compression::new(level.min(9))),
            ),
        }
    }

    /// Flushes everything (including the gzip trailer) and returns the inner writer.
    pub fn finish(self) -> io::Result<W> {
        match self {
            CompressWriter::Plain(mut inner) => {
                inner.flush()?;
                Ok(inner)
            }
            CompressWriter::Gzip(encoder) => encoder.finish(),
        }
    }
}

impl<W: Write> Write for CompressWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            CompressWriter::Plain(inner) => inner.write(buf),
            CompressWriter::Gzip(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            CompressWriter::Plain(inner) => inner.flush(),
            CompressWriter::Gzip(encoder) => encoder.flush(),
        }
    }
}

/// Encoding detected on an input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFormat {
    Plain,
    Gzip,
}

impl fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamFormat::Plain => f.write_str("plain tar"),
            StreamFormat::Gzip => f.write_str("gzip"),
        }
    }
}

/// Peeks at the start of `reader` without consuming anything.
pub fn detect<R: BufRead>(reader: &mut R) -> io::Result<StreamFormat> {
    let head = reader.fill_buf()?;
    if head.starts_with(&GZIP_MAGIC) {
        Ok(StreamFormat::Gzip)
    } else {
        Ok(StreamFormat::Plain)
    }
}

/// Input side of the compression layer.
pub enum DecompressReader<R: BufRead> {
    Plain(R),
    Gzip(MultiGzDecoder<R>),
}

impl<R: BufRead> DecompressReader<R> {
    pub fn new(mut inner: R) -> io::Result<Self> {
        Ok(match detect(&mut inner)? {
            StreamFormat::Plain => DecompressReader::Plain(inner),
            StreamFormat::Gzip => DecompressReader::Gzip(MultiGzDecoder::new(inner)),
        })
    }

    pub fn format(&self) -> StreamFormat {
        match self {
            DecompressReader::Plain(_) => StreamFormat::Plain,
            DecompressReader::Gzip(_) => StreamFormat::Gzip,
        }
    }
}

impl<R: BufRead> Read for DecompressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            DecompressReader::Plain(inner) => inner.read(buf),
            DecompressReader::Gzip(decoder) => decoder.read(buf),
        }
    }
}
