//! Zstandard-backed [`BlockProducer`]/[`BlockConsumer`] implementations.
//!
//! Concrete compression is out of scope for the core specification (spec
//! §1); this module is the substitutable default backend, not a required
//! shape. Any compressor honoring the block-frame contract in [`crate::block`]
//! may replace it.

use std::io::{self, Read, Write};

use crate::block::{BlockConsumer, BlockProducer};

/// Compression level, `0` meaning store (handled by the caller choosing the
/// uncompressed path instead) through `22` maximum, or the dynamic sentinel
/// `255` which this backend maps to zstd's recommended default.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Level(pub u8);

impl Level {
    fn as_zstd_level(self) -> i32 {
        if self.0 == 255 {
            3
        } else {
            i32::from(self.0).clamp(1, 22)
        }
    }
}

/// Reads plain bytes from an inner reader and yields zstd-compressed blocks.
pub struct ZstdBlockProducer<'a, R: Read> {
    encoder: zstd::stream::read::Encoder<'a, R>,
    chunk_size: usize,
}

impl<'a, R: Read> ZstdBlockProducer<'a, R> {
    /// Wraps `reader`, compressing at `level` and emitting frames of at most
    /// `chunk_size` compressed bytes.
    pub fn new(reader: R, level: Level, chunk_size: usize) -> io::Result<Self> {
        let encoder = zstd::stream::read::Encoder::new(reader, level.as_zstd_level())?;
        Ok(Self {
            encoder,
            chunk_size,
        })
    }
}

impl<R: Read> BlockProducer for ZstdBlockProducer<'_, R> {
    fn next_block(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut buf = vec![0u8; self.chunk_size];
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.encoder.read(&mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            return Ok(None);
        }
        buf.truncate(filled);
        Ok(Some(buf))
    }
}

/// Feeds compressed blocks into a zstd decoder that forwards plain bytes to
/// an inner writer.
pub struct ZstdBlockConsumer<'a, W: Write> {
    decoder: zstd::stream::write::Decoder<'a, W>,
}

impl<'a, W: Write> ZstdBlockConsumer<'a, W> {
    /// Wraps `writer`, which receives decompressed output.
    pub fn new(writer: W) -> io::Result<Self> {
        Ok(Self {
            decoder: zstd::stream::write::Decoder::new(writer)?,
        })
    }

    /// Consumes `self`, returning the wrapped writer.
    pub fn into_inner(self) -> io::Result<W> {
        self.decoder.into_inner()
    }
}

impl<W: Write> BlockConsumer for ZstdBlockConsumer<'_, W> {
    fn consume_block(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.decoder.write_all(bytes)
    }

    fn finish(&mut self) -> io::Result<()> {
        self.decoder.flush()
    }
}
