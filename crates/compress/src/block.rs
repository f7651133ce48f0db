//! Length-prefixed block framing (spec §4.1, §6).
//!
//! `{block_size: u32, bytes: u8[block_size]}` frames, terminated by a
//! `block_size = 0` frame. The framing is agnostic to what the bytes mean —
//! compressed payload, raw delta-coder output, or plain bytes — callers
//! supply a [`BlockProducer`]/[`BlockConsumer`] to interpret them.

use std::io::{self, Read, Write};

use core::error::CoreError;

/// Default cap on a single block's size; larger frames are a protocol error
/// per spec §6 ("Values above a receive buffer cap are a protocol error").
pub const DEFAULT_MAX_BLOCK_SIZE: u32 = 64 * 1024 * 1024;

/// Supplies successive blocks to send, yielding `None` once exhausted.
pub trait BlockProducer {
    /// Returns the next block of bytes, or `None` when the stream is done.
    fn next_block(&mut self) -> io::Result<Option<Vec<u8>>>;
}

/// Consumes successive received blocks.
pub trait BlockConsumer {
    /// Handles one received block.
    fn consume_block(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Called once the terminator frame has been received; flushes any
    /// buffered state (e.g. a decompressor's trailing bytes).
    fn finish(&mut self) -> io::Result<()>;
}

/// Writes `producer`'s blocks to `writer` as length-prefixed frames,
/// followed by the zero-size terminator. Sends are all-or-nothing: a short
/// write is looped internally by [`Write::write_all`]; any error poisons the
/// connection (the caller should not reuse `writer` after an `Err`).
pub fn send_blocks(writer: &mut impl Write, producer: &mut dyn BlockProducer) -> io::Result<u64> {
    let mut total = 0u64;
    while let Some(block) = producer.next_block()? {
        write_block(writer, &block)?;
        total += block.len() as u64;
    }
    write_terminator(writer)?;
    Ok(total)
}

/// Reads length-prefixed frames from `reader`, feeding each to `consumer`
/// until the zero-size terminator is observed. Enforces `max_block_size`.
pub fn recv_blocks(
    reader: &mut impl Read,
    consumer: &mut dyn BlockConsumer,
    max_block_size: u32,
) -> io::Result<()> {
    loop {
        match read_block(reader, max_block_size)? {
            Some(bytes) => consumer.consume_block(&bytes)?,
            None => break,
        }
    }
    consumer.finish()
}

/// Writes one `{block_size, bytes}` frame. `bytes` must not be empty — an
/// empty block is indistinguishable from the terminator.
pub fn write_block(writer: &mut impl Write, bytes: &[u8]) -> io::Result<()> {
    debug_assert!(!bytes.is_empty(), "empty blocks collide with the terminator");
    let len = u32::try_from(bytes.len()).map_err(|_| {
        io::Error::other(CoreError::Protocol(format!(
            "block of {} bytes exceeds u32::MAX",
            bytes.len()
        )))
    })?;
    writer.write_all(&len.to_le_bytes())?;
    writer.write_all(bytes)
}

/// Writes the zero-size terminator frame.
pub fn write_terminator(writer: &mut impl Write) -> io::Result<()> {
    writer.write_all(&0u32.to_le_bytes())
}

/// Reads one frame; `Ok(None)` means the terminator was read.
pub fn read_block(reader: &mut impl Read, max_block_size: u32) -> io::Result<Option<Vec<u8>>> {
    let mut len_bytes = [0u8; 4];
    reader.read_exact(&mut len_bytes)?;
    let len = u32::from_le_bytes(len_bytes);
    if len == 0 {
        return Ok(None);
    }
    if len > max_block_size {
        return Err(io::Error::other(CoreError::Protocol(format!(
            "block of {len} bytes exceeds the {max_block_size}-byte receive cap"
        ))));
    }
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf)?;
    Ok(Some(buf))
}

/// A [`BlockProducer`] that chunks a plain (uncompressed) reader into
/// fixed-size blocks, used when compression is disabled.
pub struct RawBlockProducer<R> {
    reader: R,
    chunk_size: usize,
}

impl<R: Read> RawBlockProducer<R> {
    /// Wraps `reader`, emitting blocks of at most `chunk_size` bytes.
    pub const fn new(reader: R, chunk_size: usize) -> Self {
        Self { reader, chunk_size }
    }
}

impl<R: Read> BlockProducer for RawBlockProducer<R> {
    fn next_block(&mut self) -> io::Result<Option<Vec<u8>>> {
        let mut buf = vec![0u8; self.chunk_size];
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.reader.read(&mut buf[filled..])?;
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

/// A [`BlockConsumer`] that writes received blocks straight through to a
/// plain writer, used when compression is disabled.
pub struct RawBlockConsumer<W> {
    writer: W,
}

impl<W: Write> RawBlockConsumer<W> {
    /// Wraps `writer`.
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes `self`, returning the wrapped writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> BlockConsumer for RawBlockConsumer<W> {
    fn consume_block(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.writer.write_all(bytes)
    }

    fn finish(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trip_raw_blocks() {
        let data = b"hello relaycopy world, this is a test payload".to_vec();
        let mut wire = Vec::new();
        let mut producer = RawBlockProducer::new(Cursor::new(data.clone()), 7);
        send_blocks(&mut wire, &mut producer).unwrap();

        let mut out = Vec::new();
        let mut consumer = RawBlockConsumer::new(&mut out);
        recv_blocks(&mut Cursor::new(wire), &mut consumer, DEFAULT_MAX_BLOCK_SIZE).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn empty_input_is_just_the_terminator() {
        let mut wire = Vec::new();
        let mut producer = RawBlockProducer::new(Cursor::new(Vec::<u8>::new()), 16);
        send_blocks(&mut wire, &mut producer).unwrap();
        assert_eq!(wire, 0u32.to_le_bytes());
    }

    #[test]
    fn oversize_block_is_protocol_error() {
        let mut wire = Vec::new();
        write_block(&mut wire, &vec![0u8; 100]).unwrap();
        write_terminator(&mut wire).unwrap();
        let mut out = Vec::new();
        let mut consumer = RawBlockConsumer::new(&mut out);
        let err = recv_blocks(&mut Cursor::new(wire), &mut consumer, 10).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Other);
    }

    #[test]
    fn zero_size_peer_close_mid_stream_is_a_clean_terminator() {
        let mut wire = Vec::new();
        write_block(&mut wire, b"partial").unwrap();
        write_terminator(&mut wire).unwrap();
        let mut out = Vec::new();
        let mut consumer = RawBlockConsumer::new(&mut out);
        recv_blocks(&mut Cursor::new(wire), &mut consumer, DEFAULT_MAX_BLOCK_SIZE).unwrap();
        assert_eq!(out, b"partial");
    }

    proptest::proptest! {
        #[test]
        fn round_trip_arbitrary_payload(data: Vec<u8>, chunk in 1usize..64) {
            let mut wire = Vec::new();
            let mut producer = RawBlockProducer::new(Cursor::new(data.clone()), chunk);
            send_blocks(&mut wire, &mut producer).unwrap();
            let mut out = Vec::new();
            let mut consumer = RawBlockConsumer::new(&mut out);
            recv_blocks(&mut Cursor::new(wire), &mut consumer, DEFAULT_MAX_BLOCK_SIZE).unwrap();
            proptest::prop_assert_eq!(out, data);
        }
    }
}
