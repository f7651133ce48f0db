//! Wires the block-chunked compressed send/receive path and the delta
//! transport on top of the command framing (spec §4.1).

use std::io::{self, Read, Write};

use compress::block::{recv_blocks, send_blocks, RawBlockConsumer, RawBlockProducer, DEFAULT_MAX_BLOCK_SIZE};
use delta::{deserialize, serialize, BlockSignature, DeltaOp, Signature};

/// Chunk size used for the uncompressed and compressed body transfer,
/// matching the copy-context buffer size (spec §4.4, §6).
pub const COPY_CONTEXT_BUFFER_SIZE: usize = 8 * 1024 * 1024;

/// Streams `reader`'s bytes to `writer` as block-chunked frames.
///
/// When the `zstd` feature is enabled and `level.0 > 0`, the body is
/// compressed; otherwise blocks carry plain bytes. Returns the number of
/// bytes placed on the wire (post-compression, if any).
pub fn send_file_body(
    writer: &mut impl Write,
    reader: &mut impl Read,
    level: u8,
) -> io::Result<u64> {
    #[cfg(feature = "zstd")]
    if level > 0 {
        let mut producer = compress::zstd_backend::ZstdBlockProducer::new(
            reader,
            compress::zstd_backend::Level(level),
            COPY_CONTEXT_BUFFER_SIZE,
        )?;
        return send_blocks(writer, &mut producer);
    }
    let _ = level;
    let mut producer = RawBlockProducer::new(reader, COPY_CONTEXT_BUFFER_SIZE);
    send_blocks(writer, &mut producer)
}

/// Receives a block-chunked body from `reader` and writes the reconstructed
/// bytes to `writer`.
pub fn recv_file_body(reader: &mut impl Read, writer: &mut impl Write, compressed: bool) -> io::Result<()> {
    #[cfg(feature = "zstd")]
    if compressed {
        let mut consumer = compress::zstd_backend::ZstdBlockConsumer::new(writer)?;
        return recv_blocks(reader, &mut consumer, DEFAULT_MAX_BLOCK_SIZE);
    }
    let _ = compressed;
    let mut consumer = RawBlockConsumer::new(writer);
    recv_blocks(reader, &mut consumer, DEFAULT_MAX_BLOCK_SIZE)
}

/// Sends a delta op stream as a single block-chunked payload.
pub fn send_delta_ops(writer: &mut impl Write, ops: &[DeltaOp]) -> io::Result<()> {
    let bytes = serialize(ops);
    let mut producer = RawBlockProducer::new(io::Cursor::new(bytes), COPY_CONTEXT_BUFFER_SIZE);
    send_blocks(writer, &mut producer)?;
    Ok(())
}

/// Receives a delta op stream sent by [`send_delta_ops`].
pub fn recv_delta_ops(reader: &mut impl Read) -> io::Result<Vec<DeltaOp>> {
    let mut bytes = Vec::new();
    let mut consumer = RawBlockConsumer::new(&mut bytes);
    recv_blocks(reader, &mut consumer, DEFAULT_MAX_BLOCK_SIZE)?;
    deserialize(&bytes)
}

/// Sends a reference file's block signature, the first leg of the
/// signature→delta→patch exchange (spec §4.1, §4.6): the side holding the
/// reference file sends its signature so the other side can compute a delta
/// without ever seeing the reference's raw bytes.
pub fn send_signature(writer: &mut impl Write, signature: &Signature) -> io::Result<()> {
    let bytes = encode_signature(signature);
    let mut producer = RawBlockProducer::new(io::Cursor::new(bytes), COPY_CONTEXT_BUFFER_SIZE);
    send_blocks(writer, &mut producer)?;
    Ok(())
}

/// Receives a block signature sent by [`send_signature`].
pub fn recv_signature(reader: &mut impl Read) -> io::Result<Signature> {
    let mut bytes = Vec::new();
    let mut consumer = RawBlockConsumer::new(&mut bytes);
    recv_blocks(reader, &mut consumer, DEFAULT_MAX_BLOCK_SIZE)?;
    decode_signature(&bytes)
}

fn encode_signature(signature: &Signature) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + signature.blocks.len() * 28);
    out.extend_from_slice(&signature.block_size.to_le_bytes());
    for block in &signature.blocks {
        out.extend_from_slice(&block.index.to_le_bytes());
        out.extend_from_slice(&block.weak.to_le_bytes());
        out.extend_from_slice(&block.strong);
        out.extend_from_slice(&block.len.to_le_bytes());
    }
    out
}

fn decode_signature(bytes: &[u8]) -> io::Result<Signature> {
    if bytes.len() < 4 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated signature header"));
    }
    let block_size = u32::from_le_bytes(bytes[0..4].try_into().unwrap());
    let mut rest = &bytes[4..];
    let mut blocks = Vec::new();
    while !rest.is_empty() {
        if rest.len() < 28 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "truncated signature block"));
        }
        let index = u32::from_le_bytes(rest[0..4].try_into().unwrap());
        let weak = u32::from_le_bytes(rest[4..8].try_into().unwrap());
        let mut strong = [0u8; 16];
        strong.copy_from_slice(&rest[8..24]);
        let len = u32::from_le_bytes(rest[24..28].try_into().unwrap());
        blocks.push(BlockSignature { index, weak, strong, len });
        rest = &rest[28..];
    }
    Ok(Signature { block_size, blocks })
}
