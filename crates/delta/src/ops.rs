//! Delta operation stream: encode against a [`Signature`], patch a
//! reference back into the target (spec §4.1, §4.6).

use std::io::{self, Read, Seek, SeekFrom, Write};

use digest::Digest;

use crate::rolling::RollingChecksum;
use crate::signature::Signature;

/// One instruction in a delta: either copy bytes from the reference file, or
/// insert literal bytes not present in the reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeltaOp {
    /// Copy `len` bytes starting at `ref_offset` in the reference file.
    Copy {
        /// Byte offset into the reference file.
        ref_offset: u64,
        /// Number of bytes to copy.
        len: u32,
    },
    /// Insert literal bytes absent from the reference.
    Data(Vec<u8>),
}

const TAG_COPY: u8 = 0;
const TAG_DATA: u8 = 1;

/// Serializes `ops` into the crate's internal delta wire format. This is the
/// payload that travels inside the block-chunked delta transport (spec
/// §4.1); it is not itself framed.
pub fn serialize(ops: &[DeltaOp]) -> Vec<u8> {
    let mut out = Vec::new();
    for op in ops {
        match op {
            DeltaOp::Copy { ref_offset, len } => {
                out.push(TAG_COPY);
                out.extend_from_slice(&ref_offset.to_le_bytes());
                out.extend_from_slice(&len.to_le_bytes());
            }
            DeltaOp::Data(bytes) => {
                out.push(TAG_DATA);
                out.extend_from_slice(&(bytes.len() as u32).to_le_bytes());
                out.extend_from_slice(bytes);
            }
        }
    }
    out
}

/// Parses a byte stream produced by [`serialize`] back into ops.
pub fn deserialize(mut bytes: &[u8]) -> io::Result<Vec<DeltaOp>> {
    let mut ops = Vec::new();
    while !bytes.is_empty() {
        let tag = bytes[0];
        bytes = &bytes[1..];
        match tag {
            TAG_COPY => {
                if bytes.len() < 12 {
                    return Err(truncated());
                }
                let ref_offset = u64::from_le_bytes(bytes[0..8].try_into().unwrap());
                let len = u32::from_le_bytes(bytes[8..12].try_into().unwrap());
                bytes = &bytes[12..];
                ops.push(DeltaOp::Copy { ref_offset, len });
            }
            TAG_DATA => {
                if bytes.len() < 4 {
                    return Err(truncated());
                }
                let len = u32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
                bytes = &bytes[4..];
                if bytes.len() < len {
                    return Err(truncated());
                }
                ops.push(DeltaOp::Data(bytes[..len].to_vec()));
                bytes = &bytes[len..];
            }
            other => {
                return Err(io::Error::other(format!("unknown delta op tag {other}")));
            }
        }
    }
    Ok(ops)
}

fn truncated() -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, "truncated delta op stream")
}

/// Encodes `target` as a sequence of [`DeltaOp`]s against `signature`.
///
/// Scans `target` for blocks matching the reference's weak+strong checksum
/// pairs; unmatched bytes accumulate into literal [`DeltaOp::Data`] runs.
/// The reference's raw bytes are never read here — only its signature —
/// which is the point of the rsync-style algorithm this mirrors.
pub fn encode_delta(signature: &Signature, target: &mut dyn Read) -> io::Result<Vec<DeltaOp>> {
    let mut data = Vec::new();
    target.read_to_end(&mut data)?;
    let index = signature.index_by_weak();
    let block_size = signature.block_size.max(1) as usize;

    let mut ops = Vec::new();
    let mut literal: Vec<u8> = Vec::new();
    let mut i = 0usize;

    while i < data.len() {
        let window_len = block_size.min(data.len() - i);
        let window = &data[i..i + window_len];
        let weak = RollingChecksum::of(window).value();

        let matched = if window_len == block_size {
            index.get(&weak).and_then(|candidates| {
                let strong: [u8; 16] = md5::Md5::digest(window).into();
                candidates.iter().copied().find_map(|idx| {
                    let block = &signature.blocks[idx];
                    (block.strong == strong && block.len as usize == window_len).then_some(block)
                })
            })
        } else {
            None
        };

        match matched {
            Some(block) => {
                if !literal.is_empty() {
                    ops.push(DeltaOp::Data(std::mem::take(&mut literal)));
                }
                ops.push(DeltaOp::Copy {
                    ref_offset: u64::from(block.index) * u64::from(signature.block_size),
                    len: block.len,
                });
                i += window_len;
            }
            None => {
                literal.push(data[i]);
                i += 1;
            }
        }
    }
    if !literal.is_empty() {
        ops.push(DeltaOp::Data(literal));
    }
    Ok(ops)
}

/// Applies `ops` against `reference`, writing the reconstructed target to
/// `output`. The reference is held open read-only and sought per [`DeltaOp::Copy`].
pub fn patch(
    reference: &mut (impl Read + Seek),
    ops: &[DeltaOp],
    output: &mut dyn Write,
) -> io::Result<()> {
    for op in ops {
        match op {
            DeltaOp::Copy { ref_offset, len } => {
                reference.seek(SeekFrom::Start(*ref_offset))?;
                let mut buf = vec![0u8; *len as usize];
                reference.read_exact(&mut buf)?;
                output.write_all(&buf)?;
            }
            DeltaOp::Data(bytes) => output.write_all(bytes)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::DEFAULT_BLOCK_SIZE;
    use std::io::Cursor;

    fn roundtrip(reference: Vec<u8>, target: Vec<u8>, block_size: u32) {
        let sig = Signature::generate(&mut Cursor::new(reference.clone()), block_size).unwrap();
        let ops = encode_delta(&sig, &mut Cursor::new(target.clone())).unwrap();

        let wire = serialize(&ops);
        let parsed = deserialize(&wire).unwrap();
        assert_eq!(ops, parsed);

        let mut out = Vec::new();
        patch(&mut Cursor::new(reference), &parsed, &mut out).unwrap();
        assert_eq!(out, target);
    }

    #[test]
    fn identical_reference_and_target_is_all_copies() {
        let data = vec![7u8; DEFAULT_BLOCK_SIZE as usize * 3];
        roundtrip(data.clone(), data, DEFAULT_BLOCK_SIZE);
    }

    #[test]
    fn appended_tail_becomes_one_literal_run() {
        let reference = vec![1u8; 4096 * 2];
        let mut target = reference.clone();
        target.extend_from_slice(b"new tail bytes not in the reference");
        roundtrip(reference, target, 4096);
    }

    #[test]
    fn completely_different_target_is_pure_literal() {
        roundtrip(vec![0u8; 4096], b"totally different content".to_vec(), 4096);
    }

    #[test]
    fn empty_target_against_nonempty_reference() {
        roundtrip(vec![9u8; 4096], Vec::new(), 4096);
    }

    #[test]
    fn empty_reference_against_nonempty_target() {
        roundtrip(Vec::new(), b"everything is literal".to_vec(), 4096);
    }

    #[test]
    fn reference_larger_than_target() {
        roundtrip(vec![5u8; 4096 * 10], vec![5u8; 4096 * 2], 4096);
    }

    #[test]
    fn target_larger_than_reference() {
        let reference = vec![3u8; 4096 * 2];
        let mut target = vec![3u8; 4096 * 2];
        target.extend(std::iter::repeat(9u8).take(4096 * 8));
        roundtrip(reference, target, 4096);
    }

    proptest::proptest! {
        #[test]
        fn patch_reconstructs_target_for_arbitrary_inputs(
            reference: Vec<u8>,
            target: Vec<u8>,
            block_size in 1u32..64,
        ) {
            let sig = Signature::generate(&mut Cursor::new(reference.clone()), block_size).unwrap();
            let ops = encode_delta(&sig, &mut Cursor::new(target.clone())).unwrap();
            let mut out = Vec::new();
            patch(&mut Cursor::new(reference), &ops, &mut out).unwrap();
            proptest::prop_assert_eq!(out, target);
        }
    }
}
