//! Block signatures generated against a reference file (spec §4.1's
//! "signature generation" step of the signature→delta→patch exchange).

use std::io::{self, Read};

use digest::Digest;
use rustc_hash::FxHashMap;

use crate::rolling::RollingChecksum;

/// Default block size used when the caller does not override it. Smaller
/// blocks find more matches at the cost of a larger signature.
pub const DEFAULT_BLOCK_SIZE: u32 = 4096;

/// One block's weak + strong checksum pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockSignature {
    /// Index of this block within the reference file.
    pub index: u32,
    /// Rolling (weak) checksum of the block.
    pub weak: u32,
    /// Strong (MD5) checksum of the block, used to confirm a weak match.
    pub strong: [u8; 16],
    /// Actual byte length of this block (less than `block_size` only for
    /// the final block of the reference).
    pub len: u32,
}

/// The full signature of a reference file: its block size and the ordered
/// list of block checksums.
#[derive(Clone, Debug, Default)]
pub struct Signature {
    /// Block size used to cut the reference file.
    pub block_size: u32,
    /// Per-block signatures, in file order.
    pub blocks: Vec<BlockSignature>,
}

impl Signature {
    /// Generates a signature for `reference`, reading it to completion.
    pub fn generate(reference: &mut dyn Read, block_size: u32) -> io::Result<Self> {
        let block_size = block_size.max(1);
        let mut blocks = Vec::new();
        let mut buf = vec![0u8; block_size as usize];
        let mut index = 0u32;
        loop {
            let mut filled = 0;
            while filled < buf.len() {
                let n = reference.read(&mut buf[filled..])?;
                if n == 0 {
                    break;
                }
                filled += n;
            }
            if filled == 0 {
                break;
            }
            let chunk = &buf[..filled];
            let weak = RollingChecksum::of(chunk).value();
            let strong: [u8; 16] = md5::Md5::digest(chunk).into();
            blocks.push(BlockSignature {
                index,
                weak,
                strong,
                len: filled as u32,
            });
            index += 1;
            if filled < buf.len() {
                break;
            }
        }
        Ok(Self { block_size, blocks })
    }

    /// Builds a weak-checksum index for fast candidate lookup during
    /// delta encoding.
    #[must_use]
    pub fn index_by_weak(&self) -> FxHashMap<u32, Vec<usize>> {
        let mut map: FxHashMap<u32, Vec<usize>> = FxHashMap::default();
        for (i, block) in self.blocks.iter().enumerate() {
            map.entry(block.weak).or_default().push(i);
        }
        map
    }
}
