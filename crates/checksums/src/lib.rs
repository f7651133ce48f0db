#![deny(missing_docs)]

//! The Hash Engine (spec §4.8): a streaming content fingerprint that
//! produces a fixed-width [`core::Hash`] digest.
//!
//! # Design
//!
//! `HashEngine::digest_reader` feeds a [`std::io::Read`] through an MD5
//! state in [`CHUNK_SIZE`]-sized reads, matching the copy-context buffer
//! size used elsewhere by the client engine. MD5 is not a security
//! requirement here — the digest only disambiguates content identity for
//! link/delta candidate selection — but its 128-bit output maps directly
//! onto [`core::Hash`] without truncation, and it is the same "strong
//! digest" building block the wider ecosystem reaches for in file-sync
//! tools.

use std::io::{self, Read};
use std::time::Instant;

use core::Hash;
use digest::Digest;

/// Chunk size used when streaming a file through the digest, matching the
/// `CopyContextBufferSize` referenced by spec §4.8 and §6.
pub const CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Accumulated timing/count stats for hashing, merged into the per-thread
/// [`relaycopy_engine`]-level stats aggregator.
#[derive(Clone, Copy, Debug, Default)]
pub struct HashStats {
    /// Number of files hashed.
    pub files_hashed: u64,
    /// Total bytes streamed through the digest.
    pub bytes_hashed: u64,
    /// Cumulative wall-clock time spent hashing.
    pub elapsed: std::time::Duration,
}

/// Streams `reader` through an incremental MD5 state and returns the
/// resulting 16-byte digest plus timing/count stats for the call.
///
/// The hasher is acquired and released within this call (scoped, per spec
/// §4.8); callers do not hold a digest context across calls.
pub fn digest_reader(reader: &mut dyn Read) -> io::Result<(Hash, HashStats)> {
    let start = Instant::now();
    let mut hasher = md5::Md5::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut bytes_hashed = 0u64;

    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        bytes_hashed += n as u64;
    }

    let digest: [u8; 16] = hasher.finalize().into();
    let stats = HashStats {
        files_hashed: 1,
        bytes_hashed,
        elapsed: start.elapsed(),
    };
    Ok((Hash::from_bytes(digest), stats))
}

impl HashStats {
    /// Merges `other` into `self`, used when combining per-thread stats.
    pub fn merge(&mut self, other: Self) {
        self.files_hashed += other.files_hashed;
        self.bytes_hashed += other.bytes_hashed;
        self.elapsed += other.elapsed;
    }
}
