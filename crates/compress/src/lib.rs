#![deny(missing_docs)]

//! Block-chunked compressed transport framing (spec §4.1).
//!
//! [`block`] implements the length-prefixed frame codec that both the
//! compressed send/receive path and the delta transport (`relaycopy-delta`)
//! build on. [`zstd_backend`] is the substitutable default compressor; any
//! type implementing [`block::BlockProducer`]/[`block::BlockConsumer`] can
//! stand in for it, per spec §1's "concrete compression... core specifies
//! their framed message shapes; any compressor honoring the shape is
//! substitutable".

pub mod block;

#[cfg(feature = "zstd")]
pub mod zstd_backend;

pub use block::{
    read_block, recv_blocks, send_blocks, write_block, write_terminator, BlockConsumer,
    BlockProducer, RawBlockConsumer, RawBlockProducer, DEFAULT_MAX_BLOCK_SIZE,
};
