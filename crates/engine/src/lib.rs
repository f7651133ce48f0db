#![deny(missing_docs)]

//! The client work engine: traversal, the worker pool, content/link
//! decisions, purge, and directory priming (spec §4.5–§4.9).
//!
//! # Design
//!
//! [`traverse`] walks the source tree and produces [`entry::WorkItem`]s.
//! [`worker`] drains a shared [`queue::WorkQueue`] of those items, dispatching
//! a directory back into `traverse` and a file into either [`local_copy`]
//! (direct I/O) or [`peer`] (a connected server), wrapping every storage or
//! network operation in [`retry::with_retry`]. [`purge`] runs the post-copy
//! destination sweep; [`prime`] pre-populates a [`filedb::FileDatabase`]
//! ahead of time. [`process`] ties all of the above into the one entry point
//! a caller invokes per run.
//!
//! # See also
//!
//! `relaycopy-server`'s `listener` module for the wire sequence `peer`
//! drives from the client side.

pub mod entry;
pub mod filter;
pub mod handled;
pub mod local_copy;
pub mod peer;
pub mod prime;
pub mod process;
pub mod purge;
pub mod queue;
pub mod retry;
pub mod settings;
pub mod stats;
pub mod traverse;
pub mod worker;

pub use process::{prime_then_process, process};
pub use settings::{ClientSettings, CompressionLevel, UseServer, COMPRESSION_DYNAMIC};
pub use stats::Stats;
