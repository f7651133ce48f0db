#![deny(missing_docs)]

//! Shared data model, error taxonomy, and log-context plumbing used by every
//! `relaycopy` crate.
//!
//! # Design
//!
//! This crate owns the types that cross component boundaries — [`FileKey`],
//! [`FileInfo`], [`FileTime`], and [`Hash`] — plus the [`error::CoreError`]
//! taxonomy every fallible API in the workspace returns, and the
//! [`log::LogContext`] handle threaded through the client engine and server
//! session loop.
//!
//! Nothing here touches the filesystem or the network; those capabilities are
//! expressed as traits (see [`fs::FileSystem`]) so higher crates can swap in
//! real or in-memory implementations.

pub mod error;
pub mod fs;
pub mod hash;
pub mod key;
pub mod log;

pub use error::{CoreError, CoreResult};
pub use fs::SeekShim;
pub use hash::Hash;
pub use key::{CaseInsensitiveString, FileInfo, FileKey, FileTime};
