//! The `FileSystem` capability.
//!
//! Raw filesystem primitives are out of scope for this specification (spec
//! §1); the core depends only on this trait so the work engine and server
//! session handler can be exercised against an in-memory fake in tests.

use std::io;
use std::path::{Path, PathBuf};

use crate::key::{FileInfo, FileTime};

/// A single directory entry returned by [`FileSystem::enumerate`].
#[derive(Clone, Debug)]
pub struct DirEntry {
    /// Name relative to the enumerated directory.
    pub name: String,
    /// Whether the entry is itself a directory.
    pub is_dir: bool,
    /// Whether the entry is a symlink (never entered by the purge walk).
    pub is_symlink: bool,
}

/// An open handle for reading.
pub trait ReadHandle: io::Read + Send {
    /// Seeks to an absolute byte offset, as used by delta patching against a
    /// reference file held open read-only.
    fn seek_to(&mut self, offset: u64) -> io::Result<()>;
}

/// An open handle for writing.
pub trait WriteHandle: io::Write + Send {}

/// Adapts a boxed [`ReadHandle`] to plain [`io::Read`], for callers (hashing,
/// plain body transfer) that don't need `seek_to`. `dyn ReadHandle` already
/// requires `io::Read`, but a trait object can't be reborrowed as its
/// supertrait's object type directly, so callers go through this adapter
/// instead.
pub struct ReadAdapter(Box<dyn ReadHandle>);

impl ReadAdapter {
    /// Wraps `inner` for use as a plain reader.
    #[must_use]
    pub fn new(inner: Box<dyn ReadHandle>) -> Self {
        Self(inner)
    }
}

impl io::Read for ReadAdapter {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.0.read(buf)
    }
}

/// Adapts a boxed [`WriteHandle`] to plain [`io::Write`].
pub struct WriteAdapter(Box<dyn WriteHandle>);

impl WriteAdapter {
    /// Wraps `inner` for use as a plain writer.
    #[must_use]
    pub fn new(inner: Box<dyn WriteHandle>) -> Self {
        Self(inner)
    }
}

impl io::Write for WriteAdapter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

/// Raw filesystem primitives the core treats as an external capability.
///
/// Implementations must be `Send + Sync`: the engine shares one instance
/// across worker threads.
pub trait FileSystem: Send + Sync {
    /// Opens `path` for reading.
    fn open_read(&self, path: &Path) -> io::Result<Box<dyn ReadHandle>>;

    /// Opens `path` for writing, creating or truncating as needed.
    fn open_write(&self, path: &Path) -> io::Result<Box<dyn WriteHandle>>;

    /// Returns metadata for `path`.
    fn stat(&self, path: &Path) -> io::Result<FileInfo>;

    /// Sets the last-write time on `path`.
    fn set_mtime(&self, path: &Path, time: FileTime) -> io::Result<()>;

    /// Creates a hard link at `dst` pointing at the content of `src`.
    fn hardlink(&self, src: &Path, dst: &Path) -> io::Result<()>;

    /// Deletes the file at `path`.
    fn delete(&self, path: &Path) -> io::Result<()>;

    /// Ensures `path` and all missing ancestors exist, returning the number
    /// of directory levels freshly created (capped at 200 by the caller).
    fn ensure_dir(&self, path: &Path) -> io::Result<u32>;

    /// Lists the immediate children of `path`.
    fn enumerate(&self, path: &Path) -> io::Result<Vec<DirEntry>>;

    /// Moves/renames `src` to `dst`, used for atomic destination placement.
    fn move_file(&self, src: &Path, dst: &Path) -> io::Result<()>;

    /// Clears the read-only attribute on `path`, if platform-applicable.
    fn set_writable(&self, path: &Path) -> io::Result<()>;

    /// Deletes everything under `path`, recursively.
    fn delete_tree(&self, path: &Path) -> io::Result<()>;
}

/// Joins a directory and a relative child, used throughout the engine when
/// building destination paths from a `CopyEntry`.
#[must_use]
pub fn join(base: &Path, child: &str) -> PathBuf {
    base.join(child)
}

/// Adapts a [`ReadHandle`]'s absolute-offset `seek_to` into [`io::Seek`] for
/// callers (delta patching, chiefly) that expect the standard trait.
/// `SeekFrom::End` is not meaningful for `seek_to` and is rejected.
pub struct SeekShim {
    inner: Box<dyn ReadHandle>,
    pos: u64,
}

impl SeekShim {
    /// Wraps `inner`, starting the tracked position at 0.
    #[must_use]
    pub fn new(inner: Box<dyn ReadHandle>) -> Self {
        Self { inner, pos: 0 }
    }
}

impl io::Read for SeekShim {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl io::Seek for SeekShim {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        let target = match pos {
            io::SeekFrom::Start(offset) => offset,
            io::SeekFrom::Current(delta) => {
                u64::try_from(i64::try_from(self.pos).unwrap_or(i64::MAX) + delta)
                    .map_err(|_| io::Error::other("seek before start of stream"))?
            }
            io::SeekFrom::End(_) => {
                return Err(io::Error::other("SeekShim cannot seek relative to end"))
            }
        };
        self.inner.seek_to(target)?;
        self.pos = target;
        Ok(target)
    }
}
