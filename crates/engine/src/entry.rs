//! Work-queue item type produced by traversal and consumed by workers
//! (spec §4.5 "processDir").

use std::path::PathBuf;

use core::key::FileInfo;

/// Where a file's bytes are read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CopySource {
    /// Read directly off local disk.
    Local(PathBuf),
    /// Read via a `ReadFile` command against the connected server,
    /// `path` relative to the session's bound `net_directory`.
    Server {
        /// Path relative to the server's bound root.
        path: String,
    },
}

/// Where a file's bytes are written to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CopyDestination {
    /// Write directly to local disk.
    Local(PathBuf),
    /// Write via a `WriteFile` command against the connected server.
    Server {
        /// Path relative to the server's bound root.
        path: String,
    },
}

/// One file queued for processing by a worker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CopyEntry {
    /// Name used for filter matching, handled-set membership, and the
    /// protocol's `FileKey`.
    pub name: String,
    /// Source location.
    pub source: CopySource,
    /// Destination location.
    pub destination: CopyDestination,
    /// Source file metadata as observed during traversal.
    pub info: FileInfo,
    /// Depth below the copy root, for `copy_subdir_depth` enforcement.
    pub depth: u32,
    /// Whether this line came from a file-list input marked `/PURGE`,
    /// exempting its destination directory from purge (spec §6).
    pub purge_exempt: bool,
}

/// One directory queued for traversal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    /// Source directory, local or server-relative.
    pub source: CopySource,
    /// Destination directory, local or server-relative.
    pub destination: CopyDestination,
    /// Depth below the copy root.
    pub depth: u32,
}

/// A single unit of work drawn from the shared queue: either a directory
/// still to be traversed or a file still to be copied.
///
/// Carrying both kinds through one [`crate::queue::WorkQueue`] (rather than
/// a separate queue per kind) keeps traversal's pending-count check
/// correct: a worker finishing a directory may enqueue more directories
/// *and* files in the same breath, and the queue's own pending counter
/// only drops to zero, and thus only closes, once every one of those has
/// also been finished (spec §4.5: traversal and copy share one pool).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WorkItem {
    /// A directory still to be traversed.
    Dir(DirEntry),
    /// A file still to be copied.
    File(CopyEntry),
}
