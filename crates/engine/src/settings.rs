//! `ClientSettings`: the full configuration one `process()` call consumes
//! (spec §3, ambient addition; CLI contract in spec §6).

use std::net::SocketAddr;
use std::path::PathBuf;

/// How the engine should treat a remote peer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UseServer {
    /// Use a server connection if reachable; fall back to direct I/O
    /// otherwise, or on a protocol version mismatch (spec §7).
    Automatic,
    /// A server connection is mandatory; failure to connect is fatal.
    Required,
    /// Never use a server connection even if `server_addr` is set.
    Disabled,
}

/// Requested compression level: `0` disables compression, `1..=22` is a
/// fixed `zstd` level, `255` requests the codec's dynamic level selection.
pub type CompressionLevel = u8;

/// Dynamic compression level sentinel (spec §6).
pub const COMPRESSION_DYNAMIC: CompressionLevel = 255;

/// The full CLI-derived configuration for one `process()` call (spec §3).
#[derive(Clone, Debug)]
pub struct ClientSettings {
    /// Source root, local path or server-relative path.
    pub source: PathBuf,
    /// Destination root, local path or server-relative path.
    pub destination: PathBuf,
    /// Wildcard filters selecting which file names are copied.
    pub include_files: Vec<String>,
    /// Wildcard filters excluding file names that would otherwise match.
    pub exclude_files: Vec<String>,
    /// Wildcard filters selecting which subdirectory names are entered.
    pub include_dirs: Vec<String>,
    /// Wildcard filters excluding subdirectory names from traversal.
    pub exclude_dirs: Vec<String>,
    /// Per-line file list input, with optional trailing `/PURGE` marking a
    /// line's destination for purge-protection exemption.
    pub file_list: Option<PathBuf>,
    /// Number of times a retriable failure is retried before giving up.
    pub retry_count: u32,
    /// Wait between retries, in milliseconds.
    pub retry_wait_ms: u64,
    /// Maximum recursion depth; `0` copies only the root's immediate files.
    pub copy_subdir_depth: u32,
    /// Whether unhandled destination entries are deleted after the copy
    /// phase (spec §4.7).
    pub purge_destination: bool,
    /// Whether files are placed directly under the destination root,
    /// dropping the source's subdirectory structure.
    pub flatten_destination: bool,
    /// Skip the size/time equality check and always overwrite.
    pub force_copy: bool,
    /// How to treat `server_addr`.
    pub use_server: UseServer,
    /// Requested compression level for file bodies.
    pub compression_level: CompressionLevel,
    /// Minimum source size, in bytes, above which delta compression is
    /// considered (spec §4.6).
    pub delta_compression_threshold: u64,
    /// Minimum source size, in bytes, above which a hard-link attempt is
    /// made instead of a full copy (spec §4.6).
    pub use_links_threshold: u64,
    /// Whether the engine may answer a server's hash challenge.
    pub hash_mode: bool,
    /// Replace symlinks at the destination with real files/directories
    /// instead of leaving them untouched.
    pub replace_symlinks_at_destination: bool,
    /// Number of worker threads; `0` runs single-threaded on the caller.
    pub thread_count: usize,
    /// Whether file I/O should go through a buffered reader/writer.
    pub use_buffered_io: bool,
    /// Optional path to persist/restore the `FileDatabase` between runs
    /// (spec §6 "Persisted state").
    pub link_database_file: Option<PathBuf>,
    /// Admission ceiling advertised to a connected server.
    pub max_concurrent_downloads: usize,
    /// Whether the security-file handshake is required on connect.
    pub security_file_mode: bool,
    /// Address of the peer server, when `use_server` is not `Disabled`.
    pub server_addr: Option<SocketAddr>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            source: PathBuf::new(),
            destination: PathBuf::new(),
            include_files: Vec::new(),
            exclude_files: Vec::new(),
            include_dirs: Vec::new(),
            exclude_dirs: Vec::new(),
            file_list: None,
            retry_count: 3,
            retry_wait_ms: 1000,
            copy_subdir_depth: u32::MAX,
            purge_destination: false,
            flatten_destination: false,
            force_copy: false,
            use_server: UseServer::Disabled,
            compression_level: 0,
            delta_compression_threshold: u64::MAX,
            use_links_threshold: 0,
            hash_mode: false,
            replace_symlinks_at_destination: false,
            thread_count: 0,
            use_buffered_io: true,
            link_database_file: None,
            max_concurrent_downloads: 8,
            security_file_mode: false,
            server_addr: None,
        }
    }
}
