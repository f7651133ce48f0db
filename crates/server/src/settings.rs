//! Server-side tunables (spec §4.4, §6).

use std::path::PathBuf;

/// Default listening port (spec §6).
pub const DEFAULT_PORT: u16 = 18099;

/// Default `FileDatabase` history ceiling (spec §6).
pub const DEFAULT_HISTORY_SIZE: usize = 500_000;

/// Configuration bound once at server startup and shared read-only across
/// session threads.
#[derive(Clone, Debug)]
pub struct ServerSettings {
    /// TCP port to listen on.
    pub port: u16,
    /// Minimum source size, in bytes, above which a hard-link attempt is
    /// made instead of a full copy.
    pub use_links_threshold: u64,
    /// Whether a server-local offloaded copy (ODX) is attempted when a
    /// hard-link attempt fails.
    pub odx_enabled: bool,
    /// Minimum source size, in bytes, above which delta compression is
    /// considered.
    pub delta_compression_threshold: u64,
    /// Whether the server may ask the client for a content hash to confirm
    /// semantic equality before falling back to a full copy.
    pub hash_mode: bool,
    /// Admission ceiling for concurrently in-flight `ReadFile` transfers.
    pub max_concurrent_downloads: usize,
    /// `FileDatabase` history ceiling; entries beyond this are evicted
    /// oldest-first.
    pub history_size: usize,
    /// Whether new sessions must complete the security-file handshake.
    pub use_security_file: bool,
    /// Local directory every session's `net_directory` is resolved under.
    /// The real relaycopy resolves a UNC share name to its local path or,
    /// failing that, treats the session as an external proxy; this
    /// simplified resolution always joins onto one fixed local root (the
    /// proxy/external mode is out of scope here, see `DESIGN.md`).
    pub root: PathBuf,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            use_links_threshold: 0,
            odx_enabled: false,
            delta_compression_threshold: u64::MAX,
            hash_mode: false,
            max_concurrent_downloads: 8,
            history_size: DEFAULT_HISTORY_SIZE,
            use_security_file: false,
            root: PathBuf::from("."),
        }
    }
}
