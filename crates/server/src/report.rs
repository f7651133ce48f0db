//! The `RequestReport` human-readable status string (spec §4.2).

use std::sync::atomic::{AtomicU64, Ordering};

/// Session-wide counters surfaced by `RequestReport`, incremented as
/// commands are handled across all connections.
#[derive(Default)]
pub struct ReportCounters {
    connections_served: AtomicU64,
    files_written: AtomicU64,
    files_read: AtomicU64,
    files_linked: AtomicU64,
    compression_level_sum: AtomicU64,
}

impl ReportCounters {
    /// Creates a zeroed counter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one accepted connection.
    pub fn record_connection(&self) {
        self.connections_served.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one completed `WriteFile`.
    pub fn record_write(&self) {
        self.files_written.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one completed `ReadFile`.
    pub fn record_read(&self) {
        self.files_read.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one `WriteFile` satisfied by a hard link.
    pub fn record_link(&self) {
        self.files_linked.fetch_add(1, Ordering::Relaxed);
    }

    /// Folds one transfer's compression level into `compressionLevelSum`
    /// (spec §4.2 `Done` footer).
    pub fn record_compression_level(&self, level: u8) {
        self.compression_level_sum.fetch_add(u64::from(level), Ordering::Relaxed);
    }

    /// The session-wide sum of compression levels recorded so far, clamped
    /// to `u32` for the `Done` footer's wire width.
    #[must_use]
    pub fn compression_level_sum(&self) -> u32 {
        u32::try_from(self.compression_level_sum.load(Ordering::Relaxed)).unwrap_or(u32::MAX)
    }

    /// Renders the counters as the `RequestReport` response body.
    #[must_use]
    pub fn report(&self, database_entries: usize) -> String {
        format!(
            "connections={} written={} read={} linked={} database_entries={}",
            self.connections_served.load(Ordering::Relaxed),
            self.files_written.load(Ordering::Relaxed),
            self.files_read.load(Ordering::Relaxed),
            self.files_linked.load(Ordering::Relaxed),
            database_entries,
        )
    }
}
