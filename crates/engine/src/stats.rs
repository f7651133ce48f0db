//! Per-thread counters merged into a single totals struct after the worker
//! pool joins (spec §3 "Stats", §4.8 "thread-local stats").

use std::time::Duration;

/// Counters accumulated by one worker thread over the course of a
/// `process()` call; merged via [`Stats::merge`] once all workers join.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    /// Files copied in full (including delta and ODX transfers).
    pub copy_count: u64,
    /// Bytes written for files counted in `copy_count`.
    pub copy_size: u64,
    /// Files left untouched because source and destination already matched.
    pub skip_count: u64,
    /// Bytes of files counted in `skip_count`.
    pub skip_size: u64,
    /// Files satisfied by a hard link instead of a copy.
    pub link_count: u64,
    /// Files satisfied by an Azure/ODX-style server-side copy.
    pub odx_count: u64,
    /// Files transferred as a delta against a prior copy.
    pub delta_count: u64,
    /// Files that exhausted their retry budget and were abandoned.
    pub fail_count: u64,
    /// Total retry attempts made across all files.
    pub retry_count: u64,
    /// Bytes streamed through the hash engine (spec §4.8).
    pub bytes_hashed: u64,
    /// Wall-clock time spent hashing.
    pub hash_time: Duration,
    /// Destination entries deleted by the purge pass (spec §4.7).
    pub purge_count: u64,
}

impl Stats {
    /// Folds `other`'s counters into `self`.
    pub fn merge(&mut self, other: &Stats) {
        self.copy_count += other.copy_count;
        self.copy_size += other.copy_size;
        self.skip_count += other.skip_count;
        self.skip_size += other.skip_size;
        self.link_count += other.link_count;
        self.odx_count += other.odx_count;
        self.delta_count += other.delta_count;
        self.fail_count += other.fail_count;
        self.retry_count += other.retry_count;
        self.bytes_hashed += other.bytes_hashed;
        self.hash_time += other.hash_time;
        self.purge_count += other.purge_count;
    }
}
