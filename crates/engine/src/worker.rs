//! The worker pool (spec §4.5, §5): `thread_count` background threads plus
//! the calling thread all drain the same [`WorkQueue`], each popping a
//! directory or file, expanding or copying it, and finishing it before
//! polling again.

use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use core::fs::FileSystem;
use core::log::LogContext;
use filedb::FileDatabase;

use crate::entry::{CopyDestination, CopySource, WorkItem};
use crate::handled::HandledFiles;
use crate::local_copy;
use crate::peer::PeerConnection;
use crate::queue::WorkQueue;
use crate::retry::with_retry;
use crate::settings::{ClientSettings, UseServer};
use crate::stats::Stats;
use crate::traverse;

/// Everything a worker needs that outlives any single item, shared by every
/// thread in the pool via `Arc`.
pub struct WorkerContext {
    /// Filesystem capability used for both source reads and destination
    /// writes in direct (non-server) mode.
    pub fs: Arc<dyn FileSystem>,
    /// Content-addressed database backing link/delta reuse.
    pub db: Arc<Mutex<FileDatabase>>,
    /// The run's configuration.
    pub settings: Arc<ClientSettings>,
    /// Destination names handled this run, consulted by the purge engine.
    pub handled: Arc<HandledFiles>,
    /// Root destination, for flatten-mode path resolution.
    pub root_destination: CopyDestination,
    /// Secret bound during the security-file handshake; all-zero when
    /// `security_file_mode` is off. Shared across worker connections so the
    /// first connection's freshly proven secret lets later connections skip
    /// straight to the nonzero-secret path instead of re-running the
    /// handshake.
    pub secret_guid: Mutex<protocol::SecretGuid>,
    /// Source of `connection_index` values, one per worker connection
    /// (spec §4.5: "each worker owns its own connection(s)").
    pub next_connection_index: AtomicU32,
}

/// Drains `queue` until it closes, updating `stats` with this thread's
/// share of the work. Used both by spawned worker threads and by the
/// calling thread itself, which participates in the pool rather than
/// blocking on `join` alone (spec §4.5: "the main thread also processes
/// work").
pub fn drain(ctx: &WorkerContext, queue: &WorkQueue<WorkItem>, log_ctx: &LogContext) -> Stats {
    let mut stats = Stats::default();
    let mut peer: Option<PeerConnection> = None;
    loop {
        match queue.pop() {
            Some(item) => {
                if process_item(ctx, queue, log_ctx, &mut stats, &mut peer, item) {
                    queue.finish();
                }
                // A `false` return means the item was re-queued (e.g.
                // `ServerBusy`): it is still pending, so `finish` must not
                // be called for it a second time.
            }
            None if queue.is_closed() => return stats,
            None => continue,
        }
    }
}

fn ensure_peer(ctx: &WorkerContext, peer: &mut Option<PeerConnection>) -> io::Result<&mut PeerConnection> {
    if peer.is_none() {
        let addr = ctx
            .settings
            .server_addr
            .ok_or_else(|| io::Error::other("no server address configured"))?;
        let index = ctx.next_connection_index.fetch_add(1, Ordering::SeqCst);
        let secret_guid = *ctx.secret_guid.lock().unwrap();
        let connection = PeerConnection::connect(
            addr,
            index,
            secret_guid,
            String::new(),
            ctx.settings.delta_compression_threshold,
            ctx.fs.as_ref(),
            &ctx.settings.destination,
        )?;
        if !connection.protocol_matches() && matches!(ctx.settings.use_server, UseServer::Required) {
            return Err(io::Error::other("server protocol version mismatch"));
        }
        *ctx.secret_guid.lock().unwrap() = connection.bound_secret_guid();
        *peer = Some(connection);
    }
    Ok(peer.as_mut().expect("just initialized"))
}

/// Processes one popped item. Returns `true` if the item is now fully
/// accounted for (the caller should call [`WorkQueue::finish`]), or `false`
/// if it was re-queued and remains pending (a `ServerBusy` backoff).
fn process_item(
    ctx: &WorkerContext,
    queue: &WorkQueue<WorkItem>,
    log_ctx: &LogContext,
    stats: &mut Stats,
    peer: &mut Option<PeerConnection>,
    item: WorkItem,
) -> bool {
    match item {
        WorkItem::Dir(dir) => {
            let result = traverse::expand_dir(
                ctx.fs.as_ref(),
                &ctx.settings,
                queue,
                &ctx.handled,
                &ctx.root_destination,
                &dir,
            );
            if let Err(err) = result {
                log_ctx.record_error(&core::error::CoreError::io(format!("{:?}", dir.source), err));
                stats.fail_count += 1;
            }
            true
        }
        WorkItem::File(entry) => match (&entry.source, &entry.destination) {
            (CopySource::Local(_), CopyDestination::Local(_)) => {
                process_local_file(ctx, log_ctx, stats, &entry);
                true
            }
            (CopySource::Local(_), CopyDestination::Server { .. }) => {
                process_write_file(ctx, log_ctx, stats, peer, &entry);
                true
            }
            (CopySource::Server { .. }, CopyDestination::Local(_)) => {
                process_read_file(ctx, queue, log_ctx, stats, peer, entry)
            }
            (CopySource::Server { .. }, CopyDestination::Server { .. }) => {
                // Server-to-server routing has no client-side byte path in
                // this protocol; out of scope.
                true
            }
        },
    }
}

fn process_local_file(ctx: &WorkerContext, log_ctx: &LogContext, stats: &mut Stats, entry: &crate::entry::CopyEntry) {
    let (CopySource::Local(src_path), CopyDestination::Local(dest_path)) = (&entry.source, &entry.destination)
    else {
        unreachable!("guarded by caller")
    };
    let name = &entry.name;
    let result = with_retry(&ctx.settings, log_ctx, stats, || {
        local_copy::copy_local(ctx.fs.as_ref(), &ctx.db, &ctx.settings, name, src_path, dest_path, entry.info, stats)
            .map_err(|err| core::error::CoreError::io(dest_path.to_string_lossy(), err))
    });
    if result.is_err() {
        tracing::warn!(file = %name, "giving up after exhausting retries");
    }
}

fn process_write_file(
    ctx: &WorkerContext,
    log_ctx: &LogContext,
    stats: &mut Stats,
    peer: &mut Option<PeerConnection>,
    entry: &crate::entry::CopyEntry,
) {
    let (CopySource::Local(src_path), CopyDestination::Server { path: dest_path }) = (&entry.source, &entry.destination)
    else {
        unreachable!("guarded by caller")
    };
    let result = with_retry(&ctx.settings, log_ctx, stats, || {
        let conn = ensure_peer(ctx, peer).map_err(|e| core::error::CoreError::Network(e.to_string()))?;
        conn.write_file(ctx.fs.as_ref(), src_path, entry.info, dest_path, ctx.settings.compression_level)
            .map_err(|e| core::error::CoreError::Network(e.to_string()))
    });
    match result {
        Ok(crate::peer::WriteOutcome::Transferred(_)) => {
            stats.copy_count += 1;
            stats.copy_size += entry.info.size;
        }
        Ok(crate::peer::WriteOutcome::Linked) => stats.link_count += 1,
        Ok(crate::peer::WriteOutcome::Odx) => stats.odx_count += 1,
        Ok(crate::peer::WriteOutcome::Skipped) => {
            stats.skip_count += 1;
            stats.skip_size += entry.info.size;
        }
        Err(_) => tracing::warn!(file = %entry.name, "giving up after exhausting retries"),
    }
}

fn process_read_file(
    ctx: &WorkerContext,
    queue: &WorkQueue<WorkItem>,
    log_ctx: &LogContext,
    stats: &mut Stats,
    peer: &mut Option<PeerConnection>,
    entry: crate::entry::CopyEntry,
) -> bool {
    let (CopySource::Server { path: src_path }, CopyDestination::Local(dest_path)) = (&entry.source, &entry.destination)
    else {
        unreachable!("guarded by caller")
    };
    let result = with_retry(&ctx.settings, log_ctx, stats, || {
        let conn = ensure_peer(ctx, peer).map_err(|e| core::error::CoreError::Network(e.to_string()))?;
        conn.read_file(ctx.fs.as_ref(), src_path, entry.info, dest_path, ctx.settings.compression_level)
            .map_err(|e| core::error::CoreError::Network(e.to_string()))
    });
    match result {
        Ok(crate::peer::ReadOutcome::Transferred) => {
            stats.copy_count += 1;
            stats.copy_size += entry.info.size;
            true
        }
        Ok(crate::peer::ReadOutcome::Skipped) => {
            stats.skip_count += 1;
            stats.skip_size += entry.info.size;
            true
        }
        Ok(crate::peer::ReadOutcome::ServerBusy) => {
            // Re-queue at the front and back off briefly rather than
            // spinning (spec §4.5, §7). `push_front` does not bump the
            // pending counter: this item was already counted as pending
            // when first popped, and still is.
            let wait = std::time::Duration::from_millis(ctx.settings.retry_wait_ms.max(1));
            queue.push_front(WorkItem::File(entry));
            thread::sleep(wait);
            false
        }
        Err(_) => {
            tracing::warn!(file = %entry.name, "giving up after exhausting retries");
            true
        }
    }
}

/// Runs `thread_count` background workers plus the calling thread against
/// `queue`, returning the merged [`Stats`] once the queue closes.
pub fn run_pool(ctx: Arc<WorkerContext>, queue: Arc<WorkQueue<WorkItem>>, log_ctx: LogContext) -> Stats {
    let worker_count = ctx.settings.thread_count;
    let handles: Vec<_> = (0..worker_count)
        .map(|_| {
            let ctx = Arc::clone(&ctx);
            let queue = Arc::clone(&queue);
            let log_ctx = log_ctx.clone();
            thread::spawn(move || drain(&ctx, &queue, &log_ctx))
        })
        .collect();

    let mut total = drain(&ctx, &queue, &log_ctx);
    for handle in handles {
        if let Ok(worker_stats) = handle.join() {
            total.merge(&worker_stats);
        }
    }
    total
}
