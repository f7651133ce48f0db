//! The shared work list and its `work_done` suspension signal
//! (spec §4.5, §5: "workers poll the queue; when empty they sleep ... on
//! the work_done signal").
//!
//! Termination uses a pending-count, not just "queue empty": an item popped
//! for processing may itself enqueue more work (a directory produces more
//! directories and files) before the worker calls [`WorkQueue::finish`] on
//! it, so "empty" alone would let a second worker declare victory while a
//! first worker is mid-expansion. The queue only closes itself once
//! `pending` — items queued plus items checked out but not yet finished —
//! reaches zero.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// Maximum time a worker sleeps waiting for new work before re-polling
/// (spec §4.5).
pub const MAX_IDLE_WAIT: Duration = Duration::from_secs(5);

struct Inner<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// A `Mutex<VecDeque<T>>` plus a `Condvar` workers block on between polls.
pub struct WorkQueue<T> {
    inner: Mutex<Inner<T>>,
    work_done: Condvar,
    pending: AtomicUsize,
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> WorkQueue<T> {
    /// Creates an empty, open queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                items: VecDeque::new(),
                closed: false,
            }),
            work_done: Condvar::new(),
            pending: AtomicUsize::new(0),
        }
    }

    /// Enqueues `item` at the back, counts it as pending, and wakes one
    /// waiting worker.
    pub fn push_back(&self, item: T) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.inner.lock().unwrap();
        inner.items.push_back(item);
        self.work_done.notify_one();
    }

    /// Re-queues `item` at the front without counting it as newly pending,
    /// used when a `ServerBusy` response asks the worker to retry this
    /// entry before any other pending work (spec §4.5, §7): the item was
    /// already pending when it was first popped.
    pub fn push_front(&self, item: T) {
        let mut inner = self.inner.lock().unwrap();
        inner.items.push_front(item);
        self.work_done.notify_one();
    }

    /// Pops the next item, or `None` if the queue is empty and either
    /// closed or momentarily idle (the caller should re-poll on `None`
    /// unless [`WorkQueue::is_closed`] is also true).
    pub fn pop(&self) -> Option<T> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if let Some(item) = inner.items.pop_front() {
                return Some(item);
            }
            if inner.closed {
                return None;
            }
            let (guard, timeout) = self.work_done.wait_timeout(inner, MAX_IDLE_WAIT).unwrap();
            inner = guard;
            if timeout.timed_out() && inner.items.is_empty() && !inner.closed {
                return None;
            }
        }
    }

    /// Marks one previously popped item as fully processed. If this drops
    /// `pending` to zero, the queue closes itself: no more work can ever
    /// arrive, since every push increments `pending` before the pushed item
    /// becomes visible to a popper.
    pub fn finish(&self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.close();
        }
    }

    /// Seeds the queue with its initial work before any worker starts
    /// polling, equivalent to a `push_back` that doesn't need a wakeup.
    pub fn seed(&self, item: T) {
        self.push_back(item);
    }

    /// Marks the queue closed unconditionally, waking every blocked pop
    /// with `None`. Used to force early shutdown (e.g. a fatal error)
    /// rather than waiting for `pending` to reach zero naturally.
    pub fn close(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.closed = true;
        self.work_done.notify_all();
    }

    /// Whether the queue has been closed (manually or via `finish`
    /// reaching zero pending).
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.lock().unwrap().closed
    }

    /// Number of items currently queued (not counting items checked out
    /// for processing).
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().items.len()
    }

    /// Whether the queue currently holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
