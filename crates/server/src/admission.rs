//! `ReadFile` admission control (spec §4.4).
//!
//! Each connection joins `queues[connection_index]` on `Environment`. A
//! `ReadFile` is admitted only if fewer than `max_concurrent_downloads`
//! connections across *all lower-indexed* queues are currently queued, and
//! within its own queue it ranks among the oldest admitted slots. Both
//! counts are plain queue lengths under one mutex, per spec §5's "all
//! inspections copy just length counters".

use std::sync::Mutex;

/// Bounded per-priority-level admission control for `ReadFile` requests.
pub struct PriorityQueues {
    max_concurrent_downloads: usize,
    queues: Mutex<Vec<Vec<u64>>>,
}

impl PriorityQueues {
    /// Creates queues with `levels` priority buckets (spec: connection
    /// index selects the bucket) and the given download ceiling.
    #[must_use]
    pub fn new(levels: usize, max_concurrent_downloads: usize) -> Self {
        Self {
            max_concurrent_downloads,
            queues: Mutex::new(vec![Vec::new(); levels.max(1)]),
        }
    }

    /// Registers `connection_id` in `queues[connection_index]`.
    pub fn join(&self, connection_index: usize, connection_id: u64) {
        let mut queues = self.queues.lock().unwrap();
        if connection_index >= queues.len() {
            queues.resize(connection_index + 1, Vec::new());
        }
        queues[connection_index].push(connection_id);
    }

    /// Removes `connection_id` from `queues[connection_index]`.
    pub fn leave(&self, connection_index: usize, connection_id: u64) {
        let mut queues = self.queues.lock().unwrap();
        if let Some(queue) = queues.get_mut(connection_index) {
            queue.retain(|&id| id != connection_id);
        }
    }

    /// Whether `connection_id` may proceed with a `ReadFile` right now.
    #[must_use]
    pub fn admit(&self, connection_index: usize, connection_id: u64) -> bool {
        let queues = self.queues.lock().unwrap();
        let before: usize = queues[..connection_index.min(queues.len())]
            .iter()
            .map(Vec::len)
            .sum();
        if before >= self.max_concurrent_downloads {
            return false;
        }
        let Some(queue) = queues.get(connection_index) else {
            return false;
        };
        let Some(rank) = queue.iter().position(|&id| id == connection_id) else {
            return false;
        };
        rank < self.max_concurrent_downloads - before
    }
}
