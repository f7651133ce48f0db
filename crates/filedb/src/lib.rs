#![deny(missing_docs)]

//! The content-addressed `FileDatabase` (spec §4.3): a `by_key` table owning
//! one record per `FileKey`, a `by_hash` index for link/delta reuse, and a
//! history list in insertion order used to evict the oldest entries once the
//! table grows past a configured ceiling.
//!
//! # Design
//!
//! Records live in a slab (`Vec<Option<Slot>>` plus a free list) so that
//! `history` can be an intrusive doubly linked list of slab indices: moving
//! an existing key to the back of history on re-insertion, and evicting from
//! the front during [`FileDatabase::garbage_collect`], are both O(1).
//!
//! `by_hash` and `by_name` are *non-owning* indices: they map onto the same
//! slab index as `by_key`, and are only pruned by identity check (is the
//! index they hold still the one `by_key` considers current?), never by
//! value equality. A hash collision across two different files never causes
//! one file's eviction to silently drop the other's index entry.
//!
//! # Invariants
//!
//! - [`core::Hash::ZERO`] is never inserted into `by_hash`: primed, unhashed
//!   entries cannot be chosen by a hash-match lookup.
//! - `garbage_collect(max)` always leaves exactly `min(max, len)` entries,
//!   evicting the oldest (front of `history`) first.
//!
//! # See also
//!
//! [`persist`] for the on-disk bincode encoding.

pub mod persist;

use std::collections::hash_map::Entry as MapEntry;

use core::{CaseInsensitiveString, FileKey, Hash};
use rustc_hash::FxHashMap;

struct Slot {
    key: FileKey,
    full_path: String,
    hash: Hash,
    prev: Option<usize>,
    next: Option<usize>,
}

/// A single entry as observed by a caller: the destination path last
/// recorded for this key, and the content hash known for it (possibly
/// [`core::Hash::ZERO`] if the entry was primed without hashing).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileRecord {
    /// Destination-relative path recorded for this key.
    pub full_path: String,
    /// Content digest, or [`core::Hash::ZERO`] if never computed.
    pub hash: Hash,
}

/// The `(by_key, by_hash, history)` triangle described in spec §4.3 and §9.
#[derive(Default)]
pub struct FileDatabase {
    slots: Vec<Option<Slot>>,
    free: Vec<usize>,
    by_key: FxHashMap<FileKey, usize>,
    by_hash: FxHashMap<Hash, usize>,
    by_name: FxHashMap<CaseInsensitiveString, usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
}

impl FileDatabase {
    /// Creates an empty database.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the database holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn detach(&mut self, idx: usize) {
        let (prev, next) = {
            let slot = self.slots[idx].as_ref().expect("detach of live slot");
            (slot.prev, slot.next)
        };
        match prev {
            Some(p) => self.slots[p].as_mut().unwrap().next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.slots[n].as_mut().unwrap().prev = prev,
            None => self.tail = prev,
        }
    }

    fn attach_at_tail(&mut self, idx: usize) {
        let slot = self.slots[idx].as_mut().expect("attach of live slot");
        slot.prev = self.tail;
        slot.next = None;
        match self.tail {
            Some(t) => self.slots[t].as_mut().unwrap().next = Some(idx),
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
    }

    /// Inserts or updates the record for `key`, touching it to the most
    /// recent end of history. If `hash` [`core::Hash::is_valid`], the
    /// database's `by_hash` index is updated to point at this record
    /// (overwriting any previous holder of the same hash: the newest record
    /// with a given hash always wins a hash lookup).
    pub fn insert(&mut self, key: FileKey, full_path: impl Into<String>, hash: Hash) {
        let full_path = full_path.into();
        let idx = match self.by_key.get(&key).copied() {
            Some(idx) => {
                self.detach(idx);
                let slot = self.slots[idx].as_mut().expect("existing slot is live");
                slot.full_path = full_path;
                slot.hash = hash;
                idx
            }
            None => {
                let idx = match self.free.pop() {
                    Some(idx) => {
                        self.slots[idx] = Some(Slot {
                            key: key.clone(),
                            full_path,
                            hash,
                            prev: None,
                            next: None,
                        });
                        idx
                    }
                    None => {
                        self.slots.push(Some(Slot {
                            key: key.clone(),
                            full_path,
                            hash,
                            prev: None,
                            next: None,
                        }));
                        self.slots.len() - 1
                    }
                };
                self.by_key.insert(key.clone(), idx);
                self.len += 1;
                idx
            }
        };
        self.attach_at_tail(idx);
        self.by_name.insert(key.name.clone(), idx);
        if hash.is_valid() {
            self.by_hash.insert(hash, idx);
        }
    }

    /// Looks up a record by its exact `(name, mtime, size)` key.
    #[must_use]
    pub fn get_by_key(&self, key: &FileKey) -> Option<FileRecord> {
        let idx = *self.by_key.get(key)?;
        self.slots[idx].as_ref().map(|s| FileRecord {
            full_path: s.full_path.clone(),
            hash: s.hash,
        })
    }

    /// Looks up a record by content hash. Always returns `None` for
    /// [`core::Hash::ZERO`], matching the invariant that it is never a real
    /// digest.
    #[must_use]
    pub fn get_by_hash(&self, hash: Hash) -> Option<FileRecord> {
        if !hash.is_valid() {
            return None;
        }
        let idx = *self.by_hash.get(&hash)?;
        self.slots[idx].as_ref().map(|s| FileRecord {
            full_path: s.full_path.clone(),
            hash: s.hash,
        })
    }

    /// Finds the newest record whose name matches `key.name`, for use as a
    /// delta-compression reference when no exact `(name, mtime, size)` match
    /// exists (spec §4.6). Returns `None` if the match is the same key
    /// (delta against oneself is never useful) or no record shares the
    /// name.
    #[must_use]
    pub fn find_delta_candidate(&self, key: &FileKey) -> Option<FileRecord> {
        let idx = *self.by_name.get(&key.name)?;
        let slot = self.slots[idx].as_ref()?;
        if slot.key == *key {
            return None;
        }
        Some(FileRecord {
            full_path: slot.full_path.clone(),
            hash: slot.hash,
        })
    }

    /// Evicts the oldest entries until at most `max` remain. `by_key` rows
    /// for evicted keys are always removed; `by_hash` and `by_name` rows are
    /// removed only if they still point at the evicted slot (identity
    /// check), since a newer record may have since claimed the same hash or
    /// name.
    pub fn garbage_collect(&mut self, max: usize) {
        while self.len > max {
            let idx = self.head.expect("len > 0 implies a head");
            self.detach(idx);
            let slot = self.slots[idx].take().expect("head slot is live");
            self.len -= 1;
            self.free.push(idx);

            if let MapEntry::Occupied(e) = self.by_key.entry(slot.key.clone()) {
                if *e.get() == idx {
                    e.remove();
                }
            }
            if let MapEntry::Occupied(e) = self.by_hash.entry(slot.hash) {
                if *e.get() == idx {
                    e.remove();
                }
            }
            if let MapEntry::Occupied(e) = self.by_name.entry(slot.key.name.clone()) {
                if *e.get() == idx {
                    e.remove();
                }
            }
        }
    }

    /// Iterates all live records in history order (oldest first), yielding
    /// `(key, full_path, hash)` triples. Used by [`persist::save`].
    pub fn iter_history(&self) -> impl Iterator<Item = (&FileKey, &str, Hash)> {
        let mut cursor = self.head;
        std::iter::from_fn(move || {
            let idx = cursor?;
            let slot = self.slots[idx].as_ref().expect("history cursor on live slot");
            cursor = slot.next;
            Some((&slot.key, slot.full_path.as_str(), slot.hash))
        })
    }
}
