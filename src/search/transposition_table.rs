// Copyright 2026 the palisade authors.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.
use hashbrown::HashMap;
use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::moves::Move;

/// How a stored score bounds the true value of its position: the score is an
/// upper bound (search failed low), a lower bound (failed high), or exact.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Bound {
    Upper,
    Lower,
    Exact,
}

#[derive(Copy, Clone, Debug)]
pub struct TableEntry {
    pub depth: u32,
    pub score: i32,
    pub bound: Bound,
    pub best_move: Option<Move>,
}

#[derive(Default)]
pub struct TableStats {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl TableStats {
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
}

const NIL: usize = usize::MAX;

struct Slot {
    hash: u64,
    entry: TableEntry,
    prev: usize,
    next: usize,
}

/// The intrusive doubly-linked list over preallocated slots, with the map
/// from hash to slot index. Guarded as one unit by the table's mutex.
struct LruState {
    slots: Vec<Slot>,
    map: HashMap<u64, usize>,
    head: usize,
    tail: usize,
}

impl LruState {
    fn detach(&mut self, idx: usize) {
        let (prev, next) = (self.slots[idx].prev, self.slots[idx].next);
        match prev {
            NIL => self.head = next,
            _ => self.slots[prev].next = next,
        }
        match next {
            NIL => self.tail = prev,
            _ => self.slots[next].prev = prev,
        }
    }

    fn attach_front(&mut self, idx: usize) {
        self.slots[idx].prev = NIL;
        self.slots[idx].next = self.head;
        match self.head {
            NIL => self.tail = idx,
            old => self.slots[old].prev = idx,
        }
        self.head = idx;
    }
}

/// A fixed-capacity transposition cache: an LRU list of search results keyed
/// by the position's 64-bit Zobrist hash.
///
/// Positions are too large to store, so only the hash is kept; two positions
/// that collide on the hash will share an entry and a probe may therefore
/// return a result computed for a different position. The bound semantics
/// keep such a hit from corrupting anything beyond its own subtree's window,
/// but consumers must treat reported scores as approximate.
///
/// All storage is allocated up front from the byte budget, and every
/// operation takes one lock over the list and the map together, so the timer
/// thread and a searching thread can share the table freely.
pub struct TranspositionTable {
    state: Mutex<LruState>,
    capacity: usize,
    stats: TableStats,
}

impl TranspositionTable {
    /// A table holding at most `entries` results.
    pub fn with_capacity(entries: usize) -> TranspositionTable {
        let capacity = entries.max(1);
        TranspositionTable {
            state: Mutex::new(LruState {
                slots: Vec::with_capacity(capacity),
                map: HashMap::with_capacity(capacity),
                head: NIL,
                tail: NIL,
            }),
            capacity,
            stats: TableStats::default(),
        }
    }

    /// A table sized to a memory budget in megabytes.
    pub fn with_budget_mb(megabytes: usize) -> TranspositionTable {
        TranspositionTable::with_capacity((megabytes << 20) / mem::size_of::<Slot>())
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.state
            .lock()
            .expect("transposition table lock poisoned")
            .map
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> &TableStats {
        &self.stats
    }

    /// Looks up the entry for a hash, promoting it to most recently used.
    pub fn probe(&self, hash: u64) -> Option<TableEntry> {
        let mut state = self
            .state
            .lock()
            .expect("transposition table lock poisoned");
        match state.map.get(&hash).copied() {
            Some(idx) => {
                state.detach(idx);
                state.attach_front(idx);
                self.stats.hits.fetch_add(1, Ordering::Relaxed);
                Some(state.slots[idx].entry)
            }
            None => {
                self.stats.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Inserts or overwrites the entry for a hash, promoting it to most
    /// recently used. When the table is full the least recently used entry
    /// is evicted to make room.
    pub fn store(&self, hash: u64, entry: TableEntry) {
        let mut state = self
            .state
            .lock()
            .expect("transposition table lock poisoned");

        if let Some(idx) = state.map.get(&hash).copied() {
            state.slots[idx].entry = entry;
            state.detach(idx);
            state.attach_front(idx);
            return;
        }

        let idx = if state.slots.len() < self.capacity {
            state.slots.push(Slot {
                hash,
                entry,
                prev: NIL,
                next: NIL,
            });
            state.slots.len() - 1
        } else {
            // Reuse the least recently used slot.
            let idx = self.evict_tail(&mut state);
            state.slots[idx].hash = hash;
            state.slots[idx].entry = entry;
            idx
        };
        state.map.insert(hash, idx);
        state.attach_front(idx);
    }

    pub fn clear(&self) {
        let mut state = self
            .state
            .lock()
            .expect("transposition table lock poisoned");
        state.slots.clear();
        state.map.clear();
        state.head = NIL;
        state.tail = NIL;
    }

    fn evict_tail(&self, state: &mut LruState) -> usize {
        let idx = state.tail;
        debug_assert_ne!(NIL, idx, "evicting from an empty table");
        let hash = state.slots[idx].hash;
        state.map.remove(&hash);
        state.detach(idx);
        idx
    }
}
