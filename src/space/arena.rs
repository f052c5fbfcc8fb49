//! Tuple arena
//!
//! Owns every stored row of a space. Indexes refer to rows by [`TupleId`], so
//! replacing a row never leaves a stale alias behind in some bucket.

use crate::tuple::Tuple;

/// Stable handle to a row inside one space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TupleId(usize);

struct Slot {
    /// Monotonic stamp, used to recover row insertion order
    seq: u64,
    tuple: Tuple,
}

/// Slot storage with free-list reuse
#[derive(Default)]
pub struct TupleArena {
    slots: Vec<Option<Slot>>,
    free: Vec<usize>,
    next_seq: u64,
    live: usize,
}

impl TupleArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tuple: Tuple) -> TupleId {
        let slot = Slot {
            seq: self.next_seq,
            tuple,
        };
        self.next_seq += 1;
        self.live += 1;

        match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(slot);
                TupleId(index)
            }
            None => {
                self.slots.push(Some(slot));
                TupleId(self.slots.len() - 1)
            }
        }
    }

    pub fn get(&self, id: TupleId) -> Option<&Tuple> {
        self.slots.get(id.0)?.as_ref().map(|s| &s.tuple)
    }

    /// Remove a row, freeing its slot for reuse
    pub fn take(&mut self, id: TupleId) -> Option<Tuple> {
        let slot = self.slots.get_mut(id.0)?.take()?;
        self.free.push(id.0);
        self.live -= 1;
        Some(slot.tuple)
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Live rows, oldest insertion first
    pub fn iter_in_insertion_order(&self) -> impl Iterator<Item = (TupleId, &Tuple)> {
        let mut rows: Vec<(u64, TupleId, &Tuple)> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|s| (s.seq, TupleId(i), &s.tuple)))
            .collect();
        rows.sort_by_key(|(seq, _, _)| *seq);
        rows.into_iter().map(|(_, id, tuple)| (id, tuple))
    }
}
