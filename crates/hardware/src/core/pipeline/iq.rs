//! Issue queue.
//!
//! Holds dispatched instructions until their operands are ready and a functional
//! unit is free. Entries are kept in sequence order so that selection is
//! oldest-first across all threads.

use std::collections::BTreeSet;

/// Instruction window between dispatch and issue.
#[derive(Clone, Debug)]
pub struct IssueQueue {
    entries: BTreeSet<(u64, usize)>,
    capacity: usize,
}

impl IssueQueue {
    /// Creates an empty queue with `capacity` slots.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: BTreeSet::new(),
            capacity,
        }
    }

    /// Returns the number of waiting instructions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if no slot is free.
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Returns the number of free slots.
    pub fn free_slots(&self) -> usize {
        self.capacity.saturating_sub(self.entries.len())
    }

    /// Inserts an instruction. Returns false if the queue is full.
    pub fn insert(&mut self, seq: u64, thread: usize) -> bool {
        if self.is_full() {
            return false;
        }
        self.entries.insert((seq, thread))
    }

    /// Removes an instruction that issued.
    pub fn remove(&mut self, seq: u64, thread: usize) -> bool {
        self.entries.remove(&(seq, thread))
    }

    /// Sequence numbers, oldest first.
    pub fn oldest_first(&self) -> Vec<u64> {
        self.entries.iter().map(|&(seq, _)| seq).collect()
    }

    /// Removes every entry of `thread` younger than `seq`. Returns the number removed.
    pub fn flush_after(&mut self, thread: usize, seq: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|&(s, t)| t != thread || s <= seq);
        before - self.entries.len()
    }
}
