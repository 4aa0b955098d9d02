//! Reorder Buffer (ROB) for in-order commit.
//!
//! The ROB tracks every dispatched instruction of a CPU, shared by all of its
//! hardware threads, in sequence-number order. It provides:
//! 1. **Allocation:** Dispatch appends at the tail while slots remain.
//! 2. **In-order Commit:** Retirement only ever removes the head.
//! 3. **Flush:** Squashes remove a thread's entries younger than a given sequence
//!    number, leaving other threads' entries in place.

use std::collections::VecDeque;

/// A single entry in the Reorder Buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RobEntry {
    /// Sequence number of the instruction.
    pub seq: u64,
    /// Owning hardware thread.
    pub thread: usize,
}

/// Reorder Buffer.
#[derive(Clone, Debug)]
pub struct Rob {
    entries: VecDeque<RobEntry>,
    capacity: usize,
}

impl Rob {
    /// Creates a new ROB with the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Returns the ROB capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of occupied entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the ROB is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns true if the ROB is full.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Returns the number of free slots.
    #[inline]
    pub fn free_slots(&self) -> usize {
        self.capacity.saturating_sub(self.entries.len())
    }

    /// Appends an entry. Returns false if the ROB is full.
    pub fn allocate(&mut self, seq: u64, thread: usize) -> bool {
        if self.is_full() {
            return false;
        }
        debug_assert!(self.entries.back().is_none_or(|e| e.seq < seq));
        self.entries.push_back(RobEntry { seq, thread });
        true
    }

    /// Returns the head entry (oldest), if the ROB is non-empty.
    pub fn peek_head(&self) -> Option<RobEntry> {
        self.entries.front().copied()
    }

    /// Removes the head entry.
    pub fn commit_head(&mut self) -> Option<RobEntry> {
        self.entries.pop_front()
    }

    /// Removes every entry of `thread` with a sequence number greater than `seq`.
    /// Returns the number removed.
    pub fn flush_after(&mut self, thread: usize, seq: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| e.thread != thread || e.seq <= seq);
        before - self.entries.len()
    }

    /// Number of entries owned by `thread`.
    pub fn thread_len(&self, thread: usize) -> usize {
        self.entries.iter().filter(|e| e.thread == thread).count()
    }

    /// Entries from head to tail.
    pub fn iter(&self) -> impl Iterator<Item = &RobEntry> {
        self.entries.iter()
    }
}
