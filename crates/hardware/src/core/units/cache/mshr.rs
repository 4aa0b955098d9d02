//! Miss Status Holding Registers.
//!
//! An MSHR tracks one outstanding block miss. Later misses to the same block attach
//! to it as additional targets instead of generating a second request downstream.
//! The table enforces both capacity limits: at most `capacity` live entries, and at
//! most `targets_per_entry` targets per entry.

use crate::common::units::Tick;

/// Outcome of presenting a miss to the MSHR table.
#[derive(Debug, PartialEq, Eq)]
pub enum MshrOutcome<T> {
    /// A fresh entry was allocated; the caller must forward the block downstream.
    Allocated,
    /// The target joined an existing entry for the same block.
    Coalesced,
    /// No room: either every entry is live or the block's entry is out of targets.
    /// The target is handed back for retry.
    Full(T),
}

/// One in-flight block miss.
#[derive(Debug)]
pub struct Mshr<T> {
    /// Block-aligned address.
    pub block: u64,
    /// Tick the entry was allocated.
    pub allocated_at: Tick,
    /// Requests waiting on the block, oldest first.
    pub targets: Vec<T>,
}

/// Table of MSHRs for one cache level.
#[derive(Debug)]
pub struct MshrTable<T> {
    entries: Vec<Mshr<T>>,
    capacity: usize,
    targets_per_entry: usize,
}

impl<T> MshrTable<T> {
    /// Creates an empty table.
    pub fn new(capacity: usize, targets_per_entry: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
            targets_per_entry,
        }
    }

    /// Attaches `target` to the entry for `block`, allocating one if needed.
    pub fn enqueue(&mut self, block: u64, target: T, now: Tick) -> MshrOutcome<T> {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.block == block) {
            if entry.targets.len() >= self.targets_per_entry {
                return MshrOutcome::Full(target);
            }
            entry.targets.push(target);
            return MshrOutcome::Coalesced;
        }
        if self.entries.len() >= self.capacity {
            return MshrOutcome::Full(target);
        }
        self.entries.push(Mshr {
            block,
            allocated_at: now,
            targets: vec![target],
        });
        MshrOutcome::Allocated
    }

    /// Frees the entry for `block` and returns its targets in arrival order.
    pub fn release(&mut self, block: u64) -> Vec<T> {
        self.entries
            .iter()
            .position(|e| e.block == block)
            .map(|idx| self.entries.remove(idx).targets)
            .unwrap_or_default()
    }

    /// Returns true if a miss to `block` is outstanding.
    pub fn contains(&self, block: u64) -> bool {
        self.entries.iter().any(|e| e.block == block)
    }

    /// Number of live entries.
    pub fn outstanding(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no new block miss can be accepted.
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Configured entry count.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Configured targets per entry.
    pub fn targets_per_entry(&self) -> usize {
        self.targets_per_entry
    }

    /// Live entries, oldest allocation first.
    pub fn iter(&self) -> impl Iterator<Item = &Mshr<T>> {
        self.entries.iter()
    }
}
