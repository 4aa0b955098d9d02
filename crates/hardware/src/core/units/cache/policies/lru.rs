//! Least Recently Used (LRU) Replacement Policy.
//!
//! This policy evicts the cache line that has not been accessed for the longest time.
//! Each way carries the value of an access counter at its most recent access (hit or
//! fill), so two accesses in the same tick still have a defined order. The victim is
//! the way with the oldest stamp; a never-touched set resolves to the lowest way.
//!
//! # Performance
//!
//! - **Time Complexity:**
//!   - `update()`: O(1)
//!   - `get_victim()`: O(W) where W is the number of ways (associativity)
//! - **Space Complexity:** O(S × W) where S is the number of sets

use super::{ReplacementPolicy, oldest};
use crate::common::units::Tick;

/// LRU Policy state.
pub struct LruPolicy {
    /// Access counter value of the last access per `(set, way)`, stored set-major.
    last_access: Vec<u64>,
    ways: usize,
    accesses: u64,
}

impl LruPolicy {
    /// Creates a new LRU policy instance.
    ///
    /// # Arguments
    ///
    /// * `sets` - The number of sets in the cache.
    /// * `ways` - The associativity (number of ways) of the cache.
    pub fn new(sets: usize, ways: usize) -> Self {
        Self {
            last_access: vec![0; sets * ways],
            ways,
            accesses: 0,
        }
    }

    fn set_slice(&self, set: usize) -> &[u64] {
        let base = set * self.ways;
        &self.last_access[base..base + self.ways]
    }
}

impl ReplacementPolicy for LruPolicy {
    fn update(&mut self, set: usize, way: usize, _tick: Tick) {
        self.accesses += 1;
        self.last_access[set * self.ways + way] = self.accesses;
    }

    fn fill(&mut self, set: usize, way: usize, tick: Tick) {
        self.update(set, way, tick);
    }

    fn get_victim(&self, set: usize) -> usize {
        oldest(self.set_slice(set))
    }
}
