//! First-In, First-Out (FIFO) Replacement Policy.
//!
//! This policy evicts the oldest resident line in a set, regardless of how recently
//! it was accessed. Hits leave the state untouched; only fills restamp a way.
//!
//! # Performance
//!
//! - **Time Complexity:**
//!   - `update()`: O(1)
//!   - `get_victim()`: O(W)
//! - **Best Case:** Streaming accesses where all lines have equal importance
//! - **Worst Case:** Workloads with strong temporal locality (may evict frequently-used lines)

use super::{ReplacementPolicy, oldest};
use crate::common::units::Tick;

/// FIFO Policy state.
pub struct FifoPolicy {
    /// Fill tick per `(set, way)`, stored set-major.
    filled_at: Vec<Tick>,
    ways: usize,
}

impl FifoPolicy {
    /// Creates a new FIFO policy instance.
    ///
    /// # Arguments
    ///
    /// * `sets` - The number of sets in the cache.
    /// * `ways` - The associativity (number of ways) of the cache.
    pub fn new(sets: usize, ways: usize) -> Self {
        Self {
            filled_at: vec![0; sets * ways],
            ways,
        }
    }
}

impl ReplacementPolicy for FifoPolicy {
    fn update(&mut self, _set: usize, _way: usize, _tick: Tick) {}

    fn fill(&mut self, set: usize, way: usize, tick: Tick) {
        self.filled_at[set * self.ways + way] = tick;
    }

    fn get_victim(&self, set: usize) -> usize {
        let base = set * self.ways;
        oldest(&self.filled_at[base..base + self.ways])
    }
}
