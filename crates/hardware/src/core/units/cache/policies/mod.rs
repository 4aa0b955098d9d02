//! Cache Replacement Policies.
//!
//! Implements the algorithms used to pick a victim way when a fill lands in a full
//! set. Invalid ways are always filled first (lowest index) by the cache itself; a
//! policy is only consulted once every way of the set holds a valid line.
//!
//! # Policies
//!
//! - `Lru`: Least Recently Used, ties broken by lowest way index.
//! - `Fifo`: First-In, First-Out by fill time, ties broken by lowest way index.

/// First-In, First-Out replacement policy.
pub mod fifo;

/// Least Recently Used replacement policy.
pub mod lru;

pub use fifo::FifoPolicy;
pub use lru::LruPolicy;

use crate::common::units::Tick;

/// Trait for cache replacement policies.
///
/// Defines the interface for updating usage state and selecting victim lines.
/// Policies receive the simulation tick of each access but may order accesses by
/// their own counters; a set with equal stamps evicts its lowest way.
pub trait ReplacementPolicy: Send + Sync {
    /// Records a hit on `way` of `set` at `tick`.
    fn update(&mut self, set: usize, way: usize, tick: Tick);

    /// Records that a new block was installed in `way` of `set` at `tick`.
    fn fill(&mut self, set: usize, way: usize, tick: Tick);

    /// Selects the way to evict from a full set.
    fn get_victim(&self, set: usize) -> usize;
}

/// Index of the smallest stamp in a set; the lowest way wins ties.
fn oldest(stamps: &[Tick]) -> usize {
    stamps
        .iter()
        .enumerate()
        .min_by_key(|&(way, &stamp)| (stamp, way))
        .map_or(0, |(way, _)| way)
}
