//! Crossbar interconnect.
//!
//! Crossbars connect cache levels: each CPU has an L2 crossbar between its L1s and
//! its L2, and one system crossbar joins every L2 to the memory controller. A
//! crossbar is pass-through except under contention. It provides:
//! 1. **Arbitration:** The k-th request granted in a tick (0-based) waits
//!    `k × latency` cycles; an uncontended request passes with no delay.
//! 2. **Ordering:** Requests reach the crossbar in ascending requester id within a
//!    tick because forward events carry `priority::MEM_FORWARD + requester id`.

use crate::common::units::Tick;

/// Counters for one crossbar.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct XbarStats {
    /// Requests passed through.
    pub grants: u64,
    /// Requests that had to wait behind another in the same tick.
    pub contended: u64,
    /// Total arbitration delay in cycles.
    pub wait_cycles: u64,
}

/// A crossbar with fixed per-contender arbitration delay.
#[derive(Clone, Debug)]
pub struct Crossbar {
    name: String,
    latency: u64,
    tick: Option<Tick>,
    granted_this_tick: u64,
    /// Grant and contention counters.
    pub stats: XbarStats,
}

impl Crossbar {
    /// Creates a crossbar whose arbitration delay is `latency` cycles per earlier
    /// same-tick grant.
    pub fn new(name: impl Into<String>, latency: u64) -> Self {
        Self {
            name: name.into(),
            latency,
            tick: None,
            granted_this_tick: 0,
            stats: XbarStats::default(),
        }
    }

    /// Crossbar name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Grants passage to one request arriving at `now` and returns its delay in cycles.
    pub fn grant(&mut self, now: Tick) -> u64 {
        if self.tick != Some(now) {
            self.tick = Some(now);
            self.granted_this_tick = 0;
        }
        let wait = self.granted_this_tick * self.latency;
        self.granted_this_tick += 1;
        self.stats.grants += 1;
        if wait > 0 {
            self.stats.contended += 1;
            self.stats.wait_cycles += wait;
        }
        wait
    }
}
