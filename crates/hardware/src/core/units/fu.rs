//! Functional unit pool.
//!
//! Each CPU owns a fixed set of functional units grouped by kind. A unit is a
//! single-owner slot: issue acquires it, and it becomes free again one cycle later
//! if it is pipelined or after its full latency otherwise. When no unit of the
//! required kind is free the instruction waits in the issue queue.

use crate::common::units::Tick;
use crate::config::{FuConfig, FuPoolConfig};
use crate::isa::inst::OpClass;

/// Kinds of functional unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FuKind {
    /// Integer ALU (also resolves branches).
    IntAlu,
    /// Integer multiplier.
    IntMul,
    /// Integer divider.
    IntDiv,
    /// Floating-point adder.
    FpAlu,
    /// Floating-point multiplier.
    FpMul,
    /// Load/store address port.
    MemPort,
}

impl FuKind {
    /// Every kind, in pool order.
    pub const ALL: [Self; 6] = [
        Self::IntAlu,
        Self::IntMul,
        Self::IntDiv,
        Self::FpAlu,
        Self::FpMul,
        Self::MemPort,
    ];

    /// Kind needed by an op class; `None` for ops that occupy no unit.
    pub fn for_class(class: OpClass) -> Option<Self> {
        match class {
            OpClass::IntAlu | OpClass::Branch => Some(Self::IntAlu),
            OpClass::IntMul => Some(Self::IntMul),
            OpClass::IntDiv => Some(Self::IntDiv),
            OpClass::FpAlu => Some(Self::FpAlu),
            OpClass::FpMul => Some(Self::FpMul),
            OpClass::MemRead | OpClass::MemWrite => Some(Self::MemPort),
            OpClass::NoOp => None,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Clone, Debug)]
struct FuGroup {
    /// Tick at which each unit can accept a new operation.
    free_at: Vec<Tick>,
    latency: u64,
    pipelined: bool,
}

impl FuGroup {
    fn new(cfg: &FuConfig) -> Self {
        Self {
            free_at: vec![0; cfg.count],
            latency: cfg.latency,
            pipelined: cfg.pipelined,
        }
    }
}

/// All functional units of one CPU.
#[derive(Clone, Debug)]
pub struct FuPool {
    groups: Vec<FuGroup>,
    period: Tick,
    /// Issue attempts that found every unit of the kind busy.
    pub busy_rejections: u64,
}

impl FuPool {
    /// Builds the pool from configuration. `period` is the CPU clock period in ticks.
    pub fn new(cfg: &FuPoolConfig, period: Tick) -> Self {
        let groups = FuKind::ALL
            .iter()
            .map(|kind| {
                FuGroup::new(match kind {
                    FuKind::IntAlu => &cfg.int_alu,
                    FuKind::IntMul => &cfg.int_mul,
                    FuKind::IntDiv => &cfg.int_div,
                    FuKind::FpAlu => &cfg.fp_alu,
                    FuKind::FpMul => &cfg.fp_mul,
                    FuKind::MemPort => &cfg.mem_port,
                })
            })
            .collect();
        Self {
            groups,
            period,
            busy_rejections: 0,
        }
    }

    /// Latency in cycles of `kind`.
    pub fn latency(&self, kind: FuKind) -> u64 {
        self.groups[kind.index()].latency
    }

    /// Returns true if a unit of `kind` can accept an operation at `now`.
    pub fn available(&self, kind: FuKind, now: Tick) -> bool {
        self.groups[kind.index()].free_at.iter().any(|&t| t <= now)
    }

    /// Claims the lowest-numbered free unit of `kind` and returns the operation
    /// latency in cycles, or `None` (counted as a busy rejection) if all are busy.
    pub fn acquire(&mut self, kind: FuKind, now: Tick) -> Option<u64> {
        let period = self.period;
        let group = &mut self.groups[kind.index()];
        let Some(slot) = group.free_at.iter_mut().find(|t| **t <= now) else {
            self.busy_rejections += 1;
            return None;
        };
        let busy_cycles = if group.pipelined { 1 } else { group.latency };
        *slot = now + busy_cycles * period;
        Some(group.latency)
    }
}
