//! Register renaming.
//!
//! Every architectural register of every thread maps to a physical register. This
//! module provides:
//! 1. **Rename map:** Per-thread table from architectural to physical register. A
//!    renamed destination takes a fresh physical register and remembers the previous
//!    mapping so that a squash can restore it and a commit can free it.
//! 2. **Physical register file:** Free list plus a ready bit per register. Issue only
//!    reads ready bits; values live in the thread's functional state.
//!
//! Thread `t` starts with architectural register `r` mapped to physical register
//! `t * 32 + r`; the rest of the file is free.

use std::collections::VecDeque;

use crate::common::constants::NUM_ARCH_REGS;
use crate::isa::inst::Reg;

/// Index into the physical register file.
pub type PhysReg = u16;

/// Architectural-to-physical mapping of one thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenameMap {
    table: [PhysReg; NUM_ARCH_REGS],
}

impl RenameMap {
    /// Identity-style mapping for `thread` into its reserved block of registers.
    pub fn new(thread: usize) -> Self {
        let base = (thread * NUM_ARCH_REGS) as PhysReg;
        let mut table = [0; NUM_ARCH_REGS];
        for (r, slot) in table.iter_mut().enumerate() {
            *slot = base + r as PhysReg;
        }
        Self { table }
    }

    /// Current physical register of `reg`.
    #[inline]
    pub fn lookup(&self, reg: Reg) -> PhysReg {
        self.table[reg as usize]
    }

    /// Points `reg` at `phys` and returns the mapping it replaced.
    pub fn remap(&mut self, reg: Reg, phys: PhysReg) -> PhysReg {
        std::mem::replace(&mut self.table[reg as usize], phys)
    }
}

/// Free list and ready bits of the physical register file.
#[derive(Clone, Debug)]
pub struct PhysRegFile {
    ready: Vec<bool>,
    free: VecDeque<PhysReg>,
}

impl PhysRegFile {
    /// Creates `total` registers with the first `threads * 32` reserved for the
    /// initial mappings.
    pub fn new(total: usize, threads: usize) -> Self {
        let reserved = (threads * NUM_ARCH_REGS).min(total);
        Self {
            ready: vec![true; total],
            free: (reserved..total).map(|p| p as PhysReg).collect(),
        }
    }

    /// Total number of physical registers.
    pub fn len(&self) -> usize {
        self.ready.len()
    }

    /// Returns true if the file has no registers.
    pub fn is_empty(&self) -> bool {
        self.ready.is_empty()
    }

    /// Registers currently on the free list.
    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Takes a free register and marks it not ready.
    pub fn allocate(&mut self) -> Option<PhysReg> {
        let p = self.free.pop_front()?;
        self.ready[p as usize] = false;
        Some(p)
    }

    /// Returns a register to the free list.
    pub fn release(&mut self, p: PhysReg) {
        debug_assert!(!self.free.contains(&p), "double free of p{p}");
        self.ready[p as usize] = true;
        self.free.push_back(p);
    }

    /// Returns true if the value of `p` has been produced.
    #[inline]
    pub fn is_ready(&self, p: PhysReg) -> bool {
        self.ready[p as usize]
    }

    /// Marks `p` as produced.
    pub fn mark_ready(&mut self, p: PhysReg) {
        self.ready[p as usize] = true;
    }
}
