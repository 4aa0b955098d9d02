//! Hardware thread contexts.
//!
//! A `CpuContext` is the architectural view of one hardware thread. It provides:
//! 1. **State:** Registers, sparse functional memory and the saved interrupt PC.
//! 2. **Functional execution:** `apply` commits an `ExecOutcome` to the state and
//!    returns an `Undo` record; `undo` reverts it when the instruction is squashed.
//! 3. **Binding:** The workload reference, entry PC and interrupt controller.
//!
//! Execution runs ahead of commit (at fetch, on the correct path only), so the state
//! here reflects every correct-path instruction fetched so far. Squashes roll it back
//! youngest-first.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::common::constants::NUM_ARCH_REGS;
use crate::core::cpu::interrupts::InterruptController;
use crate::isa::inst::Reg;
use crate::isa::workload::{ExecOutcome, Workload};

/// Architectural register and memory state of one thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchState {
    regs: [u64; NUM_ARCH_REGS],
    mem: HashMap<u64, u64>,
    /// Size of the address range `[0, mem_limit)`; accesses beyond it fault.
    pub mem_limit: u64,
    /// PC saved on interrupt entry.
    pub epc: u64,
}

impl ArchState {
    /// Creates zeroed state for a memory range of `mem_limit` bytes.
    pub fn new(mem_limit: u64) -> Self {
        Self {
            regs: [0; NUM_ARCH_REGS],
            mem: HashMap::new(),
            mem_limit,
            epc: 0,
        }
    }

    /// Reads a register; register 0 and out-of-range indices read as zero.
    #[inline]
    pub fn reg(&self, r: Reg) -> u64 {
        match r {
            0 => 0,
            r => self.regs.get(r as usize).copied().unwrap_or(0),
        }
    }

    /// Writes a register and returns the previous value. Writes to register 0 are dropped.
    pub fn set_reg(&mut self, r: Reg, value: u64) -> u64 {
        match self.regs.get_mut(r as usize) {
            Some(slot) if r != 0 => std::mem::replace(slot, value),
            _ => 0,
        }
    }

    /// Reads the word at `addr`; unwritten memory reads as zero.
    pub fn load(&self, addr: u64) -> u64 {
        self.mem.get(&addr).copied().unwrap_or(0)
    }

    /// Writes the word at `addr` and returns what was there before.
    pub fn store(&mut self, addr: u64, value: u64) -> Option<u64> {
        self.mem.insert(addr, value)
    }

    /// Puts back a word saved by `store`.
    pub fn restore(&mut self, addr: u64, previous: Option<u64>) {
        match previous {
            Some(v) => {
                let _ = self.mem.insert(addr, v);
            }
            None => {
                let _ = self.mem.remove(&addr);
            }
        }
    }

    /// Number of words ever written.
    pub fn mem_words(&self) -> usize {
        self.mem.len()
    }
}

/// Everything needed to revert one functionally executed instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Undo {
    /// Correct-path PC before the instruction executed (its own PC).
    pub pc: u64,
    /// Register written and its previous value.
    pub reg: Option<(Reg, u64)>,
    /// Memory word written and its previous contents.
    pub mem: Option<(u64, Option<u64>)>,
}

/// Lifecycle of a hardware thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThreadStatus {
    /// Fetching and executing.
    Active,
    /// Committed an exit instruction with the given code.
    Exited(i64),
}

/// One hardware thread bound to a workload.
pub struct CpuContext {
    /// Thread index within its CPU.
    pub thread_id: usize,
    /// Functional state (runs ahead of commit).
    pub state: ArchState,
    /// Next PC on the correct path.
    pub arch_pc: u64,
    /// Pending and enabled interrupts.
    pub interrupts: InterruptController,
    /// Program this thread runs.
    pub workload: Arc<dyn Workload>,
    /// Active or exited.
    pub status: ThreadStatus,
    /// Instructions committed by this thread.
    pub committed: u64,
}

impl fmt::Debug for CpuContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CpuContext")
            .field("thread_id", &self.thread_id)
            .field("arch_pc", &format_args!("{:#x}", self.arch_pc))
            .field("status", &self.status)
            .field("committed", &self.committed)
            .field("workload", &self.workload.name())
            .finish_non_exhaustive()
    }
}

impl CpuContext {
    /// Creates a thread at the workload's entry point with its initial memory image.
    pub fn new(thread_id: usize, workload: Arc<dyn Workload>, mem_limit: u64) -> Self {
        let mut state = ArchState::new(mem_limit);
        for (addr, value) in workload.initial_memory() {
            let _ = state.store(addr, value);
        }
        Self {
            thread_id,
            state,
            arch_pc: workload.entry_pc(thread_id),
            interrupts: InterruptController::default(),
            workload,
            status: ThreadStatus::Active,
            committed: 0,
        }
    }

    /// Returns true while the thread has not exited.
    pub fn is_active(&self) -> bool {
        self.status == ThreadStatus::Active
    }

    /// Applies the effect of an instruction at `arch_pc` and advances `arch_pc`.
    pub fn apply(&mut self, inst_dest: Option<Reg>, outcome: &ExecOutcome) -> Undo {
        let mut undo = Undo {
            pc: self.arch_pc,
            reg: None,
            mem: None,
        };
        if outcome.fault.is_none() {
            if let (Some(rd), Some(value)) = (inst_dest, outcome.dest_value) {
                undo.reg = Some((rd, self.state.set_reg(rd, value)));
            }
            if let Some(access) = outcome.mem {
                if let Some(value) = access.store_value {
                    undo.mem = Some((access.addr, self.state.store(access.addr, value)));
                }
            }
        }
        self.arch_pc = outcome.next_pc;
        undo
    }

    /// Reverts one `apply`. Must be called youngest-first.
    pub fn undo(&mut self, undo: &Undo) {
        if let Some((addr, previous)) = undo.mem {
            self.state.restore(addr, previous);
        }
        if let Some((rd, previous)) = undo.reg {
            let _ = self.state.set_reg(rd, previous);
        }
        self.arch_pc = undo.pc;
    }
}

/// Creates one context per hardware thread, all bound to `workload`.
pub fn create_threads(workload: &Arc<dyn Workload>, threads: usize, mem_limit: u64) -> Vec<CpuContext> {
    (0..threads)
        .map(|tid| CpuContext::new(tid, Arc::clone(workload), mem_limit))
        .collect()
}
