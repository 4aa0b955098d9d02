//! Global simulator constants.
//!
//! This module defines constants shared across the simulator. It includes:
//! 1. **Architectural Constants:** Register counts of the built-in micro-ISA.
//! 2. **Instruction Constants:** Instruction size used for fall-through prediction.
//! 3. **Simulation Constants:** Event priorities that fix same-tick ordering.

/// Architectural integer registers per hardware thread.
pub const NUM_ARCH_REGS: usize = 32;

/// Size of one micro-ISA instruction in bytes.
pub const INSTRUCTION_SIZE: u64 = 4;

/// Event priorities. Lower values fire first among events at the same tick.
pub mod priority {
    /// Memory responses (completions and fills) become visible before anything
    /// else at their tick.
    pub const MEM_RESPONSE: i32 = 0;

    /// Requests forwarded between levels; the requester id is added so that
    /// same-tick arrivals reach a crossbar in ascending requester order.
    pub const MEM_FORWARD: i32 = 100;

    /// Interrupt delivery into a thread's interrupt controller.
    pub const INTERRUPT: i32 = 1_000;

    /// Per-cycle CPU evaluation; the CPU id is added.
    pub const CPU_TICK: i32 = 10_000;
}
