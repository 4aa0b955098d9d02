//! Dynamic (in-flight) instructions.
//!
//! A `DynInst` is created at fetch and lives until it commits or is squashed. It
//! carries the static instruction, the functional outcome computed at fetch (correct
//! path only), the rename mapping and the timing milestones used for statistics.

use crate::common::error::Fault;
use crate::common::units::Tick;
use crate::core::cpu::context::Undo;
use crate::core::pipeline::rename::PhysReg;
use crate::isa::inst::{MicroOp, OpClass, Reg, StaticInst};
use crate::isa::workload::ExecOutcome;

/// Pipeline position of an instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InstStage {
    /// In the fetch queue.
    Fetched,
    /// In the decode queue.
    Decoded,
    /// Physical registers assigned; waiting for ROB/IQ space.
    Renamed,
    /// In the ROB and IQ, waiting for operands and a functional unit.
    Dispatched,
    /// Executing on a functional unit or waiting for memory.
    Issued,
    /// Result produced, not yet written back.
    Executed,
    /// Result visible to dependents; waiting to commit.
    WrittenBack,
}

/// One instruction in flight.
#[derive(Clone, Debug)]
pub struct DynInst {
    /// Per-CPU sequence number; program order within a thread.
    pub seq: u64,
    /// Hardware thread.
    pub thread: usize,
    /// The instruction.
    pub inst: StaticInst,
    /// Functional unit class.
    pub op_class: OpClass,
    /// Current stage.
    pub stage: InstStage,
    /// Fetched after an unresolved mispredicted branch; never executed functionally
    /// and always squashed before it can commit.
    pub wrong_path: bool,
    /// PC fetch continued at after this instruction.
    pub predicted_next: u64,
    /// Branch whose prediction was wrong; resolving it squashes younger instructions.
    pub mispredicted: bool,
    /// Functional effect (correct path only).
    pub outcome: Option<ExecOutcome>,
    /// Undo record for the functional effect.
    pub undo: Option<Undo>,
    /// Fault to raise at commit.
    pub fault: Option<Fault>,
    /// Data address of a correct-path load or store.
    pub mem_addr: Option<u64>,
    /// Architectural destination.
    pub dest_arch: Option<Reg>,
    /// Architectural sources carrying a true dependency.
    pub src_arch: [Option<Reg>; 2],
    /// Physical source registers.
    pub src_phys: [Option<PhysReg>; 2],
    /// Physical destination register.
    pub dest_phys: Option<PhysReg>,
    /// Mapping of `dest_arch` before this instruction renamed it.
    pub prev_phys: Option<PhysReg>,
    /// A load request is outstanding.
    pub waiting_on_memory: bool,
    /// Tick of fetch.
    pub fetch_tick: Tick,
    /// Tick of issue.
    pub issue_tick: Option<Tick>,
    /// Tick of writeback.
    pub writeback_tick: Option<Tick>,
}

impl DynInst {
    /// Creates a freshly fetched instruction.
    ///
    /// An instruction naming a register that does not exist gets no register
    /// operands, so it passes rename untouched and retires as an illegal
    /// instruction (or is squashed on the wrong path).
    pub fn new(seq: u64, thread: usize, inst: StaticInst, fetch_tick: Tick) -> Self {
        let valid = inst.registers_valid();
        Self {
            seq,
            thread,
            inst,
            op_class: inst.op_class(),
            stage: InstStage::Fetched,
            wrong_path: false,
            predicted_next: inst.pc + crate::common::constants::INSTRUCTION_SIZE,
            mispredicted: false,
            outcome: None,
            undo: None,
            fault: None,
            mem_addr: None,
            dest_arch: if valid { inst.dest() } else { None },
            src_arch: if valid { inst.sources() } else { [None, None] },
            src_phys: [None, None],
            dest_phys: None,
            prev_phys: None,
            waiting_on_memory: false,
            fetch_tick,
            issue_tick: None,
            writeback_tick: None,
        }
    }

    /// A placeholder for a correct-path fetch from an address holding no instruction.
    pub fn fetch_fault(seq: u64, thread: usize, pc: u64, fetch_tick: Tick) -> Self {
        let mut inst = Self::new(seq, thread, StaticInst::new(pc, MicroOp::Nop), fetch_tick);
        inst.fault = Some(Fault::FetchFault(pc));
        inst
    }

    /// PC of the instruction.
    #[inline]
    pub fn pc(&self) -> u64 {
        self.inst.pc
    }

    /// Returns true for a correct-path load that must access the data cache.
    pub fn needs_load_access(&self) -> bool {
        self.inst.is_load() && self.fault.is_none() && self.mem_addr.is_some()
    }

    /// Returns true for a correct-path store that writes the data cache at commit.
    pub fn needs_store_access(&self) -> bool {
        self.inst.is_store() && self.fault.is_none() && self.mem_addr.is_some()
    }

    /// Exit code if this instruction terminates its thread.
    pub fn exit_code(&self) -> Option<i64> {
        self.outcome.and_then(|o| o.exit_code)
    }

    /// Returns true if this instruction returns from an interrupt handler.
    pub fn is_eret(&self) -> bool {
        self.outcome.is_some_and(|o| o.eret)
    }
}
