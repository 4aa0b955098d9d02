//! Workload collaborator interface.
//!
//! The pipeline does not interpret instructions itself. A `Workload` supplies:
//! 1. **Program image:** `fetch` returns the static instruction at a PC.
//! 2. **Semantics:** `execute` computes the architectural effect of one instruction
//!    against the current thread state (register value, memory access, next PC,
//!    fault or exit) without mutating it; the CPU applies and can undo the effect.
//! 3. **Entry points:** `entry_pc` per hardware thread and an optional interrupt handler.
//!
//! `execute_micro_op` is the reference executor for the built-in micro-ISA and the
//! default `execute` implementation.

use crate::common::data::AccessType;
use crate::common::error::Fault;
use crate::core::cpu::context::ArchState;
use crate::isa::inst::{AluFunc, MicroOp, StaticInst};

/// Data memory touched by an instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemAccess {
    /// Byte address of the 64-bit word.
    pub addr: u64,
    /// Load or store.
    pub kind: AccessType,
    /// Value written by a store.
    pub store_value: Option<u64>,
}

/// Architectural effect of executing one instruction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExecOutcome {
    /// Value for the destination register.
    pub dest_value: Option<u64>,
    /// Address of the next instruction on the correct path.
    pub next_pc: u64,
    /// Data memory access.
    pub mem: Option<MemAccess>,
    /// Fault raised by the instruction; it terminates the run if it commits.
    pub fault: Option<Fault>,
    /// Exit code if the instruction terminates its thread.
    pub exit_code: Option<i64>,
    /// Instruction returns from the interrupt handler.
    pub eret: bool,
}

impl ExecOutcome {
    /// Falls through to the next instruction with no other effect.
    pub fn next(pc: u64) -> Self {
        Self {
            next_pc: pc + crate::common::constants::INSTRUCTION_SIZE,
            ..Self::default()
        }
    }

    /// Raises `fault` at `pc`.
    pub fn faulted(pc: u64, fault: Fault) -> Self {
        Self {
            fault: Some(fault),
            ..Self::next(pc)
        }
    }
}

/// A program bound to one or more hardware threads.
pub trait Workload: Send + Sync {
    /// Human-readable name (binary path or program name).
    fn name(&self) -> &str;

    /// First PC executed by `thread`.
    fn entry_pc(&self, thread: usize) -> u64;

    /// Instruction at `pc`, or `None` if the address holds no instruction.
    fn fetch(&self, pc: u64) -> Option<StaticInst>;

    /// Computes the effect of `inst` on `state`.
    fn execute(&self, inst: &StaticInst, state: &ArchState) -> ExecOutcome {
        execute_micro_op(inst, state)
    }

    /// Interrupt handler entry, if the program installs one.
    fn interrupt_handler(&self) -> Option<u64> {
        None
    }

    /// Words preloaded into every thread's functional memory.
    fn initial_memory(&self) -> Vec<(u64, u64)> {
        Vec::new()
    }

    /// Text the program produced, read back from final thread state.
    fn output(&self, _state: &ArchState) -> Option<String> {
        None
    }
}

impl std::fmt::Debug for dyn Workload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Workload({})", self.name())
    }
}

fn alu(func: AluFunc, a: u64, b: u64, pc: u64) -> Result<u64, Fault> {
    Ok(match func {
        AluFunc::Add => a.wrapping_add(b),
        AluFunc::Sub => a.wrapping_sub(b),
        AluFunc::And => a & b,
        AluFunc::Or => a | b,
        AluFunc::Xor => a ^ b,
        AluFunc::Sll => a << (b & 63),
        AluFunc::Srl => a >> (b & 63),
        AluFunc::Slt => u64::from((a as i64) < (b as i64)),
        AluFunc::Mul => a.wrapping_mul(b),
        AluFunc::Div => {
            if b == 0 {
                return Err(Fault::DivideByZero(pc));
            }
            (a as i64).wrapping_div(b as i64) as u64
        }
        AluFunc::Rem => {
            if b == 0 {
                return Err(Fault::DivideByZero(pc));
            }
            (a as i64).wrapping_rem(b as i64) as u64
        }
        AluFunc::Fadd => (f64::from_bits(a) + f64::from_bits(b)).to_bits(),
        AluFunc::Fmul => (f64::from_bits(a) * f64::from_bits(b)).to_bits(),
    })
}

/// Executes one micro-ISA instruction against `state`.
pub fn execute_micro_op(inst: &StaticInst, state: &ArchState) -> ExecOutcome {
    let pc = inst.pc;
    if !inst.registers_valid() {
        return ExecOutcome::faulted(pc, Fault::IllegalInstruction { pc });
    }
    let reg = |r| state.reg(r);

    let value = |res: Result<u64, Fault>| match res {
        Ok(v) => ExecOutcome {
            dest_value: Some(v),
            ..ExecOutcome::next(pc)
        },
        Err(fault) => ExecOutcome::faulted(pc, fault),
    };

    match inst.op {
        MicroOp::Alu { func, rs1, rs2, .. } => value(alu(func, reg(rs1), reg(rs2), pc)),
        MicroOp::AluImm { func, rs1, imm, .. } => value(alu(func, reg(rs1), imm as u64, pc)),
        MicroOp::Li { imm, .. } => value(Ok(imm as u64)),
        MicroOp::Load { rs1, offset, .. } => {
            let addr = reg(rs1).wrapping_add(offset as u64);
            if addr >= state.mem_limit {
                return ExecOutcome::faulted(pc, Fault::Segfault { pc, addr });
            }
            ExecOutcome {
                dest_value: Some(state.load(addr)),
                mem: Some(MemAccess {
                    addr,
                    kind: AccessType::Load,
                    store_value: None,
                }),
                ..ExecOutcome::next(pc)
            }
        }
        MicroOp::Store { rs1, rs2, offset } => {
            let addr = reg(rs1).wrapping_add(offset as u64);
            if addr >= state.mem_limit {
                return ExecOutcome::faulted(pc, Fault::Segfault { pc, addr });
            }
            ExecOutcome {
                mem: Some(MemAccess {
                    addr,
                    kind: AccessType::Store,
                    store_value: Some(reg(rs2)),
                }),
                ..ExecOutcome::next(pc)
            }
        }
        MicroOp::Branch {
            cond,
            rs1,
            rs2,
            target,
        } => {
            let mut out = ExecOutcome::next(pc);
            if cond.holds(reg(rs1), reg(rs2)) {
                out.next_pc = target;
            }
            out
        }
        MicroOp::Jump { target } => ExecOutcome {
            next_pc: target,
            ..ExecOutcome::default()
        },
        MicroOp::Nop => ExecOutcome::next(pc),
        MicroOp::Exit { rs1 } => ExecOutcome {
            exit_code: Some(reg(rs1) as i64),
            ..ExecOutcome::next(pc)
        },
        MicroOp::Eret => ExecOutcome {
            next_pc: state.epc,
            eret: true,
            ..ExecOutcome::default()
        },
    }
}
