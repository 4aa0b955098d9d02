//! Micro-ISA instruction definitions.
//!
//! The timing model needs only a small amount of information from each
//! instruction: which registers it reads and writes, which functional unit class it
//! occupies, whether it touches memory, and whether it can redirect control flow.
//! `MicroOp` carries exactly that, plus enough semantics for the built-in executor
//! to produce real values and branch outcomes.

use serde::Deserialize;

use crate::common::constants::NUM_ARCH_REGS;

/// Architectural register index. Register 0 always reads as zero and ignores writes.
pub type Reg = u8;

/// Integer and floating-point ALU functions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AluFunc {
    /// Wrapping add.
    Add,
    /// Wrapping subtract.
    Sub,
    /// Bitwise and.
    And,
    /// Bitwise or.
    Or,
    /// Bitwise xor.
    Xor,
    /// Shift left by the low 6 bits of the second operand.
    Sll,
    /// Logical shift right by the low 6 bits of the second operand.
    Srl,
    /// Signed set-less-than (1 or 0).
    Slt,
    /// Wrapping multiply.
    Mul,
    /// Signed divide; division by zero faults.
    Div,
    /// Signed remainder; division by zero faults.
    Rem,
    /// Double-precision add on the raw register bits.
    Fadd,
    /// Double-precision multiply on the raw register bits.
    Fmul,
}

impl AluFunc {
    /// Functional unit class this function occupies.
    pub fn op_class(self) -> OpClass {
        match self {
            Self::Mul => OpClass::IntMul,
            Self::Div | Self::Rem => OpClass::IntDiv,
            Self::Fadd => OpClass::FpAlu,
            Self::Fmul => OpClass::FpMul,
            _ => OpClass::IntAlu,
        }
    }
}

/// Conditional branch comparisons.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchCond {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Signed less than.
    Lt,
    /// Signed greater or equal.
    Ge,
}

impl BranchCond {
    /// Evaluates the comparison.
    pub fn holds(self, a: u64, b: u64) -> bool {
        match self {
            Self::Eq => a == b,
            Self::Ne => a != b,
            Self::Lt => (a as i64) < (b as i64),
            Self::Ge => (a as i64) >= (b as i64),
        }
    }
}

/// One micro-ISA operation.
///
/// JSON form uses an `op` tag, e.g. `{"op": "alu_imm", "func": "add", "rd": 1, "rs1": 0, "imm": 5}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MicroOp {
    /// `rd = rs1 <func> rs2`.
    Alu {
        /// Function.
        func: AluFunc,
        /// Destination.
        rd: Reg,
        /// First source.
        rs1: Reg,
        /// Second source.
        rs2: Reg,
    },
    /// `rd = rs1 <func> imm`.
    AluImm {
        /// Function.
        func: AluFunc,
        /// Destination.
        rd: Reg,
        /// Source.
        rs1: Reg,
        /// Immediate operand.
        imm: i64,
    },
    /// `rd = imm`.
    Li {
        /// Destination.
        rd: Reg,
        /// Value.
        imm: i64,
    },
    /// `rd = mem[rs1 + offset]` (64-bit word).
    Load {
        /// Destination.
        rd: Reg,
        /// Base address register.
        rs1: Reg,
        /// Byte offset.
        #[serde(default)]
        offset: i64,
    },
    /// `mem[rs1 + offset] = rs2` (64-bit word).
    Store {
        /// Value register.
        rs2: Reg,
        /// Base address register.
        rs1: Reg,
        /// Byte offset.
        #[serde(default)]
        offset: i64,
    },
    /// Conditional direct branch.
    Branch {
        /// Comparison.
        cond: BranchCond,
        /// First operand.
        rs1: Reg,
        /// Second operand.
        rs2: Reg,
        /// Absolute target address.
        target: u64,
    },
    /// Unconditional direct jump.
    Jump {
        /// Absolute target address.
        target: u64,
    },
    /// No operation.
    Nop,
    /// Terminates the thread with the value of `rs1` as exit code.
    Exit {
        /// Register holding the exit code (0 reads as zero).
        #[serde(default)]
        rs1: Reg,
    },
    /// Returns from the interrupt handler to the saved PC.
    Eret,
}

/// Functional unit class an instruction occupies at issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OpClass {
    /// Simple integer arithmetic and logic.
    IntAlu,
    /// Integer multiply.
    IntMul,
    /// Integer divide and remainder.
    IntDiv,
    /// Floating-point add.
    FpAlu,
    /// Floating-point multiply.
    FpMul,
    /// Memory read.
    MemRead,
    /// Memory write.
    MemWrite,
    /// Control transfer.
    Branch,
    /// Occupies no functional unit (nop, exit, eret, faulting fetch).
    NoOp,
}

/// An instruction located at a PC.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StaticInst {
    /// Address of the instruction.
    pub pc: u64,
    /// Operation.
    pub op: MicroOp,
}

impl StaticInst {
    /// Creates an instruction at `pc`.
    pub const fn new(pc: u64, op: MicroOp) -> Self {
        Self { pc, op }
    }

    /// Functional unit class.
    pub fn op_class(&self) -> OpClass {
        match self.op {
            MicroOp::Alu { func, .. } | MicroOp::AluImm { func, .. } => func.op_class(),
            MicroOp::Li { .. } => OpClass::IntAlu,
            MicroOp::Load { .. } => OpClass::MemRead,
            MicroOp::Store { .. } => OpClass::MemWrite,
            MicroOp::Branch { .. } | MicroOp::Jump { .. } => OpClass::Branch,
            MicroOp::Nop | MicroOp::Exit { .. } | MicroOp::Eret => OpClass::NoOp,
        }
    }

    /// Destination register, if the instruction writes a non-zero register.
    pub fn dest(&self) -> Option<Reg> {
        let rd = match self.op {
            MicroOp::Alu { rd, .. }
            | MicroOp::AluImm { rd, .. }
            | MicroOp::Li { rd, .. }
            | MicroOp::Load { rd, .. } => rd,
            _ => return None,
        };
        (rd != 0).then_some(rd)
    }

    /// Source registers that carry a true dependency (register 0 excluded).
    pub fn sources(&self) -> [Option<Reg>; 2] {
        let nz = |r: Reg| (r != 0).then_some(r);
        match self.op {
            MicroOp::Alu { rs1, rs2, .. }
            | MicroOp::Store { rs1, rs2, .. }
            | MicroOp::Branch { rs1, rs2, .. } => [nz(rs1), nz(rs2)],
            MicroOp::AluImm { rs1, .. } | MicroOp::Load { rs1, .. } | MicroOp::Exit { rs1 } => {
                [nz(rs1), None]
            }
            MicroOp::Li { .. } | MicroOp::Jump { .. } | MicroOp::Nop | MicroOp::Eret => {
                [None, None]
            }
        }
    }

    /// Returns true if every register operand names an existing register.
    pub fn registers_valid(&self) -> bool {
        let ok = |r: Reg| (r as usize) < NUM_ARCH_REGS;
        match self.op {
            MicroOp::Alu { rd, rs1, rs2, .. } => ok(rd) && ok(rs1) && ok(rs2),
            MicroOp::AluImm { rd, rs1, .. } | MicroOp::Load { rd, rs1, .. } => ok(rd) && ok(rs1),
            MicroOp::Li { rd, .. } => ok(rd),
            MicroOp::Store { rs1, rs2, .. } | MicroOp::Branch { rs1, rs2, .. } => ok(rs1) && ok(rs2),
            MicroOp::Exit { rs1 } => ok(rs1),
            MicroOp::Jump { .. } | MicroOp::Nop | MicroOp::Eret => true,
        }
    }

    /// Returns true for loads.
    pub fn is_load(&self) -> bool {
        matches!(self.op, MicroOp::Load { .. })
    }

    /// Returns true for stores.
    pub fn is_store(&self) -> bool {
        matches!(self.op, MicroOp::Store { .. })
    }

    /// Returns true for instructions that may change the next PC.
    pub fn is_control(&self) -> bool {
        matches!(
            self.op,
            MicroOp::Branch { .. } | MicroOp::Jump { .. } | MicroOp::Eret
        )
    }

    /// Target of a direct unconditional jump.
    pub fn direct_target(&self) -> Option<u64> {
        match self.op {
            MicroOp::Jump { target } => Some(target),
            _ => None,
        }
    }
}
