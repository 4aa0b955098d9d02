//! Workload-facing instruction set.
//!
//! The simulator models timing, not a real ISA. This module provides the small
//! surface the pipeline needs from a program:
//! 1. **Instructions:** `MicroOp` and `StaticInst`, with register operands, op class
//!    and control-flow properties.
//! 2. **Workload trait:** Fetch, execute and entry points, implemented by programs
//!    or by test doubles.
//! 3. **Programs:** JSON program images and the built-in echo workload.

/// Micro-ISA instruction definitions.
pub mod inst;

/// Program images and workload binding.
pub mod program;

/// Workload trait and reference executor.
pub mod workload;

pub use inst::{AluFunc, BranchCond, MicroOp, OpClass, Reg, StaticInst};
pub use program::{Program, load_workload};
pub use workload::{ExecOutcome, MemAccess, Workload, execute_micro_op};
