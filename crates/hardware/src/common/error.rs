//! Simulator error and workload fault definitions.
//!
//! This module defines the error handling for the simulator. It provides:
//! 1. **Host errors:** `SimError`, fatal conditions surfaced to the caller (bad configuration,
//!    deadlock, scheduling misuse, broken wiring, unreadable program images).
//! 2. **Configuration detail:** `ConfigError`, the specific reason a configuration was rejected.
//! 3. **Workload faults:** `Fault`, raised by the running program; these terminate the
//!    simulation with a cause but are not host-level errors.

use thiserror::Error;

use crate::common::units::Tick;

/// Reason a configuration was rejected by [`crate::config::Config::validate`].
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A pipeline width was zero.
    #[error("pipeline width `{stage}` must be at least 1")]
    ZeroWidth {
        /// Stage whose width is invalid.
        stage: &'static str,
    },

    /// A size that must be a power of two was not.
    #[error("{what} must be a power of two, got {value}")]
    NotPowerOfTwo {
        /// Parameter name.
        what: String,
        /// Offending value.
        value: u64,
    },

    /// A structure count or latency that must be non-zero was zero.
    #[error("{what} must be non-zero")]
    Zero {
        /// Parameter name.
        what: String,
    },

    /// Cache geometry does not divide into whole sets.
    #[error("{cache}: {size} bytes cannot be split into {assoc}-way sets of {line}-byte lines")]
    BadGeometry {
        /// Cache name.
        cache: String,
        /// Capacity in bytes.
        size: u64,
        /// Associativity.
        assoc: usize,
        /// Line size in bytes.
        line: u64,
    },

    /// A clock string could not be parsed.
    #[error("malformed clock `{0}` (expected e.g. \"1GHz\" or \"500ps\")")]
    MalformedClock(String),

    /// A memory size string could not be parsed.
    #[error("malformed memory size `{0}` (expected e.g. \"8192MiB\")")]
    MalformedSize(String),

    /// The physical register file cannot back every architectural register.
    #[error(
        "{phys} physical registers cannot rename {arch} architectural registers \
         for {threads} thread(s)"
    )]
    TooFewPhysRegs {
        /// Configured physical registers.
        phys: usize,
        /// Architectural registers per thread.
        arch: usize,
        /// Hardware threads per CPU.
        threads: usize,
    },
}

/// Fatal simulator errors.
#[derive(Debug, Error)]
pub enum SimError {
    /// Configuration rejected before any simulation starts.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No instruction could make progress for too many consecutive cycles.
    #[error("resource exhaustion on cpu{cpu} at tick {tick}: no commit for {cycles} cycles\n{dump}")]
    ResourceExhaustion {
        /// CPU that deadlocked.
        cpu: usize,
        /// Tick at which the deadlock was detected.
        tick: Tick,
        /// Consecutive cycles without a commit.
        cycles: u64,
        /// Diagnostic state dump.
        dump: String,
    },

    /// An event was scheduled in the past.
    #[error("cannot schedule event at tick {tick}: current tick is {now}")]
    InvalidSchedule {
        /// Requested tick.
        tick: Tick,
        /// Current simulation tick.
        now: Tick,
    },

    /// The event queue ran dry.
    #[error("event queue is empty at tick {0}")]
    EmptyQueue(Tick),

    /// Port wiring failed validation.
    #[error("wiring error: {0}")]
    Wiring(String),

    /// The workload image could not be loaded.
    #[error("workload error: {0}")]
    Workload(String),

    /// An operation named a CPU or hardware thread that does not exist.
    #[error("no hardware thread {thread} on cpu{cpu}")]
    NoSuchThread {
        /// CPU index.
        cpu: usize,
        /// Thread index.
        thread: usize,
    },
}

/// Faults raised by the running workload.
///
/// A fault reaching commit terminates the simulation with `ExitCause::Fault`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum Fault {
    /// The executor does not recognise the instruction.
    #[error("illegal instruction at {pc:#x}")]
    IllegalInstruction {
        /// Faulting PC.
        pc: u64,
    },

    /// No instruction exists at the fetched PC.
    #[error("instruction fetch from unmapped address {0:#x}")]
    FetchFault(u64),

    /// A load or store addressed memory outside the configured range.
    #[error("segmentation fault: access to {addr:#x} at pc {pc:#x}")]
    Segfault {
        /// Faulting PC.
        pc: u64,
        /// Offending data address.
        addr: u64,
    },

    /// Integer division by zero.
    #[error("divide by zero at pc {0:#x}")]
    DivideByZero(u64),
}
