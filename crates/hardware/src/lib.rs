//! Event-driven out-of-order CPU and cache hierarchy timing simulator.
//!
//! This crate implements a cycle-level timing model with the following:
//! 1. **Core:** Out-of-order pipeline (fetch, decode, rename, dispatch, issue,
//!    writeback, commit) with register renaming, a reorder buffer and SMT.
//! 2. **Memory:** Private L1I/L1D/L2 per CPU with MSHRs and replacement policies,
//!    crossbars and a memory controller.
//! 3. **ISA:** A workload interface and a small built-in micro-ISA.
//! 4. **SoC:** Typed port wiring and construction of the memory hierarchy.
//! 5. **Simulation:** Event queue, configuration, orchestration and statistics.

/// Common types and constants (ticks, access types, errors, event priorities).
pub mod common;
/// Simulator configuration (defaults, enums, hierarchical config structures).
pub mod config;
/// CPU core (pipeline, thread contexts, execution units).
pub mod core;
/// Workload interface and built-in micro-ISA programs.
pub mod isa;
/// Event queue and top-level simulator.
pub mod sim;
/// System-on-chip (port wiring, interconnect, memory hierarchy).
pub mod soc;
/// Simulation statistics collection and reporting.
pub mod stats;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// Main CPU type; holds the pipeline, thread contexts and stats.
pub use crate::core::Cpu;
/// Top-level simulator; construct with `Simulator::new`.
pub use crate::sim::{ExitCause, ExitReport, Simulator};
