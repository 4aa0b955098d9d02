//! Core processor implementation.
//!
//! This module contains the out-of-order CPU: its hardware thread contexts, the
//! pipeline structures and stages, and the execution resources (caches and
//! functional units) the pipeline draws on.

/// CPU core, hardware thread contexts and interrupt controllers.
pub mod cpu;

/// Out-of-order pipeline structures and stages.
pub mod pipeline;

/// Execution units (caches, functional units).
pub mod units;

pub use self::cpu::Cpu;
