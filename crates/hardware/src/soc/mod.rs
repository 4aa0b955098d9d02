//! System-level components.
//!
//! This module organizes the parts of the simulated system outside the cores:
//! the memory hierarchy timing model, the crossbars that join its levels, and the
//! builder that validates port wiring and assembles it.

/// Port wiring and memory system construction.
pub mod builder;

/// Crossbar interconnect with arbitration.
pub mod interconnect;

/// Memory hierarchy timing and memory controllers.
pub mod memory;

pub use builder::{Port, Wiring, build_memory};
pub use memory::{MemRequest, MemResponse, MemoryHost, MemorySystem, SendStatus, Token};
