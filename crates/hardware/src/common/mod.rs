//! Common utilities and types used throughout the simulator.
//!
//! This module provides fundamental building blocks that are shared across all components
//! of the simulator. It includes:
//! 1. **Units:** Ticks, clock periods, and size strings.
//! 2. **Constants:** Architectural and structural constants.
//! 3. **Memory Access:** Request kinds and the L1 port they enter through.
//! 4. **Error Handling:** Host errors, configuration errors, and workload faults.

/// Common constants used throughout the simulator.
pub mod constants;

/// Memory access type definitions.
pub mod data;

/// Error types and workload fault definitions.
pub mod error;

/// Tick type and unit parsing.
pub mod units;

pub use data::{AccessType, L1Port};
pub use error::{ConfigError, Fault, SimError};
pub use units::Tick;
