//! Simulation kernel and orchestration.
//!
//! Provides the discrete-event queue that owns simulated time and the top-level
//! simulator that builds a machine from a configuration and runs it to an exit
//! condition.

/// Discrete-event queue.
pub mod event;

/// Top-level orchestrator.
pub mod simulator;

pub use event::{EventHandle, EventQueue};
pub use simulator::{ExitCause, ExitReport, Machine, Simulator};
