/// Simulation harness and program builders.
pub mod harness;
