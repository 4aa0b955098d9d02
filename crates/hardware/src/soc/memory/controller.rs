//! Memory controller implementations for latency modeling.
//!
//! The controller is the last level of the hierarchy and never misses. This module provides:
//! 1. **SimpleController:** Closed-page, fixed latency per access (the default model).
//! 2. **DramController:** Open-page row buffer (CAS, RAS, precharge) for DRAM-style timing.
//!
//! Both report latency in core cycles; the memory system converts to ticks.

use crate::config::{MemoryConfig, MemoryController as ControllerType};

/// Trait for memory controller implementations that report access latency in cycles.
pub trait MemoryController: Send + Sync {
    /// Returns the number of cycles required for an access to the given address.
    ///
    /// # Arguments
    ///
    /// * `addr` - Block address being accessed (may be used for row-buffer modeling).
    fn access_latency(&mut self, addr: u64) -> u64;

    /// Short model name for statistics output.
    fn name(&self) -> &'static str;

    /// Accesses served so far.
    fn accesses(&self) -> u64;
}

/// Builds the controller selected by `cfg`.
pub fn build_controller(cfg: &MemoryConfig) -> Box<dyn MemoryController> {
    match cfg.controller {
        ControllerType::Simple => Box::new(SimpleController::new(cfg.latency)),
        ControllerType::Dram => Box::new(DramController::new(cfg.t_cas, cfg.t_ras, cfg.t_pre, cfg.row_bytes)),
    }
}

/// Fixed-latency memory controller; every access takes the same number of cycles.
#[derive(Debug)]
pub struct SimpleController {
    latency: u64,
    accesses: u64,
}

impl SimpleController {
    /// Creates a simple controller with the given fixed latency in cycles.
    pub fn new(latency: u64) -> Self {
        Self { latency, accesses: 0 }
    }
}

impl MemoryController for SimpleController {
    fn access_latency(&mut self, _addr: u64) -> u64 {
        self.accesses += 1;
        self.latency
    }

    fn name(&self) -> &'static str {
        "simple"
    }

    fn accesses(&self) -> u64 {
        self.accesses
    }
}

/// DRAM-style controller with one open row; models CAS, RAS, and precharge latencies.
#[derive(Debug)]
pub struct DramController {
    open_row: Option<u64>,
    t_cas: u64,
    t_ras: u64,
    t_pre: u64,
    row_mask: u64,
    accesses: u64,
    /// Accesses that found their row already open.
    pub row_hits: u64,
}

impl DramController {
    /// Creates a DRAM controller with the given timing parameters (in cycles) and
    /// row size in bytes (a power of two).
    pub fn new(t_cas: u64, t_ras: u64, t_pre: u64, row_bytes: u64) -> Self {
        Self {
            open_row: None,
            t_cas,
            t_ras,
            t_pre,
            row_mask: !(row_bytes.max(1) - 1),
            accesses: 0,
            row_hits: 0,
        }
    }
}

impl MemoryController for DramController {
    fn access_latency(&mut self, addr: u64) -> u64 {
        self.accesses += 1;
        let row = addr & self.row_mask;
        match self.open_row.replace(row) {
            Some(open) if open == row => {
                self.row_hits += 1;
                self.t_cas
            }
            Some(_) => self.t_pre + self.t_ras + self.t_cas,
            None => self.t_ras + self.t_cas,
        }
    }

    fn name(&self) -> &'static str {
        "dram"
    }

    fn accesses(&self) -> u64 {
        self.accesses
    }
}
