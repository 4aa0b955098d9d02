//! Port wiring and memory system construction.
//!
//! Components are connected by explicit, typed port bindings instead of attribute
//! assignment. This module provides:
//! 1. **Ports:** Every requestor and responder port in the system, named per CPU.
//! 2. **Wiring:** `connect(requestor, responder)` with direction and fan-in checks.
//! 3. **Validation:** A wiring must describe the supported topology (CPU → L1 → L2
//!    crossbar → L2 → system crossbar → memory controller) for every CPU.
//! 4. **Construction:** `build_memory` validates the wiring and builds the hierarchy.

use std::collections::BTreeSet;
use std::fmt;

use tracing::debug;

use crate::common::error::SimError;
use crate::config::Config;
use crate::soc::memory::MemorySystem;

/// A connection point on a component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Port {
    /// CPU instruction-side requestor.
    CpuIcache(usize),
    /// CPU data-side requestor.
    CpuDcache(usize),
    /// L1I responder facing the CPU.
    L1iCpuSide(usize),
    /// L1I requestor facing the L2 crossbar.
    L1iMemSide(usize),
    /// L1D responder facing the CPU.
    L1dCpuSide(usize),
    /// L1D requestor facing the L2 crossbar.
    L1dMemSide(usize),
    /// L2 crossbar responder ports (accept many requestors).
    L2BusCpuSide(usize),
    /// L2 crossbar requestor port.
    L2BusMemSide(usize),
    /// L2 responder facing the L2 crossbar.
    L2CpuSide(usize),
    /// L2 requestor facing the system crossbar.
    L2MemSide(usize),
    /// System crossbar responder ports (accept many requestors).
    MemBusCpuSide,
    /// System crossbar requestor port.
    MemBusMemSide,
    /// Memory controller responder.
    MemCtrl,
}

impl Port {
    /// Returns true for ports that initiate requests.
    pub fn is_requestor(self) -> bool {
        matches!(
            self,
            Self::CpuIcache(_)
                | Self::CpuDcache(_)
                | Self::L1iMemSide(_)
                | Self::L1dMemSide(_)
                | Self::L2BusMemSide(_)
                | Self::L2MemSide(_)
                | Self::MemBusMemSide
        )
    }

    /// Returns true for responder ports that accept more than one requestor.
    pub fn is_vector(self) -> bool {
        matches!(self, Self::L2BusCpuSide(_) | Self::MemBusCpuSide)
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CpuIcache(c) => write!(f, "cpu{c}.icache_port"),
            Self::CpuDcache(c) => write!(f, "cpu{c}.dcache_port"),
            Self::L1iCpuSide(c) => write!(f, "cpu{c}.l1i.cpu_side"),
            Self::L1iMemSide(c) => write!(f, "cpu{c}.l1i.mem_side"),
            Self::L1dCpuSide(c) => write!(f, "cpu{c}.l1d.cpu_side"),
            Self::L1dMemSide(c) => write!(f, "cpu{c}.l1d.mem_side"),
            Self::L2BusCpuSide(c) => write!(f, "cpu{c}.l2bus.cpu_side_ports"),
            Self::L2BusMemSide(c) => write!(f, "cpu{c}.l2bus.mem_side_ports"),
            Self::L2CpuSide(c) => write!(f, "cpu{c}.l2.cpu_side"),
            Self::L2MemSide(c) => write!(f, "cpu{c}.l2.mem_side"),
            Self::MemBusCpuSide => write!(f, "membus.cpu_side_ports"),
            Self::MemBusMemSide => write!(f, "membus.mem_side_ports"),
            Self::MemCtrl => write!(f, "mem_ctrl.port"),
        }
    }
}

/// The required `(requestor, responder)` bindings for `cpus` CPUs.
fn topology(cpus: usize) -> BTreeSet<(Port, Port)> {
    let mut links: BTreeSet<(Port, Port)> = (0..cpus)
        .flat_map(|c| {
            [
                (Port::CpuIcache(c), Port::L1iCpuSide(c)),
                (Port::CpuDcache(c), Port::L1dCpuSide(c)),
                (Port::L1iMemSide(c), Port::L2BusCpuSide(c)),
                (Port::L1dMemSide(c), Port::L2BusCpuSide(c)),
                (Port::L2BusMemSide(c), Port::L2CpuSide(c)),
                (Port::L2MemSide(c), Port::MemBusCpuSide),
            ]
        })
        .collect();
    let _ = links.insert((Port::MemBusMemSide, Port::MemCtrl));
    links
}

/// A set of port bindings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Wiring {
    links: BTreeSet<(Port, Port)>,
}

impl Wiring {
    /// An empty wiring.
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard wiring for `cpus` CPUs, built through `connect`.
    pub fn standard(cpus: usize) -> Result<Self, SimError> {
        let mut wiring = Self::new();
        for (requestor, responder) in topology(cpus) {
            wiring.connect(requestor, responder)?;
        }
        Ok(wiring)
    }

    /// Binds a requestor port to a responder port.
    ///
    /// # Errors
    ///
    /// Fails if the directions are wrong, the requestor is already bound, or a
    /// scalar responder already has a requestor.
    pub fn connect(&mut self, requestor: Port, responder: Port) -> Result<(), SimError> {
        if !requestor.is_requestor() {
            return Err(SimError::Wiring(format!("{requestor} is not a requestor port")));
        }
        if responder.is_requestor() {
            return Err(SimError::Wiring(format!("{responder} is not a responder port")));
        }
        if let Some((_, existing)) = self.links.iter().find(|(r, _)| *r == requestor) {
            return Err(SimError::Wiring(format!("{requestor} is already connected to {existing}")));
        }
        if !responder.is_vector() && self.links.iter().any(|(_, r)| *r == responder) {
            return Err(SimError::Wiring(format!("{responder} already has a requestor")));
        }
        let _ = self.links.insert((requestor, responder));
        Ok(())
    }

    /// Number of bindings.
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Returns true if nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Checks that the wiring is exactly the supported topology for `cpus` CPUs.
    pub fn validate(&self, cpus: usize) -> Result<(), SimError> {
        let expected = topology(cpus);
        if let Some((requestor, responder)) = expected.difference(&self.links).next() {
            return Err(SimError::Wiring(format!(
                "{requestor} must be connected to {responder}"
            )));
        }
        if let Some((requestor, responder)) = self.links.difference(&expected).next() {
            return Err(SimError::Wiring(format!(
                "unsupported connection {requestor} -> {responder}"
            )));
        }
        Ok(())
    }
}

/// Validates `wiring` against `config` and builds the memory hierarchy.
pub fn build_memory(config: &Config, wiring: &Wiring) -> Result<MemorySystem, SimError> {
    wiring.validate(config.cpu_count)?;
    let memory = MemorySystem::new(config)?;
    debug!(
        cpus = config.cpu_count,
        links = wiring.len(),
        controller = memory.controller().name(),
        "memory system built"
    );
    Ok(memory)
}
