//! Memory access types.
//!
//! Classifies requests travelling through the memory hierarchy. The kind decides
//! which L1 a request enters, whether a hit dirties the line, and which statistics
//! counter it lands in.

use serde::Deserialize;

/// Type of memory access operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
pub enum AccessType {
    /// Instruction fetch access (enters through the L1I).
    Fetch,

    /// Data read access (enters through the L1D).
    Load,

    /// Data write access (enters through the L1D, dirties the line).
    Store,
}

impl AccessType {
    /// Returns true if this access modifies the line it touches.
    #[inline]
    pub fn is_write(self) -> bool {
        matches!(self, Self::Store)
    }
}

/// CPU-side port a request enters the hierarchy through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum L1Port {
    /// Instruction cache port.
    Inst = 0,
    /// Data cache port.
    Data = 1,
}

impl L1Port {
    /// Port used by a given access type.
    #[inline]
    pub fn for_access(kind: AccessType) -> Self {
        match kind {
            AccessType::Fetch => Self::Inst,
            AccessType::Load | AccessType::Store => Self::Data,
        }
    }

    /// Requester id on the L2 crossbar (arbitration order).
    #[inline]
    pub fn requester_id(self) -> usize {
        self as usize
    }
}
