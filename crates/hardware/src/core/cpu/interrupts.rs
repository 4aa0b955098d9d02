//! Per-thread interrupt controller.
//!
//! Interrupts are posted asynchronously by events and taken only at the commit
//! boundary. The enable flag tracks committed state: it is cleared when an
//! interrupt is taken and set again when an `Eret` commits.

use std::collections::VecDeque;

/// Pending interrupt vectors and the committed enable flag of one thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterruptController {
    pending: VecDeque<u32>,
    enabled: bool,
    /// Interrupts taken so far.
    pub taken: u64,
}

impl Default for InterruptController {
    fn default() -> Self {
        Self {
            pending: VecDeque::new(),
            enabled: true,
            taken: 0,
        }
    }
}

impl InterruptController {
    /// Queues an interrupt.
    pub fn post(&mut self, vector: u32) {
        self.pending.push_back(vector);
    }

    /// Returns true if an interrupt is waiting, enabled or not.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Returns true if interrupts are currently accepted.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns true if an interrupt should be taken at the next commit boundary.
    pub fn can_take(&self) -> bool {
        self.enabled && !self.pending.is_empty()
    }

    /// Dequeues the oldest pending interrupt and disables further delivery.
    pub fn take(&mut self) -> Option<u32> {
        if !self.enabled {
            return None;
        }
        let vector = self.pending.pop_front()?;
        self.enabled = false;
        self.taken += 1;
        Some(vector)
    }

    /// Re-enables delivery (an `Eret` committed).
    pub fn eret(&mut self) {
        self.enabled = true;
    }
}
