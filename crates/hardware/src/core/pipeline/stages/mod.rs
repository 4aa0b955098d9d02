//! Pipeline stage implementations.
//!
//! This module contains the stages of the out-of-order pipeline, each a free function
//! over the `Cpu`. `Cpu::tick` evaluates them in reverse order so that every stage
//! sees what the next stage left at the end of the previous cycle:
//! 1. **Commit:** In-order retirement, interrupts, faults and store writes.
//! 2. **Writeback:** Wakeup of dependents and branch resolution.
//! 3. **Issue:** Out-of-order selection onto functional units and the data cache.
//! 4. **Dispatch:** ROB and issue queue allocation.
//! 5. **Rename:** Physical register assignment.
//! 6. **Decode:** Bandwidth-limited hop from the fetch queue.
//! 7. **Fetch:** Instruction cache access, prediction and functional execution.

/// Commit stage implementation.
pub mod commit;

/// Decode stage implementation.
pub mod decode;

/// Dispatch stage implementation.
pub mod dispatch;

/// Fetch stage implementation.
pub mod fetch;

/// Issue stage implementation.
pub mod issue;

/// Rename stage implementation.
pub mod rename;

/// Writeback stage implementation.
pub mod writeback;

pub use commit::commit_stage;
pub use decode::decode_stage;
pub use dispatch::dispatch_stage;
pub use fetch::fetch_stage;
pub use issue::issue_stage;
pub use rename::rename_stage;
pub use writeback::writeback_stage;
