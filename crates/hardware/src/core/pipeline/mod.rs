//! Out-of-order instruction pipeline.
//!
//! This module contains the structures shared by the pipeline stages of one CPU.
//! It includes the following components:
//! 1. **Dynamic instructions:** Per-instruction state from fetch to commit or squash.
//! 2. **Reorder buffer:** In-order retirement window.
//! 3. **Issue queue:** Out-of-order selection window.
//! 4. **Rename:** Rename maps and the physical register file.
//! 5. **Stages:** Fetch, decode, rename, dispatch, issue, writeback and commit.

/// In-flight instruction state.
pub mod dyn_inst;

/// Issue queue.
pub mod iq;

/// Rename maps and physical register file.
pub mod rename;

/// Reorder buffer.
pub mod rob;

/// Pipeline stage implementations.
pub mod stages;
