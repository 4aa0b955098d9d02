//! Execution units and functional components.
//!
//! This module contains the per-CPU hardware resources the pipeline competes for:
//! the cache levels (with their MSHRs and replacement policies) and the pool of
//! functional units.

/// Set-associative cache level with MSHRs and replacement policies.
pub mod cache;

/// Functional unit pool (ALUs, multipliers, dividers, memory ports).
pub mod fu;
