//! # Swarm Test Utilities
//!
//! Shared testing utilities for the agent crates:
//! - Snapshot and map builders
//! - Base layout fixtures
//! - Determinism harness over command batches
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod determinism;
pub mod fixtures;
pub mod strategies;

/// Re-export proptest for convenience.
pub use proptest;
