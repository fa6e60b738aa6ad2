//! Static game data consulted by the planners.
//!
//! This module contains pure data structures deserialized from RON. The
//! standard table is embedded at compile time, so loading it performs no IO.

mod tech_tree;

pub use tech_tree::{Cost, ProductionKind, ProductionTarget, TechEntry, TechTree};
