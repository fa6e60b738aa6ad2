//! # Swarm Core
//!
//! Deterministic decision pipeline for a rule-based RTS agent.
//!
//! Each tick turns a raw world [`snapshot::Snapshot`] into a batch of
//! [`command::Command`]s. The crate contains **only** decision logic:
//! - No IO
//! - No engine connection
//! - No system randomness (seeded ChaCha only)
//! - No floating-point geometry (uses fixed-point)
//!
//! ## Crate Structure
//!
//! - [`pools`] - Entity Pool Layer (stable identities over noisy snapshots)
//! - [`channels`] - Typed intent channels between planners and consumers
//! - [`production`] - Build-order queue, planner, executor, larva injection
//! - [`economy`] - Resource balancer
//! - [`combat`] - Squads, strategy state machine, micro tactic table
//! - [`placement`] - Building placement solver
//! - [`scouting`] - Overlord watch-points and expansion scouting
//! - [`agent`] - Orchestration of one tick

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod agent;
pub mod channels;
pub mod combat;
pub mod command;
pub mod config;
pub mod context;
pub mod data;
pub mod economy;
pub mod error;
pub mod math;
pub mod placement;
pub mod pools;
pub mod production;
pub mod scouting;
pub mod snapshot;
pub mod unit_type;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::agent::Agent;
    pub use crate::channels::{Channel, Channels, Intent, ProductionIntent, SpawnLarva};
    pub use crate::combat::{CombatPlanner, CombatStrategy, MicroVersion, SquadStatus};
    pub use crate::command::{Command, Target};
    pub use crate::config::{AgentConfig, Verbosity};
    pub use crate::context::TickContext;
    pub use crate::data::{ProductionTarget, TechTree};
    pub use crate::economy::{HarvestPriority, ResourceBalancer};
    pub use crate::error::{AgentError, Result};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::placement::{PlacementSolver, PlacementStrategy};
    pub use crate::pools::Pools;
    pub use crate::production::{ProductionPlanner, ProductionStrategy};
    pub use crate::snapshot::{Alliance, MapInfo, Snapshot, Tag, UnitSnapshot};
    pub use crate::unit_type::{AbilityId, UnitTypeId, UpgradeId};
}
