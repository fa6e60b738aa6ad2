//! Production: the build-order queue, the planner that fills and drains it,
//! the executor that turns intents into commands, and larva injection.

mod executor;
pub mod goals;
mod larva;
mod planner;
mod queue;

pub use executor::ProductionExecutor;
pub use goals::ProductionStrategy;
pub use larva::{LarvaInjector, INJECT_COOLDOWN, INJECT_ENERGY};
pub use planner::{
    expansion_site, harvest_priority, PlannerState, ProductionPlanner, DEFAULT_STALL_LIMIT,
    PENDING_GRACE,
};
pub use queue::{BuildItem, BuildOrderQueue, CutInReason};
