//! Own workers and their harvesting state.

use std::collections::HashSet;

use super::{ResourcePool, TagPool, Tracked};
use crate::command::Target;
use crate::snapshot::{Snapshot, Tag, UnitSnapshot};
use crate::unit_type::AbilityId;

/// What a worker is doing, derived from its orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// No orders.
    Idle,
    /// Gathering from a mineral patch.
    HarvestingMineral(Tag),
    /// Gathering from a gas building.
    HarvestingGas(Tag),
    /// On its way to build, or building.
    Building,
    /// Fighting.
    Combat,
    /// Any other movement.
    Moving,
}

impl WorkerState {
    /// The resource or gas building being harvested.
    #[must_use]
    pub const fn harvest_target(self) -> Option<Tag> {
        match self {
            Self::HarvestingMineral(tag) | Self::HarvestingGas(tag) => Some(tag),
            _ => None,
        }
    }

    fn derive(
        unit: &UnitSnapshot,
        previous: Self,
        resources: &ResourcePool,
        gas_buildings: &HashSet<Tag>,
    ) -> Self {
        let Some(order) = unit.current_order() else {
            return Self::Idle;
        };
        match (order.ability, order.target) {
            (AbilityId::HarvestGather, Target::Unit(tag)) => {
                if resources.is_mineral(tag) {
                    Self::HarvestingMineral(tag)
                } else if gas_buildings.contains(&tag) {
                    Self::HarvestingGas(tag)
                } else {
                    // Depleted or unknown target: free for reassignment.
                    Self::Idle
                }
            }
            // Returning cargo keeps the harvest assignment.
            (AbilityId::HarvestReturn, _) if previous.harvest_target().is_some() => previous,
            (AbilityId::Build(_), _) => Self::Building,
            (AbilityId::Attack, _) => Self::Combat,
            _ => Self::Moving,
        }
    }
}

/// An own worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worker {
    /// Latest snapshot record.
    pub unit: UnitSnapshot,
    /// Derived activity.
    pub state: WorkerState,
    /// Townhall of the base this worker belongs to.
    pub base: Option<Tag>,
}

impl Worker {
    /// Check if the worker may be reassigned to harvesting.
    #[must_use]
    pub fn is_available(&self) -> bool {
        matches!(
            self.state,
            WorkerState::Idle | WorkerState::HarvestingMineral(_) | WorkerState::HarvestingGas(_)
        )
    }
}

impl Tracked for Worker {
    fn refresh(&mut self, unit: &UnitSnapshot) {
        self.unit.clone_from(unit);
    }
}

/// Pool of own workers.
#[derive(Debug, Default)]
pub struct WorkerPool {
    workers: TagPool<Worker>,
}

impl WorkerPool {
    /// Refresh from a snapshot and re-derive every worker's state.
    pub fn update(&mut self, snapshot: &Snapshot, resources: &ResourcePool) {
        self.workers.update(
            snapshot.own().filter(|u| u.unit_type.is_worker()),
            |unit| Worker {
                unit: unit.clone(),
                state: WorkerState::Idle,
                base: None,
            },
        );
        let gas_buildings: HashSet<Tag> = snapshot
            .own()
            .filter(|u| u.unit_type.is_gas_building())
            .map(|u| u.tag)
            .collect();
        for (_, worker) in self.workers.iter_mut() {
            worker.state = WorkerState::derive(&worker.unit, worker.state, resources, &gas_buildings);
        }
    }

    /// Look up a worker.
    #[must_use]
    pub fn get(&self, tag: Tag) -> Option<&Worker> {
        self.workers.get(tag)
    }

    /// Look up a worker mutably.
    pub fn get_mut(&mut self, tag: Tag) -> Option<&mut Worker> {
        self.workers.get_mut(tag)
    }

    /// Iterate workers in tag order.
    pub fn values(&self) -> impl Iterator<Item = &Worker> {
        self.workers.values()
    }

    /// Iterate workers mutably in tag order.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut Worker> {
        self.workers.iter_mut().map(|(_, w)| w)
    }

    /// Workers currently harvesting `target`.
    pub fn harvesting(&self, target: Tag) -> impl Iterator<Item = &Worker> {
        self.values()
            .filter(move |w| w.state.harvest_target() == Some(target))
    }

    /// Idle workers.
    pub fn idle(&self) -> impl Iterator<Item = &Worker> {
        self.values().filter(|w| w.state == WorkerState::Idle)
    }

    /// Number of workers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Check if there are no workers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}
