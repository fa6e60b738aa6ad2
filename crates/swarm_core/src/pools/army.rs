//! Own combat units.

use tracing::trace;

use super::{TagPool, Tracked};
use crate::snapshot::{Snapshot, Tag, UnitSnapshot};
use crate::unit_type::UnitTypeId;

/// Squad membership of a combat unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CombatState {
    /// Not in any squad.
    #[default]
    Unassigned,
    /// Member of the squad with this id.
    InSquad(u32),
}

/// An own combat unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombatUnit {
    /// Latest snapshot record.
    pub unit: UnitSnapshot,
    /// Squad membership.
    pub state: CombatState,
}

impl Tracked for CombatUnit {
    fn refresh(&mut self, unit: &UnitSnapshot) {
        self.unit.clone_from(unit);
    }
}

/// Pool of own army units.
#[derive(Debug, Default)]
pub struct ArmyPool {
    units: TagPool<CombatUnit>,
}

impl ArmyPool {
    /// Refresh from a snapshot.
    pub fn update(&mut self, snapshot: &Snapshot) {
        let lost = self.units.update(
            snapshot.own().filter(|u| u.unit_type.is_army()),
            |unit| CombatUnit {
                unit: unit.clone(),
                state: CombatState::Unassigned,
            },
        );
        for (tag, _) in lost {
            trace!(target: "swarm_core::combat", tag, "army unit lost");
        }
    }

    /// Look up a unit.
    #[must_use]
    pub fn get(&self, tag: Tag) -> Option<&CombatUnit> {
        self.units.get(tag)
    }

    /// Record squad membership for a unit.
    pub fn set_state(&mut self, tag: Tag, state: CombatState) {
        if let Some(unit) = self.units.get_mut(tag) {
            unit.state = state;
        }
    }

    /// Iterate units in tag order.
    pub fn iter(&self) -> impl Iterator<Item = &CombatUnit> {
        self.units.values()
    }

    /// Unit tags in order.
    pub fn tags(&self) -> impl Iterator<Item = Tag> + '_ {
        self.units.tags()
    }

    /// Count units of exactly this type.
    #[must_use]
    pub fn count(&self, unit_type: UnitTypeId) -> usize {
        self.iter().filter(|c| c.unit.unit_type == unit_type).count()
    }

    /// Number of units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Check if the army is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}
