//! Units enlisted for scouting.
//!
//! Scouting is exclusive: a unit holds at most one task, and units in this
//! pool are skipped by the economy balancer and squad sampling.

use tracing::debug;

use super::{TagPool, Tracked};
use crate::math::Vec2Fixed;
use crate::snapshot::{Snapshot, Tag, UnitSnapshot};

/// A scouting assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoutTask {
    /// Park at a position and watch.
    Watch(Vec2Fixed),
    /// Visit each position in turn, looping.
    ScoutExpansions {
        /// Positions to visit.
        route: Vec<Vec2Fixed>,
        /// Index of the next position.
        next: usize,
    },
}

impl ScoutTask {
    /// Where the scout should currently be heading.
    #[must_use]
    pub fn destination(&self) -> Option<Vec2Fixed> {
        match self {
            Self::Watch(pos) => Some(*pos),
            Self::ScoutExpansions { route, next } => route.get(*next).copied(),
        }
    }

    /// Advance an expansion route to its next stop.
    pub fn advance(&mut self) {
        if let Self::ScoutExpansions { route, next } = self {
            if !route.is_empty() {
                *next = (*next + 1) % route.len();
            }
        }
    }
}

/// An enlisted scout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scout {
    /// Latest snapshot record.
    pub unit: UnitSnapshot,
    /// The assignment.
    pub task: ScoutTask,
}

impl Tracked for Scout {
    fn refresh(&mut self, unit: &UnitSnapshot) {
        self.unit.clone_from(unit);
    }
}

/// Pool of enlisted scouts.
#[derive(Debug, Default)]
pub struct ScoutPool {
    scouts: TagPool<Scout>,
}

impl ScoutPool {
    /// Refresh enlisted scouts; scouts that died are released.
    pub fn update(&mut self, snapshot: &Snapshot) {
        self.scouts.mark_unseen();
        for unit in snapshot.own() {
            self.scouts.observe_existing(unit);
        }
        for (tag, _) in self.scouts.sweep() {
            debug!(target: "swarm_core::scouting", tag, "scout lost");
        }
    }

    /// Enlist a unit. Fails if it already has a task.
    pub fn enlist(&mut self, unit: &UnitSnapshot, task: ScoutTask) -> bool {
        if self.scouts.contains(unit.tag) {
            return false;
        }
        self.scouts.insert(
            unit.tag,
            Scout {
                unit: unit.clone(),
                task,
            },
        );
        true
    }

    /// Release a scout from its task.
    pub fn release(&mut self, tag: Tag) -> Option<Scout> {
        self.scouts.remove(tag)
    }

    /// Check if a unit is enlisted.
    #[must_use]
    pub fn contains(&self, tag: Tag) -> bool {
        self.scouts.contains(tag)
    }

    /// Look up a scout.
    #[must_use]
    pub fn get(&self, tag: Tag) -> Option<&Scout> {
        self.scouts.get(tag)
    }

    /// Look up a scout mutably.
    pub fn get_mut(&mut self, tag: Tag) -> Option<&mut Scout> {
        self.scouts.get_mut(tag)
    }

    /// Iterate scouts in tag order.
    pub fn iter(&self) -> impl Iterator<Item = &Scout> {
        self.scouts.values()
    }

    /// Number of scouts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.scouts.len()
    }

    /// Check if there are no scouts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scouts.is_empty()
    }
}
