//! Per-tick context threaded through every subsystem.
//!
//! Built by the agent at the top of each tick and dropped at the end of it.
//! Holds read-only views of the world plus the two pieces of shared mutable
//! state: the intent channels and the outgoing command batch. A unit that has
//! been given a command (or reserved for one) is claimed, and later
//! subsystems leave it alone for the rest of the tick.

use std::collections::{BTreeSet, HashMap};

use tracing::trace;

use crate::channels::Channels;
use crate::command::Command;
use crate::data::TechTree;
use crate::pools::Pools;
use crate::snapshot::{MapInfo, Snapshot, Tag, UnitSnapshot};

/// Everything a subsystem may consult or emit during one tick.
pub struct TickContext<'a> {
    /// The current snapshot.
    pub snapshot: &'a Snapshot,
    /// Static map data.
    pub map: &'a MapInfo,
    /// Static tech table.
    pub tech: &'a TechTree,
    /// Entity pools, already refreshed for this tick.
    pub pools: &'a Pools,
    /// Intent channels.
    pub channels: &'a mut Channels,
    units: HashMap<Tag, &'a UnitSnapshot>,
    claimed: BTreeSet<Tag>,
    commands: Vec<Command>,
}

impl<'a> TickContext<'a> {
    /// Create a context for one tick.
    #[must_use]
    pub fn new(
        snapshot: &'a Snapshot,
        map: &'a MapInfo,
        tech: &'a TechTree,
        pools: &'a Pools,
        channels: &'a mut Channels,
    ) -> Self {
        Self {
            snapshot,
            map,
            tech,
            pools,
            channels,
            units: snapshot.index(),
            claimed: BTreeSet::new(),
            commands: Vec::new(),
        }
    }

    /// Look up a live entity by tag.
    #[must_use]
    pub fn unit(&self, tag: Tag) -> Option<&'a UnitSnapshot> {
        self.units.get(&tag).copied()
    }

    /// Check if a unit already has a command this tick.
    #[must_use]
    pub fn is_claimed(&self, tag: Tag) -> bool {
        self.claimed.contains(&tag)
    }

    /// Reserve a unit for a command issued later this tick.
    pub fn reserve(&mut self, tag: Tag) {
        self.claimed.insert(tag);
    }

    /// Emit a command and claim its units.
    pub fn issue(&mut self, command: Command) {
        trace!(ability = ?command.ability, units = ?command.units, "issue");
        self.claimed.extend(command.units.iter().copied());
        self.commands.push(command);
    }

    /// Commands emitted so far.
    #[must_use]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Finish the tick and hand back the batch.
    #[must_use]
    pub fn into_commands(self) -> Vec<Command> {
        self.commands
    }
}
