//! Command Queue Mediator.
//!
//! Planners decide *what* should happen and push immutable [`Intent`]s;
//! consumers drain their own typed channel once per tick and turn the
//! messages into engine commands. Every channel is drained and cleared on
//! consumption, so nothing outlives the tick it was produced in.

use std::collections::VecDeque;

use crate::economy::HarvestPriority;
use crate::math::Vec2Fixed;
use crate::snapshot::Tag;
use crate::unit_type::{UnitTypeId, UpgradeId};

/// FIFO channel of value messages.
#[derive(Debug, Clone)]
pub struct Channel<T> {
    queue: VecDeque<T>,
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }
}

impl<T> Channel<T> {
    /// Enqueue a message.
    pub fn push(&mut self, message: T) {
        self.queue.push_back(message);
    }

    /// Remove and yield every queued message in FIFO order.
    pub fn drain(&mut self) -> impl Iterator<Item = T> + '_ {
        self.queue.drain(..)
    }

    /// Number of queued messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Check if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Peek at queued messages.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.queue.iter()
    }
}

/// Work for the production executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductionIntent {
    /// A drone builds a structure near a base.
    BuildBuilding {
        /// Drone to use.
        builder: Tag,
        /// Townhall of the base to build at.
        base: Tag,
        /// Structure type.
        structure: UnitTypeId,
    },
    /// A larva or townhall trains a unit.
    BuildUnit {
        /// Larva or townhall.
        source: Tag,
        /// Unit to train.
        unit: UnitTypeId,
    },
    /// A structure researches an upgrade.
    Upgrade {
        /// Researching structure.
        source: Tag,
        /// Upgrade to research.
        upgrade: UpgradeId,
    },
    /// A unit or structure morphs.
    Morph {
        /// Morphing entity.
        source: Tag,
        /// Resulting type.
        into: UnitTypeId,
    },
    /// A drone builds a new townhall.
    Expand {
        /// Drone to use.
        builder: Tag,
        /// Townhall position.
        position: Vec2Fixed,
    },
}

impl ProductionIntent {
    /// The unit that will carry out the intent.
    #[must_use]
    pub const fn actor(&self) -> Tag {
        match *self {
            Self::BuildBuilding { builder, .. } | Self::Expand { builder, .. } => builder,
            Self::BuildUnit { source, .. }
            | Self::Upgrade { source, .. }
            | Self::Morph { source, .. } => source,
        }
    }
}

/// Request for more larva at a townhall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnLarva {
    /// Townhall to inject.
    pub townhall: Tag,
}

/// Any message a planner can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// See [`ProductionIntent`].
    Production(ProductionIntent),
    /// Global harvest preference for the resource balancer.
    SetHarvestPriority(HarvestPriority),
    /// See [`SpawnLarva`].
    SpawnLarva(SpawnLarva),
}

impl From<ProductionIntent> for Intent {
    fn from(intent: ProductionIntent) -> Self {
        Self::Production(intent)
    }
}

/// One channel per consumer.
#[derive(Debug, Default)]
pub struct Channels {
    /// Consumed by the production executor.
    pub production: Channel<ProductionIntent>,
    /// Consumed by the resource balancer.
    pub harvest: Channel<HarvestPriority>,
    /// Consumed by the larva injector.
    pub larva: Channel<SpawnLarva>,
}

impl Channels {
    /// Route an intent to its consumer's channel.
    pub fn send(&mut self, intent: impl Into<Intent>) {
        match intent.into() {
            Intent::Production(p) => self.production.push(p),
            Intent::SetHarvestPriority(p) => self.harvest.push(p),
            Intent::SpawnLarva(s) => self.larva.push(s),
        }
    }

    /// Total queued messages across channels.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.production.len() + self.harvest.len() + self.larva.len()
    }

    /// Drop everything queued.
    pub fn clear(&mut self) {
        self.production.drain().for_each(drop);
        self.harvest.drain().for_each(drop);
        self.larva.drain().for_each(drop);
    }
}
