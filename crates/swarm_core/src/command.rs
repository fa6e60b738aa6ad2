//! Outbound engine commands.
//!
//! A [`Command`] names an ability, the issuing units and exactly one target
//! form. Submission is fire-and-forget; the order of commands in a batch has
//! no meaning to the engine.

use serde::{Deserialize, Serialize};

use crate::math::Vec2Fixed;
use crate::snapshot::Tag;
use crate::unit_type::{AbilityId, UnitTypeId, UpgradeId};

/// Target of a command or order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Target {
    /// Untargeted ability.
    #[default]
    None,
    /// Another entity.
    Unit(Tag),
    /// A world position.
    Position(Vec2Fixed),
}

impl Target {
    /// The targeted tag, if any.
    #[must_use]
    pub const fn tag(self) -> Option<Tag> {
        match self {
            Self::Unit(tag) => Some(tag),
            _ => None,
        }
    }

    /// The targeted position, if any.
    #[must_use]
    pub const fn position(self) -> Option<Vec2Fixed> {
        match self {
            Self::Position(pos) => Some(pos),
            _ => None,
        }
    }
}

/// One engine command.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Command {
    /// Ability to execute.
    pub ability: AbilityId,
    /// Issuing units.
    pub units: Vec<Tag>,
    /// Target of the ability.
    pub target: Target,
}

impl Command {
    /// Create a command for a single unit.
    #[must_use]
    pub fn new(ability: AbilityId, unit: Tag, target: Target) -> Self {
        Self {
            ability,
            units: vec![unit],
            target,
        }
    }

    /// Create a command for a group of units.
    #[must_use]
    pub fn group(ability: AbilityId, units: Vec<Tag>, target: Target) -> Self {
        Self {
            ability,
            units,
            target,
        }
    }

    /// Attack-move to a position.
    #[must_use]
    pub fn attack_move(unit: Tag, pos: Vec2Fixed) -> Self {
        Self::new(AbilityId::Attack, unit, Target::Position(pos))
    }

    /// Attack a specific unit.
    #[must_use]
    pub fn attack_unit(unit: Tag, target: Tag) -> Self {
        Self::new(AbilityId::Attack, unit, Target::Unit(target))
    }

    /// Move without engaging.
    #[must_use]
    pub fn move_to(unit: Tag, pos: Vec2Fixed) -> Self {
        Self::new(AbilityId::Move, unit, Target::Position(pos))
    }

    /// Stop all orders.
    #[must_use]
    pub fn stop(unit: Tag) -> Self {
        Self::new(AbilityId::Stop, unit, Target::None)
    }

    /// Hold position.
    #[must_use]
    pub fn hold(unit: Tag) -> Self {
        Self::new(AbilityId::HoldPosition, unit, Target::None)
    }

    /// Harvest from a mineral patch or gas building.
    #[must_use]
    pub fn gather(worker: Tag, resource: Tag) -> Self {
        Self::new(AbilityId::HarvestGather, worker, Target::Unit(resource))
    }

    /// Drone builds a structure at a position.
    #[must_use]
    pub fn build_at(worker: Tag, structure: UnitTypeId, pos: Vec2Fixed) -> Self {
        Self::new(AbilityId::Build(structure), worker, Target::Position(pos))
    }

    /// Drone builds a structure on another entity (extractor on a geyser).
    #[must_use]
    pub fn build_on(worker: Tag, structure: UnitTypeId, target: Tag) -> Self {
        Self::new(AbilityId::Build(structure), worker, Target::Unit(target))
    }

    /// Larva or townhall trains a unit.
    #[must_use]
    pub fn train(source: Tag, unit: UnitTypeId) -> Self {
        Self::new(AbilityId::Train(unit), source, Target::None)
    }

    /// Unit or structure morphs in place.
    #[must_use]
    pub fn morph(source: Tag, into: UnitTypeId) -> Self {
        Self::new(AbilityId::Morph(into), source, Target::None)
    }

    /// Structure researches an upgrade.
    #[must_use]
    pub fn research(source: Tag, upgrade: UpgradeId) -> Self {
        Self::new(AbilityId::Research(upgrade), source, Target::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_accessors() {
        assert_eq!(Target::Unit(5).tag(), Some(5));
        assert_eq!(Target::Unit(5).position(), None);
        let p = Vec2Fixed::from_ints(3, 4);
        assert_eq!(Target::Position(p).position(), Some(p));
        assert_eq!(Target::None.tag(), None);
    }

    #[test]
    fn test_constructors() {
        let c = Command::gather(1, 2);
        assert_eq!(c.ability, AbilityId::HarvestGather);
        assert_eq!(c.units, vec![1]);
        assert_eq!(c.target, Target::Unit(2));

        let g = Command::group(AbilityId::Attack, vec![1, 2, 3], Target::None);
        assert_eq!(g.units.len(), 3);
    }
}
