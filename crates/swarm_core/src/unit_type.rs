//! Unit, ability and upgrade identifiers.
//!
//! The agent only needs names for its own race, the neutral resources and a
//! handful of foreign economy/structure types it reasons about. Anything else
//! the engine reports arrives as [`UnitTypeId::Other`] and is classified from
//! the snapshot's own flags.

use serde::{Deserialize, Serialize};

use crate::math::Fixed;

/// Identifier for a unit or structure type.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitTypeId {
    // Own units
    Larva,
    Egg,
    Drone,
    Overlord,
    Overseer,
    Queen,
    Zergling,
    Baneling,
    Roach,
    Ravager,
    Hydralisk,
    Lurker,
    Infestor,
    Mutalisk,
    Corruptor,
    BroodLord,
    Ultralisk,

    // Own structures
    Hatchery,
    Lair,
    Hive,
    SpawningPool,
    Extractor,
    EvolutionChamber,
    RoachWarren,
    BanelingNest,
    HydraliskDen,
    LurkerDen,
    Spire,
    GreaterSpire,
    InfestationPit,
    UltraliskCavern,
    SpineCrawler,
    SporeCrawler,

    // Neutral resources
    MineralField,
    RichMineralField,
    VespeneGeyser,
    RichVespeneGeyser,

    // Foreign types the agent reasons about
    Scv,
    Probe,
    Marine,
    Zealot,
    CommandCenter,
    OrbitalCommand,
    PlanetaryFortress,
    Nexus,
    Refinery,
    Assimilator,

    /// Any type the agent has no name for.
    Other(u32),
}

impl UnitTypeId {
    /// Check if this is a worker of any race.
    #[must_use]
    pub const fn is_worker(self) -> bool {
        matches!(self, Self::Drone | Self::Scv | Self::Probe)
    }

    /// Check if this is a resource depot of any race.
    #[must_use]
    pub const fn is_townhall(self) -> bool {
        matches!(
            self,
            Self::Hatchery
                | Self::Lair
                | Self::Hive
                | Self::CommandCenter
                | Self::OrbitalCommand
                | Self::PlanetaryFortress
                | Self::Nexus
        )
    }

    /// Check if this is a mineral patch.
    #[must_use]
    pub const fn is_mineral(self) -> bool {
        matches!(self, Self::MineralField | Self::RichMineralField)
    }

    /// Check if this is a raw vespene geyser.
    #[must_use]
    pub const fn is_geyser(self) -> bool {
        matches!(self, Self::VespeneGeyser | Self::RichVespeneGeyser)
    }

    /// Check if this is a gas-harvesting structure of any race.
    #[must_use]
    pub const fn is_gas_building(self) -> bool {
        matches!(self, Self::Extractor | Self::Refinery | Self::Assimilator)
    }

    /// Check if this is a harvestable resource patch (mineral or geyser).
    #[must_use]
    pub const fn is_resource(self) -> bool {
        self.is_mineral() || self.is_geyser()
    }

    /// Check if this type is known to be a structure.
    #[must_use]
    pub const fn is_structure(self) -> bool {
        matches!(
            self,
            Self::Hatchery
                | Self::Lair
                | Self::Hive
                | Self::SpawningPool
                | Self::Extractor
                | Self::EvolutionChamber
                | Self::RoachWarren
                | Self::BanelingNest
                | Self::HydraliskDen
                | Self::LurkerDen
                | Self::Spire
                | Self::GreaterSpire
                | Self::InfestationPit
                | Self::UltraliskCavern
                | Self::SpineCrawler
                | Self::SporeCrawler
                | Self::CommandCenter
                | Self::OrbitalCommand
                | Self::PlanetaryFortress
                | Self::Nexus
                | Self::Refinery
                | Self::Assimilator
        )
    }

    /// Check if this is an own army unit (mobile, fights, not an economy unit).
    #[must_use]
    pub const fn is_army(self) -> bool {
        matches!(
            self,
            Self::Zergling
                | Self::Baneling
                | Self::Roach
                | Self::Ravager
                | Self::Hydralisk
                | Self::Lurker
                | Self::Infestor
                | Self::Mutalisk
                | Self::Corruptor
                | Self::BroodLord
                | Self::Ultralisk
                | Self::Overseer
        )
    }

    /// Check if this unit flies.
    #[must_use]
    pub const fn is_flyer(self) -> bool {
        matches!(
            self,
            Self::Overlord | Self::Overseer | Self::Mutalisk | Self::Corruptor | Self::BroodLord
        )
    }

    /// Structures that must sit on creep when placed.
    #[must_use]
    pub const fn requires_creep(self) -> bool {
        self.is_structure() && !matches!(self, Self::Hatchery | Self::Extractor)
    }

    /// Structures placed to hold ground rather than to unlock tech.
    #[must_use]
    pub const fn is_static_defense(self) -> bool {
        matches!(self, Self::SpineCrawler | Self::SporeCrawler)
    }

    /// Half of the footprint edge length, used for collision checks.
    #[must_use]
    pub fn footprint_radius(self) -> Fixed {
        let half = match self {
            Self::Hatchery
            | Self::Lair
            | Self::Hive
            | Self::CommandCenter
            | Self::OrbitalCommand
            | Self::PlanetaryFortress
            | Self::Nexus => 5,
            Self::SpineCrawler | Self::SporeCrawler => 2,
            Self::MineralField | Self::RichMineralField => 2,
            _ if self.is_structure() || self.is_geyser() => 3,
            _ => 1,
        };
        Fixed::from_num(half) / Fixed::from_num(2)
    }

    /// Check if owning a `self` fulfils a tech requirement on `required`.
    ///
    /// A Lair counts as a Hatchery, a Hive as both, a Greater Spire as a Spire.
    #[must_use]
    pub fn satisfies(self, required: Self) -> bool {
        self == required
            || matches!(
                (required, self),
                (Self::Hatchery, Self::Lair | Self::Hive)
                    | (Self::Lair, Self::Hive)
                    | (Self::Spire, Self::GreaterSpire)
            )
    }
}

/// Upgrades the agent can research.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UpgradeId {
    ZerglingSpeed,
    ZerglingAttackSpeed,
    Burrow,
    OverlordSpeed,
    GlialReconstitution,
    TunnelingClaws,
    GroovedSpines,
    MuscularAugments,
    CentrifugalHooks,
    ChitinousPlating,
    MissileWeapons1,
    MissileWeapons2,
    MeleeWeapons1,
    GroundCarapace1,
    GroundCarapace2,
    FlyerAttacks1,
}

/// Engine ability identifiers the agent issues or reads back from orders.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbilityId {
    Attack,
    Move,
    Stop,
    HoldPosition,
    Smart,
    HarvestGather,
    HarvestReturn,
    /// Drone builds a structure.
    Build(UnitTypeId),
    /// Larva or townhall trains a unit.
    Train(UnitTypeId),
    /// Unit or structure morphs in place.
    Morph(UnitTypeId),
    /// Structure researches an upgrade.
    Research(UpgradeId),
    InjectLarva,
    Transfusion,
    BurrowDown,
    BurrowUp,
    /// Any ability the agent does not model.
    Other(u32),
}

impl AbilityId {
    /// The unit type this ability produces, if any.
    #[must_use]
    pub const fn produces(self) -> Option<UnitTypeId> {
        match self {
            Self::Build(t) | Self::Train(t) | Self::Morph(t) => Some(t),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(UnitTypeId::Drone.is_worker());
        assert!(UnitTypeId::Probe.is_worker());
        assert!(UnitTypeId::Lair.is_townhall());
        assert!(UnitTypeId::RichMineralField.is_mineral());
        assert!(UnitTypeId::VespeneGeyser.is_resource());
        assert!(UnitTypeId::Extractor.is_gas_building());
        assert!(UnitTypeId::Roach.is_army());
        assert!(!UnitTypeId::Queen.is_army());
        assert!(!UnitTypeId::Other(7).is_structure());
    }

    #[test]
    fn test_tech_aliases() {
        assert!(UnitTypeId::Hive.satisfies(UnitTypeId::Hatchery));
        assert!(UnitTypeId::GreaterSpire.satisfies(UnitTypeId::Spire));
        assert!(UnitTypeId::RoachWarren.satisfies(UnitTypeId::RoachWarren));
        assert!(!UnitTypeId::Hatchery.satisfies(UnitTypeId::Lair));
        assert!(!UnitTypeId::Other(3).satisfies(UnitTypeId::Other(4)));
    }

    #[test]
    fn test_creep_requirement() {
        assert!(UnitTypeId::SpawningPool.requires_creep());
        assert!(!UnitTypeId::Hatchery.requires_creep());
        assert!(!UnitTypeId::Extractor.requires_creep());
    }

    #[test]
    fn test_ability_produces() {
        assert_eq!(
            AbilityId::Train(UnitTypeId::Drone).produces(),
            Some(UnitTypeId::Drone)
        );
        assert_eq!(AbilityId::Attack.produces(), None);
    }
}
