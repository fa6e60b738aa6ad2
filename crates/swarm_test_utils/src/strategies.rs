//! Property-based testing strategies.

use proptest::prelude::*;
use swarm_core::combat::{CombatStrategy, MicroVersion};
use swarm_core::math::Vec2Fixed;
use swarm_core::unit_type::UnitTypeId;

use crate::fixtures::MAP_SIZE;

/// A cell-centred position on the fixture map.
pub fn map_position() -> impl Strategy<Value = Vec2Fixed> {
    let max = MAP_SIZE as i32;
    (0..max, 0..max).prop_map(|(x, y)| Vec2Fixed::from_ints(x, y))
}

/// Own combat unit types, blacklisted support types included.
pub fn army_unit_type() -> impl Strategy<Value = UnitTypeId> {
    prop_oneof![
        4 => Just(UnitTypeId::Zergling),
        3 => Just(UnitTypeId::Roach),
        2 => Just(UnitTypeId::Hydralisk),
        2 => Just(UnitTypeId::Mutalisk),
        1 => Just(UnitTypeId::Ravager),
        1 => Just(UnitTypeId::Queen),
        1 => Just(UnitTypeId::Overseer),
    ]
}

/// An army composition of up to `max` units.
pub fn army(max: usize) -> impl Strategy<Value = Vec<UnitTypeId>> {
    proptest::collection::vec(army_unit_type(), 0..=max)
}

/// Any combat strategy.
pub fn combat_strategy() -> impl Strategy<Value = CombatStrategy> {
    prop_oneof![
        Just(CombatStrategy::Rush),
        Just(CombatStrategy::Reform),
        Just(CombatStrategy::Harass),
    ]
}

/// Either micro version.
pub fn micro_version() -> impl Strategy<Value = MicroVersion> {
    prop_oneof![Just(MicroVersion::V1), Just(MicroVersion::V2)]
}
