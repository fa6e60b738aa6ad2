//! Army power estimation.
//!
//! Power is a weighted sum over per-type weights from the tech table. It is
//! only ever compared against other power values, never against game time
//! or supply.

use crate::data::TechTree;
use crate::pools::Pools;
use crate::snapshot::{Tag, UnitSnapshot};

/// Power of one unit.
#[must_use]
pub fn unit_power(tech: &TechTree, unit: &UnitSnapshot) -> u32 {
    tech.power_weight(unit.unit_type, unit.can_attack)
}

/// Summed power of a set of units.
pub fn army_power<'a>(tech: &TechTree, units: impl IntoIterator<Item = &'a UnitSnapshot>) -> u32 {
    units.into_iter().map(|u| unit_power(tech, u)).sum()
}

/// Summed power of own army units by tag; unknown tags count for nothing.
#[must_use]
pub fn tags_power(tech: &TechTree, pools: &Pools, tags: &[Tag]) -> u32 {
    army_power(tech, tags.iter().filter_map(|t| pools.army.get(*t)).map(|c| &c.unit))
}

/// Check if `own` is at least `num / den` times `enemy`.
#[must_use]
pub fn outweighs(own: u32, enemy: u32, num: u32, den: u32) -> bool {
    u64::from(own) * u64::from(den) >= u64::from(enemy) * u64::from(num)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec2Fixed;
    use crate::snapshot::Alliance;
    use crate::unit_type::UnitTypeId;

    #[test]
    fn test_weighted_sum() {
        let tech = TechTree::standard().unwrap();
        let roach = UnitSnapshot::new(1, UnitTypeId::Roach, Alliance::Own, Vec2Fixed::ZERO);
        let ling = UnitSnapshot::new(2, UnitTypeId::Zergling, Alliance::Own, Vec2Fixed::ZERO);
        let total = army_power(&tech, [&roach, &ling]);
        assert_eq!(total, unit_power(&tech, &roach) + unit_power(&tech, &ling));
        assert!(unit_power(&tech, &roach) > unit_power(&tech, &ling));
    }

    #[test]
    fn test_outweighs_ratio() {
        assert!(outweighs(15, 10, 3, 2));
        assert!(!outweighs(14, 10, 3, 2));
        assert!(outweighs(0, 0, 3, 2));
    }
}
