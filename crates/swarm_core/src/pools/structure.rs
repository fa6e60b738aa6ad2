//! Own structures, finished and under construction.

use tracing::debug;

use super::{TagPool, Tracked};
use crate::snapshot::{Snapshot, Tag, UnitSnapshot};
use crate::unit_type::UnitTypeId;

impl Tracked for UnitSnapshot {
    fn refresh(&mut self, unit: &UnitSnapshot) {
        self.clone_from(unit);
    }
}

/// Pool of own structures.
#[derive(Debug, Default)]
pub struct StructurePool {
    structures: TagPool<UnitSnapshot>,
}

impl StructurePool {
    /// Refresh from a snapshot.
    pub fn update(&mut self, snapshot: &Snapshot) {
        let lost = self
            .structures
            .update(snapshot.own().filter(|u| u.is_structure), UnitSnapshot::clone);
        for (tag, structure) in lost {
            debug!(
                target: "swarm_core::pools",
                tag,
                unit_type = ?structure.unit_type,
                "structure lost"
            );
        }
    }

    /// Look up a structure.
    #[must_use]
    pub fn get(&self, tag: Tag) -> Option<&UnitSnapshot> {
        self.structures.get(tag)
    }

    /// Iterate structures in tag order.
    pub fn iter(&self) -> impl Iterator<Item = &UnitSnapshot> {
        self.structures.values()
    }

    /// Structures of exactly this type.
    pub fn of_type(&self, unit_type: UnitTypeId) -> impl Iterator<Item = &UnitSnapshot> {
        self.iter().filter(move |s| s.unit_type == unit_type)
    }

    /// Finished townhalls of any tier.
    pub fn townhalls(&self) -> impl Iterator<Item = &UnitSnapshot> {
        self.iter().filter(|s| s.unit_type.is_townhall())
    }

    /// Count structures of exactly this type, finished or not.
    #[must_use]
    pub fn count(&self, unit_type: UnitTypeId) -> usize {
        self.of_type(unit_type).count()
    }

    /// Check if a finished structure satisfies `required`.
    ///
    /// Tier upgrades count: a Lair satisfies a Hatchery requirement.
    #[must_use]
    pub fn has_completed(&self, required: UnitTypeId) -> bool {
        self.iter()
            .any(|s| s.is_ready() && s.unit_type.satisfies(required))
    }

    /// Number of structures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.structures.len()
    }

    /// Check if there are no structures.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.structures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Fixed, Vec2Fixed};
    use crate::snapshot::Alliance;

    fn own(tag: Tag, unit_type: UnitTypeId) -> UnitSnapshot {
        UnitSnapshot::new(tag, unit_type, Alliance::Own, Vec2Fixed::ZERO)
    }

    #[test]
    fn test_completion_respects_build_progress() {
        let mut pool_in_progress = own(2, UnitTypeId::SpawningPool);
        pool_in_progress.build_progress = Fixed::from_num(0.5);
        let snapshot = Snapshot {
            units: vec![own(1, UnitTypeId::Lair), pool_in_progress],
            ..Snapshot::default()
        };
        let mut pool = StructurePool::default();
        pool.update(&snapshot);

        assert_eq!(pool.len(), 2);
        assert!(pool.has_completed(UnitTypeId::Hatchery));
        assert!(pool.has_completed(UnitTypeId::Lair));
        assert!(!pool.has_completed(UnitTypeId::Hive));
        assert!(!pool.has_completed(UnitTypeId::SpawningPool));
        assert_eq!(pool.count(UnitTypeId::SpawningPool), 1);
        assert_eq!(pool.count(UnitTypeId::Hatchery), 0);
    }

    #[test]
    fn test_ignores_units_and_enemies() {
        let mut enemy = own(3, UnitTypeId::CommandCenter);
        enemy.alliance = Alliance::Enemy;
        let snapshot = Snapshot {
            units: vec![own(1, UnitTypeId::Drone), enemy],
            ..Snapshot::default()
        };
        let mut pool = StructurePool::default();
        pool.update(&snapshot);
        assert!(pool.is_empty());
    }
}
