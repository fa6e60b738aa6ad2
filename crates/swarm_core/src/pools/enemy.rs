//! Visible enemy units, their groups, and remembered enemy structures.

use std::collections::BTreeMap;

use tracing::debug;

use super::cluster::greedy_clusters;
use super::{TagPool, Tracked};
use crate::data::TechTree;
use crate::math::{centroid, Fixed, Vec2Fixed};
use crate::snapshot::{Snapshot, Tag, UnitSnapshot};
use crate::unit_type::UnitTypeId;

/// Maximum gap between members of one enemy group.
pub const GROUP_THRESHOLD: i32 = 10;

/// An own unit this close to a remembered structure's spot proves it gone
/// if it is not visible.
const FORGET_RADIUS: i32 = 7;

/// A visible enemy unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnemyUnit {
    /// Latest snapshot record.
    pub unit: UnitSnapshot,
    /// Power weight of this unit.
    pub power: u32,
}

impl Tracked for EnemyUnit {
    fn refresh(&mut self, unit: &UnitSnapshot) {
        self.unit.clone_from(unit);
    }
}

/// A spatial cluster of enemy combat units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnemyGroup {
    members: Vec<Tag>,
    centroid: Vec2Fixed,
    /// Sum of member power weights.
    pub power: u32,
}

impl EnemyGroup {
    fn new(members: Vec<Tag>, positions: &[Vec2Fixed], power: u32) -> Option<Self> {
        let mut group = Self {
            members: Vec::new(),
            centroid: Vec2Fixed::ZERO,
            power,
        };
        group.set_members(members, positions)?;
        Some(group)
    }

    /// Replace the member set; the centroid follows.
    fn set_members(&mut self, members: Vec<Tag>, positions: &[Vec2Fixed]) -> Option<()> {
        self.centroid = centroid(positions.iter().copied())?;
        self.members = members;
        Some(())
    }

    /// Member tags in tag order.
    #[must_use]
    pub fn members(&self) -> &[Tag] {
        &self.members
    }

    /// Mean position of the members.
    #[must_use]
    pub const fn centroid(&self) -> Vec2Fixed {
        self.centroid
    }
}

/// Last known facts about an enemy structure out of sight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RememberedStructure {
    /// Structure tag.
    pub tag: Tag,
    /// Structure type.
    pub unit_type: UnitTypeId,
    /// Where it was last seen.
    pub position: Vec2Fixed,
}

/// Pool of enemy units plus structure memory.
#[derive(Debug, Default)]
pub struct EnemyPool {
    units: TagPool<EnemyUnit>,
    groups: Vec<EnemyGroup>,
    structures: BTreeMap<Tag, RememberedStructure>,
}

impl EnemyPool {
    /// Refresh visible enemies, regroup combatants and update structure memory.
    pub fn update(&mut self, snapshot: &Snapshot, tech: &TechTree) {
        self.units.update(snapshot.enemies(), |unit| EnemyUnit {
            unit: unit.clone(),
            power: 0,
        });
        for (_, enemy) in self.units.iter_mut() {
            enemy.power = tech.power_weight(enemy.unit.unit_type, enemy.unit.can_attack);
        }

        self.regroup();
        self.remember_structures(snapshot);
    }

    fn regroup(&mut self) {
        let combatants: Vec<&EnemyUnit> = self
            .units
            .values()
            .filter(|e| e.unit.is_enemy_combatant())
            .collect();
        let points: Vec<Vec2Fixed> = combatants.iter().map(|e| e.unit.position).collect();
        let clusters = greedy_clusters(&points, Fixed::from_num(GROUP_THRESHOLD));

        self.groups = clusters
            .into_iter()
            .filter_map(|indices| {
                let members = indices.iter().map(|&i| combatants[i].unit.tag).collect();
                let positions: Vec<Vec2Fixed> = indices.iter().map(|&i| points[i]).collect();
                let power = indices.iter().map(|&i| combatants[i].power).sum();
                EnemyGroup::new(members, &positions, power)
            })
            .collect();
    }

    fn remember_structures(&mut self, snapshot: &Snapshot) {
        for enemy in self.units.values().filter(|e| e.unit.is_structure) {
            let fresh = RememberedStructure {
                tag: enemy.unit.tag,
                unit_type: enemy.unit.unit_type,
                position: enemy.unit.position,
            };
            if self.structures.insert(fresh.tag, fresh).is_none() {
                debug!(
                    target: "swarm_core::pools",
                    tag = fresh.tag,
                    unit_type = ?fresh.unit_type,
                    "enemy structure spotted"
                );
            }
        }

        let radius = Fixed::from_num(FORGET_RADIUS);
        let units = &self.units;
        self.structures.retain(|tag, remembered| {
            if units.contains(*tag) {
                return true;
            }
            let observed = snapshot
                .own()
                .any(|own| own.position.is_within(remembered.position, radius));
            if observed {
                debug!(target: "swarm_core::pools", tag, "enemy structure forgotten");
            }
            !observed
        });
    }

    /// Look up a visible enemy.
    #[must_use]
    pub fn get(&self, tag: Tag) -> Option<&EnemyUnit> {
        self.units.get(tag)
    }

    /// Visible enemies in tag order.
    pub fn iter(&self) -> impl Iterator<Item = &EnemyUnit> {
        self.units.values()
    }

    /// Current combat groups.
    #[must_use]
    pub fn groups(&self) -> &[EnemyGroup] {
        &self.groups
    }

    /// Group whose centroid is closest to `pos`.
    #[must_use]
    pub fn nearest_group(&self, pos: Vec2Fixed) -> Option<&EnemyGroup> {
        self.groups
            .iter()
            .min_by_key(|g| g.centroid.distance_squared(pos))
    }

    /// Remembered enemy structures in tag order.
    pub fn remembered_structures(&self) -> impl Iterator<Item = &RememberedStructure> {
        self.structures.values()
    }

    /// Remembered structure closest to `pos`.
    #[must_use]
    pub fn nearest_structure(&self, pos: Vec2Fixed) -> Option<&RememberedStructure> {
        self.structures
            .values()
            .min_by_key(|s| s.position.distance_squared(pos))
    }

    /// Enemy combatants within `radius` of `pos`.
    pub fn combatants_near(
        &self,
        pos: Vec2Fixed,
        radius: Fixed,
    ) -> impl Iterator<Item = &EnemyUnit> {
        self.units
            .values()
            .filter(move |e| e.unit.is_enemy_combatant() && e.unit.position.is_within(pos, radius))
    }

    /// Total power of all visible enemies.
    #[must_use]
    pub fn total_power(&self) -> u32 {
        self.units.values().map(|e| e.power).sum()
    }

    /// Number of visible enemies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Check if no enemies are visible.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Alliance;

    fn enemy(tag: Tag, unit_type: UnitTypeId, x: i32, y: i32) -> UnitSnapshot {
        UnitSnapshot::new(tag, unit_type, Alliance::Enemy, Vec2Fixed::from_ints(x, y))
    }

    fn tech() -> TechTree {
        TechTree::standard().unwrap()
    }

    #[test]
    fn test_groups_split_by_distance() {
        let snapshot = Snapshot {
            units: vec![
                enemy(1, UnitTypeId::Marine, 10, 10),
                enemy(2, UnitTypeId::Marine, 12, 10),
                enemy(3, UnitTypeId::Zealot, 80, 80),
                // Workers and structures never form groups.
                enemy(4, UnitTypeId::Scv, 11, 11),
                enemy(5, UnitTypeId::CommandCenter, 90, 90),
            ],
            ..Snapshot::default()
        };
        let mut pool = EnemyPool::default();
        pool.update(&snapshot, &tech());

        assert_eq!(pool.groups().len(), 2);
        assert_eq!(pool.groups()[0].members(), &[1, 2]);
        assert_eq!(pool.groups()[0].centroid(), Vec2Fixed::from_ints(11, 10));
        assert_eq!(pool.groups()[0].power, 4);
        assert_eq!(pool.groups()[1].power, 4);
        let near = pool.nearest_group(Vec2Fixed::from_ints(70, 70)).unwrap();
        assert_eq!(near.members(), &[3]);
    }

    #[test]
    fn test_structure_memory() {
        let tech = tech();
        let mut pool = EnemyPool::default();
        let seen = Snapshot {
            units: vec![enemy(9, UnitTypeId::CommandCenter, 100, 100)],
            ..Snapshot::default()
        };
        pool.update(&seen, &tech);
        assert_eq!(pool.remembered_structures().count(), 1);

        // Out of sight and nobody nearby: still remembered.
        pool.update(&Snapshot::default(), &tech);
        assert_eq!(pool.remembered_structures().count(), 1);

        // An own unit at the spot that does not see it: forgotten.
        let checked = Snapshot {
            units: vec![UnitSnapshot::new(
                1,
                UnitTypeId::Zergling,
                Alliance::Own,
                Vec2Fixed::from_ints(103, 100),
            )],
            ..Snapshot::default()
        };
        pool.update(&checked, &tech);
        assert_eq!(pool.remembered_structures().count(), 0);
    }
}
