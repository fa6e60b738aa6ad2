//! Entity Pool Layer.
//!
//! Each pool turns the raw per-tick entity list into a stable, queryable
//! collection keyed by tag. Identity continuity uses mark-and-sweep:
//!
//! 1. every known member is marked unseen,
//! 2. live entities are re-matched by tag, refreshed and unmarked,
//! 3. anything still marked is removed.
//!
//! Derived sets (base membership, enemy groups) are recomputed after the
//! sweep. Pools iterate in tag order so every downstream decision is
//! deterministic.

mod army;
mod base;
pub mod cluster;
mod enemy;
mod resource;
mod scout;
mod structure;
mod worker;

use std::collections::BTreeMap;

use tracing::trace;

use crate::data::{ProductionTarget, TechTree};
use crate::error::Result;
use crate::snapshot::{MapInfo, Snapshot, Tag, UnitSnapshot};
use crate::unit_type::{AbilityId, UnitTypeId};

pub use army::{ArmyPool, CombatState, CombatUnit};
pub use base::{Base, BasePool};
pub use enemy::{EnemyGroup, EnemyPool, EnemyUnit, RememberedStructure};
pub use resource::{ClusterId, ResourceCluster, ResourcePatch, ResourcePool};
pub use scout::{Scout, ScoutPool, ScoutTask};
pub use structure::StructurePool;
pub use worker::{Worker, WorkerPool, WorkerState};

/// A pool member that can be refreshed from a snapshot record.
pub trait Tracked {
    /// Copy the latest attributes from the snapshot.
    fn refresh(&mut self, unit: &UnitSnapshot);
}

#[derive(Debug, Clone)]
struct Slot<T> {
    item: T,
    seen: bool,
}

/// Tag-keyed collection with mark-and-sweep identity continuity.
#[derive(Debug, Clone)]
pub struct TagPool<T> {
    slots: BTreeMap<Tag, Slot<T>>,
}

impl<T> Default for TagPool<T> {
    fn default() -> Self {
        Self {
            slots: BTreeMap::new(),
        }
    }
}

impl<T: Tracked> TagPool<T> {
    /// Create an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark every member unseen.
    pub fn mark_unseen(&mut self) {
        for slot in self.slots.values_mut() {
            slot.seen = false;
        }
    }

    /// Re-match a live entity: refresh it if known, otherwise create it.
    pub fn observe(&mut self, unit: &UnitSnapshot, create: impl FnOnce(&UnitSnapshot) -> T) {
        match self.slots.get_mut(&unit.tag) {
            Some(slot) => {
                slot.item.refresh(unit);
                slot.seen = true;
            }
            None => {
                self.slots.insert(
                    unit.tag,
                    Slot {
                        item: create(unit),
                        seen: true,
                    },
                );
            }
        }
    }

    /// Refresh a member if it is already known; never creates.
    ///
    /// Returns `true` if the tag was a member.
    pub fn observe_existing(&mut self, unit: &UnitSnapshot) -> bool {
        match self.slots.get_mut(&unit.tag) {
            Some(slot) => {
                slot.item.refresh(unit);
                slot.seen = true;
                true
            }
            None => false,
        }
    }

    /// Remove every member still marked unseen and return them.
    pub fn sweep(&mut self) -> Vec<(Tag, T)> {
        let gone: Vec<Tag> = self
            .slots
            .iter()
            .filter(|(_, slot)| !slot.seen)
            .map(|(tag, _)| *tag)
            .collect();
        let mut removed = Vec::with_capacity(gone.len());
        for tag in gone {
            if let Some(slot) = self.slots.remove(&tag) {
                trace!(tag, "swept from pool");
                removed.push((tag, slot.item));
            }
        }
        removed
    }

    /// Run the full mark, match and sweep protocol over `units`.
    pub fn update<'a, I, F>(&mut self, units: I, mut create: F) -> Vec<(Tag, T)>
    where
        I: IntoIterator<Item = &'a UnitSnapshot>,
        F: FnMut(&UnitSnapshot) -> T,
    {
        self.mark_unseen();
        for unit in units {
            self.observe(unit, &mut create);
        }
        self.sweep()
    }
}

impl<T> TagPool<T> {
    /// Look up a member.
    #[must_use]
    pub fn get(&self, tag: Tag) -> Option<&T> {
        self.slots.get(&tag).map(|s| &s.item)
    }

    /// Look up a member mutably.
    pub fn get_mut(&mut self, tag: Tag) -> Option<&mut T> {
        self.slots.get_mut(&tag).map(|s| &mut s.item)
    }

    /// Check membership.
    #[must_use]
    pub fn contains(&self, tag: Tag) -> bool {
        self.slots.contains_key(&tag)
    }

    /// Insert a member directly (marked seen).
    pub fn insert(&mut self, tag: Tag, item: T) {
        self.slots.insert(tag, Slot { item, seen: true });
    }

    /// Remove a member.
    pub fn remove(&mut self, tag: Tag) -> Option<T> {
        self.slots.remove(&tag).map(|s| s.item)
    }

    /// Iterate members in tag order.
    pub fn iter(&self) -> impl Iterator<Item = (Tag, &T)> {
        self.slots.iter().map(|(tag, slot)| (*tag, &slot.item))
    }

    /// Iterate members mutably in tag order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Tag, &mut T)> {
        self.slots.iter_mut().map(|(tag, slot)| (*tag, &mut slot.item))
    }

    /// Iterate member values in tag order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.slots.values().map(|s| &s.item)
    }

    /// Member tags in order.
    pub fn tags(&self) -> impl Iterator<Item = Tag> + '_ {
        self.slots.keys().copied()
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if the pool is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// All pools, refreshed together once per tick.
#[derive(Debug, Default)]
pub struct Pools {
    /// Mineral patches, geysers and their clusters.
    pub resources: ResourcePool,
    /// Own bases and their territories.
    pub bases: BasePool,
    /// Own workers.
    pub workers: WorkerPool,
    /// Own combat units.
    pub army: ArmyPool,
    /// Own structures, including those under construction.
    pub structures: StructurePool,
    /// Visible enemy units and remembered enemy structures.
    pub enemies: EnemyPool,
    /// Units currently enlisted as scouts.
    pub scouts: ScoutPool,
    /// Own non-structure units not covered by a more specific pool.
    pub others: BTreeMap<Tag, UnitSnapshot>,
}

impl Pools {
    /// Create empty pools.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Refresh every pool from a snapshot.
    ///
    /// Fails only when the base territory invariant is broken.
    pub fn update(&mut self, snapshot: &Snapshot, map: &MapInfo, tech: &TechTree) -> Result<()> {
        self.resources.update(snapshot);
        self.structures.update(snapshot);
        self.workers.update(snapshot, &self.resources);
        self.army.update(snapshot);
        self.enemies.update(snapshot, tech);
        self.scouts.update(snapshot);
        self.others = snapshot
            .own()
            .filter(|u| !u.is_structure && !u.unit_type.is_worker() && !u.unit_type.is_army())
            .map(|u| (u.tag, u.clone()))
            .collect();
        self.bases
            .update(snapshot, map, &self.resources, &mut self.workers)?;
        Ok(())
    }

    /// Own units of a type that are not structures (larva, queens, overlords, eggs).
    pub fn own_units(&self, unit_type: UnitTypeId) -> impl Iterator<Item = &UnitSnapshot> {
        self.others
            .values()
            .filter(move |u| u.unit_type == unit_type)
    }

    /// Count of own entities of exactly this type, finished or not.
    #[must_use]
    pub fn count(&self, unit_type: UnitTypeId) -> usize {
        if unit_type.is_worker() {
            return self.workers.len();
        }
        if unit_type.is_army() {
            return self.army.count(unit_type);
        }
        if unit_type.is_structure() {
            return self.structures.count(unit_type);
        }
        self.own_units(unit_type).count()
    }

    /// Check if a finished entity satisfying `required` exists.
    #[must_use]
    pub fn has_completed(&self, required: UnitTypeId) -> bool {
        if required.is_structure() {
            return self.structures.has_completed(required);
        }
        if required == UnitTypeId::Larva {
            return self.own_units(UnitTypeId::Larva).next().is_some();
        }
        self.count(required) > 0
    }

    /// Number of `target` currently being produced, as visible in orders,
    /// eggs and unfinished structures.
    #[must_use]
    pub fn in_progress(&self, target: ProductionTarget) -> usize {
        match target {
            ProductionTarget::Upgrade(upgrade) => self
                .structures
                .iter()
                .filter(|s| s.has_order(AbilityId::Research(upgrade)))
                .count(),
            ProductionTarget::Unit(unit_type) => {
                let eggs = self
                    .own_units(UnitTypeId::Egg)
                    .filter(|egg| egg.has_order(AbilityId::Train(unit_type)))
                    .count();
                let trainers = self
                    .structures
                    .iter()
                    .filter(|s| s.has_order(AbilityId::Train(unit_type)))
                    .count();
                let morphs = self
                    .structures
                    .iter()
                    .chain(self.army.iter().map(|c| &c.unit))
                    .chain(self.others.values())
                    .filter(|s| s.has_order(AbilityId::Morph(unit_type)))
                    .count();
                let builders = self
                    .workers
                    .values()
                    .filter(|w| w.unit.has_order(AbilityId::Build(unit_type)))
                    .count();
                let unfinished = self
                    .structures
                    .iter()
                    .filter(|s| s.unit_type == unit_type && !s.is_ready())
                    .count();
                eggs + trainers + morphs + builders + unfinished
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec2Fixed;
    use crate::snapshot::Alliance;

    #[derive(Debug, Clone, PartialEq)]
    struct Probe {
        health: u32,
        refreshes: u32,
    }

    impl Tracked for Probe {
        fn refresh(&mut self, unit: &UnitSnapshot) {
            self.health = unit.health;
            self.refreshes += 1;
        }
    }

    fn unit(tag: Tag, health: u32) -> UnitSnapshot {
        let mut u = UnitSnapshot::new(tag, UnitTypeId::Drone, Alliance::Own, Vec2Fixed::ZERO);
        u.health = health;
        u
    }

    fn create(u: &UnitSnapshot) -> Probe {
        Probe {
            health: u.health,
            refreshes: 0,
        }
    }

    #[test]
    fn test_mark_and_sweep() {
        let mut pool = TagPool::new();
        let removed = pool.update(&[unit(1, 40), unit(2, 40)], create);
        assert!(removed.is_empty());
        assert_eq!(pool.len(), 2);

        // Tag 1 persists with new health, tag 2 disappears.
        let removed = pool.update(&[unit(1, 25)], create);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].0, 2);
        assert_eq!(pool.get(1).unwrap().health, 25);
        assert_eq!(pool.get(1).unwrap().refreshes, 1);
        assert!(!pool.contains(2));
    }

    #[test]
    fn test_reappearing_tag_is_new_identity() {
        let mut pool = TagPool::new();
        pool.update(&[unit(7, 40)], create);
        pool.update(std::iter::empty::<&UnitSnapshot>(), create);
        pool.update(&[unit(7, 30)], create);
        assert_eq!(pool.get(7).unwrap().refreshes, 0);
    }

    #[test]
    fn test_observe_existing_never_creates() {
        let mut pool: TagPool<Probe> = TagPool::new();
        assert!(!pool.observe_existing(&unit(3, 10)));
        assert!(pool.is_empty());
    }

    #[test]
    fn test_iteration_in_tag_order() {
        let mut pool = TagPool::new();
        pool.update(&[unit(9, 1), unit(2, 1), unit(5, 1)], create);
        let tags: Vec<_> = pool.tags().collect();
        assert_eq!(tags, vec![2, 5, 9]);
    }

    mod continuity {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // For any sequence of snapshots, a pool entry mirrors the latest
            // snapshot value and is gone exactly when its tag stops appearing.
            #[test]
            fn prop_identity_continuity(
                frames in proptest::collection::vec(
                    proptest::collection::btree_map(0u64..12, 1u32..200, 0..8),
                    1..10,
                ),
            ) {
                let mut pool = TagPool::new();
                for frame in &frames {
                    let units: Vec<_> = frame.iter().map(|(t, h)| unit(*t, *h)).collect();
                    pool.update(&units, create);
                    prop_assert_eq!(pool.len(), frame.len());
                    for (tag, health) in frame {
                        prop_assert_eq!(pool.get(*tag).map(|p| p.health), Some(*health));
                    }
                }
            }
        }
    }
}
