//! Own bases and their resource territories.
//!
//! A base is a townhall plus the resource cluster it claimed on creation.
//! Claims are exclusive and last until the townhall disappears. Membership
//! sets (workers, larva, queens, extractors) are recomputed every tick after
//! the sweep.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use tracing::info;

use super::{ClusterId, ResourcePatch, ResourcePool, StructurePool, TagPool, Tracked, WorkerPool};
use crate::error::{AgentError, Result};
use crate::math::{Fixed, Vec2Fixed};
use crate::snapshot::{MapInfo, Snapshot, Tag, UnitSnapshot};
use crate::unit_type::UnitTypeId;

/// A townhall further than this from every free cluster claims none.
pub const MAX_CLAIM_DISTANCE: i32 = 15;

/// Workers not harvesting belong to a base within this radius.
const WORKER_RADIUS: i32 = 15;

/// Larva spawn right next to their hatchery.
const LARVA_RADIUS: i32 = 5;

/// Queens within this radius serve the base.
const QUEEN_RADIUS: i32 = 12;

/// An owned base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Base {
    /// The townhall record.
    pub townhall: UnitSnapshot,
    /// The claimed territory, `None` for a macro hatchery.
    pub cluster: Option<ClusterId>,
    /// Workers belonging to this base.
    pub workers: BTreeSet<Tag>,
    /// Larva at this townhall.
    pub larva: BTreeSet<Tag>,
    /// Queens serving this base.
    pub queens: BTreeSet<Tag>,
    /// Own gas buildings on this territory's geysers.
    pub extractors: BTreeSet<Tag>,
}

impl Base {
    fn new(townhall: &UnitSnapshot, cluster: Option<ClusterId>) -> Self {
        Self {
            townhall: townhall.clone(),
            cluster,
            workers: BTreeSet::new(),
            larva: BTreeSet::new(),
            queens: BTreeSet::new(),
            extractors: BTreeSet::new(),
        }
    }

    /// Townhall tag, which is also the base identity.
    #[must_use]
    pub fn tag(&self) -> Tag {
        self.townhall.tag
    }

    /// Townhall position.
    #[must_use]
    pub fn position(&self) -> Vec2Fixed {
        self.townhall.position
    }

    /// Check if the townhall has finished building.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.townhall.is_ready()
    }

    /// Ideal minus assigned mineral harvesters.
    #[must_use]
    pub fn mineral_deficit(&self) -> i64 {
        i64::from(self.townhall.ideal_harvesters) - i64::from(self.townhall.assigned_harvesters)
    }

    /// Geysers in this territory with no gas building on them yet.
    #[must_use]
    pub fn free_geysers<'a>(
        &self,
        resources: &'a ResourcePool,
        structures: &StructurePool,
    ) -> Vec<&'a ResourcePatch> {
        let Some(cluster) = self.cluster else {
            return Vec::new();
        };
        resources
            .live_geysers(cluster)
            .filter(|geyser| {
                !structures
                    .iter()
                    .any(|s| s.unit_type.is_gas_building() && on_geyser(s.position, geyser.position))
            })
            .collect()
    }
}

impl Tracked for Base {
    fn refresh(&mut self, unit: &UnitSnapshot) {
        self.townhall.clone_from(unit);
    }
}

fn on_geyser(building: Vec2Fixed, geyser: Vec2Fixed) -> bool {
    building.is_within(geyser, Fixed::from_num(1))
}

/// Pool of own bases.
#[derive(Debug, Default)]
pub struct BasePool {
    bases: TagPool<Base>,
    claims: BTreeMap<ClusterId, Tag>,
    start: Vec2Fixed,
    enemy_start: Vec2Fixed,
}

impl BasePool {
    /// Refresh bases, settle cluster claims and recompute membership.
    ///
    /// Fails if a resource ends up in two territories.
    pub fn update(
        &mut self,
        snapshot: &Snapshot,
        map: &MapInfo,
        resources: &ResourcePool,
        workers: &mut WorkerPool,
    ) -> Result<()> {
        self.start = map.start_location;
        self.enemy_start = map.enemy_start();

        self.bases.mark_unseen();
        let mut fresh = Vec::new();
        for townhall in snapshot.own().filter(|u| u.unit_type.is_townhall()) {
            if !self.bases.observe_existing(townhall) {
                fresh.push(townhall);
            }
        }
        // Release lost claims before new townhalls pick theirs.
        for (tag, base) in self.bases.sweep() {
            if let Some(cluster) = base.cluster {
                self.claims.remove(&cluster);
            }
            info!(target: "swarm_core::pools", tag, "base lost");
        }
        for townhall in fresh {
            let cluster = self.claim_nearest(townhall, resources);
            info!(
                target: "swarm_core::pools",
                tag = townhall.tag,
                ?cluster,
                "base established"
            );
            self.bases.insert(townhall.tag, Base::new(townhall, cluster));
        }

        self.assign_members(snapshot, resources, workers);
        self.check_territories(resources)
    }

    fn claim_nearest(&mut self, townhall: &UnitSnapshot, resources: &ResourcePool) -> Option<ClusterId> {
        let limit = Fixed::from_num(MAX_CLAIM_DISTANCE);
        let (id, _) = resources
            .clusters()
            .iter()
            .filter(|c| !self.claims.contains_key(&c.id))
            .map(|c| {
                let anchor = c.base_position.unwrap_or(c.center);
                (c.id, anchor.distance_squared(townhall.position))
            })
            .filter(|(_, d)| *d <= limit * limit)
            .min_by_key(|(id, d)| (*d, *id))?;
        self.claims.insert(id, townhall.tag);
        Some(id)
    }

    fn assign_members(
        &mut self,
        snapshot: &Snapshot,
        resources: &ResourcePool,
        workers: &mut WorkerPool,
    ) {
        for (_, base) in self.bases.iter_mut() {
            base.workers.clear();
            base.larva.clear();
            base.queens.clear();
            base.extractors.clear();
        }

        // Extractors first: gas harvesters are matched through them.
        let mut extractor_base: BTreeMap<Tag, Tag> = BTreeMap::new();
        for building in snapshot.own().filter(|u| u.unit_type.is_gas_building()) {
            let Some(owner) = self.bases.values().find(|b| {
                b.cluster.is_some_and(|c| {
                    resources
                        .live_geysers(c)
                        .any(|g| on_geyser(building.position, g.position))
                })
            }) else {
                continue;
            };
            extractor_base.insert(building.tag, owner.tag());
        }
        for (extractor, base) in &extractor_base {
            if let Some(base) = self.bases.get_mut(*base) {
                base.extractors.insert(*extractor);
            }
        }

        let worker_radius = Fixed::from_num(WORKER_RADIUS);
        for worker in workers.values_mut() {
            let by_harvest = worker.state.harvest_target().and_then(|target| {
                if let Some(base) = extractor_base.get(&target) {
                    return Some(*base);
                }
                resources
                    .cluster_of(target)
                    .and_then(|c| self.claims.get(&c).copied())
            });
            let owner = by_harvest.or_else(|| {
                self.nearest_within(worker.unit.position, worker_radius)
                    .map(Base::tag)
            });
            worker.base = owner;
            if let Some(base) = owner.and_then(|t| self.bases.get_mut(t)) {
                base.workers.insert(worker.unit.tag);
            }
        }

        let larva_radius = Fixed::from_num(LARVA_RADIUS);
        let queen_radius = Fixed::from_num(QUEEN_RADIUS);
        for unit in snapshot.own() {
            let radius = match unit.unit_type {
                UnitTypeId::Larva => larva_radius,
                UnitTypeId::Queen => queen_radius,
                _ => continue,
            };
            let Some(owner) = self.nearest_within(unit.position, radius).map(Base::tag) else {
                continue;
            };
            if let Some(base) = self.bases.get_mut(owner) {
                if unit.unit_type == UnitTypeId::Larva {
                    base.larva.insert(unit.tag);
                } else {
                    base.queens.insert(unit.tag);
                }
            }
        }
    }

    fn check_territories(&self, resources: &ResourcePool) -> Result<()> {
        let mut claimed = HashSet::new();
        let mut seen = HashSet::new();
        for base in self.bases.values() {
            let Some(id) = base.cluster else {
                continue;
            };
            if !claimed.insert(id) {
                return Err(AgentError::InvariantViolation(format!(
                    "cluster {id} claimed by more than one base"
                )));
            }
            let Some(cluster) = resources.cluster(id) else {
                return Err(AgentError::InvariantViolation(format!(
                    "base {} claims unknown cluster {id}",
                    base.tag()
                )));
            };
            for tag in cluster.resource_tags() {
                if !seen.insert(tag) {
                    return Err(AgentError::InvariantViolation(format!(
                        "resource {tag} belongs to two territories"
                    )));
                }
            }
        }
        Ok(())
    }

    fn nearest_within(&self, pos: Vec2Fixed, radius: Fixed) -> Option<&Base> {
        self.bases
            .values()
            .filter(|b| b.position().is_within(pos, radius))
            .min_by_key(|b| b.position().distance_squared(pos))
    }

    /// Look up a base by townhall tag.
    #[must_use]
    pub fn get(&self, tag: Tag) -> Option<&Base> {
        self.bases.get(tag)
    }

    /// Iterate bases in tag order.
    pub fn iter(&self) -> impl Iterator<Item = &Base> {
        self.bases.values()
    }

    /// The base owning a cluster.
    #[must_use]
    pub fn owner_of(&self, cluster: ClusterId) -> Option<Tag> {
        self.claims.get(&cluster).copied()
    }

    /// Base closest to `pos`.
    #[must_use]
    pub fn nearest(&self, pos: Vec2Fixed) -> Option<&Base> {
        self.bases
            .values()
            .min_by_key(|b| b.position().distance_squared(pos))
    }

    /// Base closest to the start location.
    #[must_use]
    pub fn main_base(&self) -> Option<&Base> {
        self.nearest(self.start)
    }

    /// Base closest to the enemy start location.
    #[must_use]
    pub fn forward_base(&self) -> Option<&Base> {
        self.nearest(self.enemy_start)
    }

    /// Agent start location as of the last update.
    #[must_use]
    pub const fn start(&self) -> Vec2Fixed {
        self.start
    }

    /// Number of finished or unfinished bases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bases.len()
    }

    /// Check if the agent owns no base.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bases.is_empty()
    }
}
