//! Resource patches and their fixed geographic clusters.

use std::collections::HashMap;

use tracing::{debug, info};

use super::cluster::greedy_clusters;
use super::{TagPool, Tracked};
use crate::math::{centroid, Fixed, Vec2Fixed};
use crate::snapshot::{Snapshot, Tag, UnitSnapshot};
use crate::unit_type::UnitTypeId;

/// Index of a resource cluster, stable for the episode.
pub type ClusterId = usize;

/// Maximum gap between patches of the same cluster.
pub const CLUSTER_THRESHOLD: i32 = 10;

/// Half-width of the grid searched for a cluster's base position.
const BASE_SEARCH_RADIUS: i32 = 10;

/// Minimum clearance between a townhall centre and any mineral patch.
const MIN_MINERAL_CLEARANCE: i32 = 6;

/// Minimum clearance between a townhall centre and any geyser.
const MIN_GEYSER_CLEARANCE: i32 = 7;

/// A mineral patch or vespene geyser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePatch {
    /// Patch tag.
    pub tag: Tag,
    /// Patch type.
    pub unit_type: UnitTypeId,
    /// Patch position.
    pub position: Vec2Fixed,
    /// Remaining minerals or vespene.
    pub contents: u32,
}

impl ResourcePatch {
    fn from_snapshot(unit: &UnitSnapshot) -> Self {
        let mut patch = Self {
            tag: unit.tag,
            unit_type: unit.unit_type,
            position: unit.position,
            contents: 0,
        };
        patch.refresh(unit);
        patch
    }

    /// Check if this is a mineral patch.
    #[must_use]
    pub fn is_mineral(&self) -> bool {
        self.unit_type.is_mineral()
    }
}

impl Tracked for ResourcePatch {
    fn refresh(&mut self, unit: &UnitSnapshot) {
        self.position = unit.position;
        self.contents = if unit.unit_type.is_mineral() {
            unit.mineral_contents
        } else {
            unit.vespene_contents
        };
    }
}

/// A geographically grouped set of patches forming one base territory.
///
/// Membership is fixed when the cluster is formed; patches that deplete
/// simply stop being live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceCluster {
    /// Cluster index.
    pub id: ClusterId,
    /// Mineral patch tags.
    pub minerals: Vec<Tag>,
    /// Geyser tags.
    pub geysers: Vec<Tag>,
    /// Mean position of the mineral patches.
    pub mineral_center: Vec2Fixed,
    /// Mean position of all patches.
    pub center: Vec2Fixed,
    /// Best townhall position, if one could be derived.
    pub base_position: Option<Vec2Fixed>,
}

impl ResourceCluster {
    /// Check if a resource tag belongs to this territory.
    #[must_use]
    pub fn contains(&self, tag: Tag) -> bool {
        self.minerals.contains(&tag) || self.geysers.contains(&tag)
    }

    /// Every resource tag in this territory.
    pub fn resource_tags(&self) -> impl Iterator<Item = Tag> + '_ {
        self.minerals.iter().chain(self.geysers.iter()).copied()
    }
}

/// Pool of visible resource patches plus the episode's cluster partition.
#[derive(Debug, Default)]
pub struct ResourcePool {
    patches: TagPool<ResourcePatch>,
    clusters: Vec<ResourceCluster>,
    cluster_of: HashMap<Tag, ClusterId>,
}

impl ResourcePool {
    /// Refresh patches; forms clusters the first time patches are seen.
    pub fn update(&mut self, snapshot: &Snapshot) {
        let depleted = self.patches.update(
            snapshot.neutral().filter(|u| u.unit_type.is_resource()),
            ResourcePatch::from_snapshot,
        );
        for (tag, _) in depleted {
            debug!(target: "swarm_core::pools", tag, "resource patch gone");
        }

        if self.clusters.is_empty() && !self.patches.is_empty() {
            self.form_clusters();
        }
    }

    fn form_clusters(&mut self) {
        let patches: Vec<&ResourcePatch> = self.patches.values().collect();
        let points: Vec<Vec2Fixed> = patches.iter().map(|p| p.position).collect();
        let groups = greedy_clusters(&points, Fixed::from_num(CLUSTER_THRESHOLD));

        let mut clusters = Vec::with_capacity(groups.len());
        for (id, group) in groups.into_iter().enumerate() {
            let members: Vec<&ResourcePatch> = group.iter().map(|&i| patches[i]).collect();
            let Some(cluster) = build_cluster(id, &members) else {
                continue;
            };
            for tag in cluster.resource_tags() {
                self.cluster_of.insert(tag, id);
            }
            clusters.push(cluster);
        }
        info!(
            target: "swarm_core::pools",
            clusters = clusters.len(),
            patches = points.len(),
            "resource clusters formed"
        );
        self.clusters = clusters;
    }

    /// All clusters.
    #[must_use]
    pub fn clusters(&self) -> &[ResourceCluster] {
        &self.clusters
    }

    /// Look up a cluster.
    #[must_use]
    pub fn cluster(&self, id: ClusterId) -> Option<&ResourceCluster> {
        self.clusters.get(id)
    }

    /// The cluster a resource tag was assigned to.
    #[must_use]
    pub fn cluster_of(&self, tag: Tag) -> Option<ClusterId> {
        self.cluster_of.get(&tag).copied()
    }

    /// Look up a live patch.
    #[must_use]
    pub fn patch(&self, tag: Tag) -> Option<&ResourcePatch> {
        self.patches.get(tag)
    }

    /// Check if a tag is a live mineral patch.
    #[must_use]
    pub fn is_mineral(&self, tag: Tag) -> bool {
        self.patches.get(tag).is_some_and(ResourcePatch::is_mineral)
    }

    /// Live mineral patches of a cluster.
    pub fn live_minerals(&self, id: ClusterId) -> impl Iterator<Item = &ResourcePatch> {
        self.clusters
            .get(id)
            .into_iter()
            .flat_map(|c| c.minerals.iter())
            .filter_map(|tag| self.patches.get(*tag))
    }

    /// Live geysers of a cluster.
    pub fn live_geysers(&self, id: ClusterId) -> impl Iterator<Item = &ResourcePatch> {
        self.clusters
            .get(id)
            .into_iter()
            .flat_map(|c| c.geysers.iter())
            .filter_map(|tag| self.patches.get(*tag))
    }

    /// Number of live patches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.patches.len()
    }

    /// Check if no patches are visible.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }
}

fn build_cluster(id: ClusterId, members: &[&ResourcePatch]) -> Option<ResourceCluster> {
    let mut minerals = Vec::new();
    let mut geysers = Vec::new();
    let mut mineral_points = Vec::new();
    let mut geyser_points = Vec::new();
    for patch in members {
        if patch.is_mineral() {
            minerals.push(patch.tag);
            mineral_points.push(patch.position);
        } else {
            geysers.push(patch.tag);
            geyser_points.push(patch.position);
        }
    }

    let center = centroid(members.iter().map(|p| p.position))?;
    let mineral_center = centroid(mineral_points.iter().copied()).unwrap_or(center);
    let base_position = ideal_base_position(&mineral_points, &geyser_points);

    Some(ResourceCluster {
        id,
        minerals,
        geysers,
        mineral_center,
        center,
        base_position,
    })
}

/// Grid-search the townhall position for a cluster.
///
/// Candidates lie on half-integer cell centres in a box around the mineral
/// centroid. A candidate is valid when it keeps clear of every mineral and
/// geyser; among valid candidates the one closest to the mean of all patches
/// wins. If nothing is valid, the candidate with the greatest clearance is
/// used. Returns `None` when there are no minerals.
#[must_use]
pub fn ideal_base_position(minerals: &[Vec2Fixed], geysers: &[Vec2Fixed]) -> Option<Vec2Fixed> {
    let mineral_center = centroid(minerals.iter().copied())?;
    let all_center = centroid(minerals.iter().chain(geysers.iter()).copied())?;
    let half = Fixed::from_num(1) / Fixed::from_num(2);
    let origin_x = mineral_center.x.floor();
    let origin_y = mineral_center.y.floor();

    let mineral_min = Fixed::from_num(MIN_MINERAL_CLEARANCE);
    let geyser_min = Fixed::from_num(MIN_GEYSER_CLEARANCE);

    let mut best_valid: Option<(Fixed, Vec2Fixed)> = None;
    let mut best_fallback: Option<(Fixed, Vec2Fixed)> = None;

    for dy in -BASE_SEARCH_RADIUS..=BASE_SEARCH_RADIUS {
        for dx in -BASE_SEARCH_RADIUS..=BASE_SEARCH_RADIUS {
            let candidate = Vec2Fixed::new(
                origin_x + Fixed::from_num(dx) + half,
                origin_y + Fixed::from_num(dy) + half,
            );
            let mineral_gap = min_distance(candidate, minerals);
            let geyser_gap = min_distance(candidate, geysers);

            if mineral_gap >= mineral_min && geyser_gap >= geyser_min {
                let score = candidate.distance_squared(all_center);
                if best_valid.map_or(true, |(s, _)| score < s) {
                    best_valid = Some((score, candidate));
                }
            } else {
                let clearance = mineral_gap.min(geyser_gap);
                if best_fallback.map_or(true, |(c, _)| clearance > c) {
                    best_fallback = Some((clearance, candidate));
                }
            }
        }
    }

    best_valid.or(best_fallback).map(|(_, pos)| pos)
}

fn min_distance(from: Vec2Fixed, points: &[Vec2Fixed]) -> Fixed {
    points
        .iter()
        .map(|p| from.distance(*p))
        .min()
        .unwrap_or(Fixed::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Alliance;

    fn mineral(tag: Tag, x: i32, y: i32) -> UnitSnapshot {
        let mut u = UnitSnapshot::new(
            tag,
            UnitTypeId::MineralField,
            Alliance::Neutral,
            Vec2Fixed::from_ints(x, y),
        );
        u.mineral_contents = 1800;
        u
    }

    fn geyser(tag: Tag, x: i32, y: i32) -> UnitSnapshot {
        let mut u = UnitSnapshot::new(
            tag,
            UnitTypeId::VespeneGeyser,
            Alliance::Neutral,
            Vec2Fixed::from_ints(x, y),
        );
        u.vespene_contents = 2250;
        u
    }

    /// Mineral line north of (cx, cy) with geysers on both flanks.
    fn base_layout(first_tag: Tag, cx: i32, cy: i32) -> Vec<UnitSnapshot> {
        let mut units: Vec<_> = (0..8)
            .map(|i| mineral(first_tag + i as u64, cx - 4 + i, cy + 7 + (i % 2)))
            .collect();
        units.push(geyser(first_tag + 8, cx - 7, cy + 3));
        units.push(geyser(first_tag + 9, cx + 7, cy + 3));
        units
    }

    #[test]
    fn test_two_bases_form_two_clusters() {
        let mut units = base_layout(100, 30, 30);
        units.extend(base_layout(200, 90, 90));
        let snapshot = Snapshot {
            units,
            ..Snapshot::default()
        };
        let mut pool = ResourcePool::default();
        pool.update(&snapshot);

        assert_eq!(pool.clusters().len(), 2);
        let a = pool.cluster_of(100).unwrap();
        let b = pool.cluster_of(200).unwrap();
        assert_ne!(a, b);
        assert_eq!(pool.cluster(a).unwrap().minerals.len(), 8);
        assert_eq!(pool.cluster(a).unwrap().geysers.len(), 2);
        assert_eq!(pool.cluster_of(109), Some(a));
    }

    #[test]
    fn test_base_position_clears_patches() {
        let units = base_layout(1, 50, 50);
        let minerals: Vec<_> = units
            .iter()
            .filter(|u| u.unit_type.is_mineral())
            .map(|u| u.position)
            .collect();
        let geysers: Vec<_> = units
            .iter()
            .filter(|u| u.unit_type.is_geyser())
            .map(|u| u.position)
            .collect();
        let pos = ideal_base_position(&minerals, &geysers).unwrap();

        for m in &minerals {
            assert!(pos.distance(*m) >= Fixed::from_num(MIN_MINERAL_CLEARANCE));
        }
        for g in &geysers {
            assert!(pos.distance(*g) >= Fixed::from_num(MIN_GEYSER_CLEARANCE));
        }
        // The townhall sits on the open side of the mineral line.
        assert!(pos.y < Fixed::from_num(57));
    }

    #[test]
    fn test_base_position_degenerate() {
        assert_eq!(ideal_base_position(&[], &[Vec2Fixed::ZERO]), None);
    }

    #[test]
    fn test_clusters_fixed_after_depletion() {
        let snapshot = Snapshot {
            units: base_layout(1, 30, 30),
            ..Snapshot::default()
        };
        let mut pool = ResourcePool::default();
        pool.update(&snapshot);
        let before = pool.clusters().to_vec();

        let mut thinner = snapshot.clone();
        thinner.units.retain(|u| u.tag != 1);
        pool.update(&thinner);

        assert_eq!(pool.clusters(), &before[..]);
        assert!(pool.patch(1).is_none());
        assert_eq!(pool.live_minerals(0).count(), 7);
    }
}
