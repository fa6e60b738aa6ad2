//! Scouting.
//!
//! Overlords watch fixed points (own natural, map centre, enemy natural),
//! one overlord per point. Once the army has more zerglings than it needs,
//! one zergling tours the expansion sites nearest the enemy in a loop.
//!
//! Enlisting mutates the scout pool and happens before the tick context is
//! built; movement orders go through the context like everything else.

use tracing::{debug, info};

use crate::command::{Command, Target};
use crate::context::TickContext;
use crate::math::{Fixed, Vec2Fixed};
use crate::pools::{CombatState, Pools, ScoutTask};
use crate::snapshot::MapInfo;
use crate::unit_type::{AbilityId, UnitTypeId};

/// Zerglings the army keeps before one is spared for scouting.
pub const ARMY_ZERGLINGS: usize = 4;

/// A scout this close to its destination has arrived.
const SCOUT_ARRIVAL: i32 = 3;

/// Expansion sites on the zergling route.
const ROUTE_LENGTH: usize = 5;

/// Assigns and drives scouts.
#[derive(Debug, Default)]
pub struct ScoutingManager {
    watch_points: Option<Vec<Vec2Fixed>>,
}

impl ScoutingManager {
    /// Create a manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Watch-points, once resource clusters are known.
    #[must_use]
    pub fn watch_points(&self) -> &[Vec2Fixed] {
        self.watch_points.as_deref().unwrap_or_default()
    }

    /// Enlist new scouts and advance expansion routes.
    pub fn assign(&mut self, pools: &mut Pools, map: &MapInfo) {
        if self.watch_points.is_none() && !pools.resources.clusters().is_empty() {
            let points = watch_points(pools, map);
            debug!(target: "swarm_core::scouting", ?points, "watch-points");
            self.watch_points = Some(points);
        }

        self.enlist_overlords(pools);
        enlist_zergling(pools, map);
        advance_routes(pools);
    }

    fn enlist_overlords(&self, pools: &mut Pools) {
        for point in self.watch_points() {
            let watched = pools
                .scouts
                .iter()
                .any(|s| s.task == ScoutTask::Watch(*point));
            if watched {
                continue;
            }
            let scouts = &pools.scouts;
            let Some(overlord) = pools
                .own_units(UnitTypeId::Overlord)
                .filter(|o| !scouts.contains(o.tag))
                .min_by_key(|o| (o.position.distance_squared(*point), o.tag))
                .cloned()
            else {
                return;
            };
            if pools.scouts.enlist(&overlord, ScoutTask::Watch(*point)) {
                info!(target: "swarm_core::scouting", tag = overlord.tag, ?point, "overlord watching");
            }
        }
    }

    /// Move scouts that are not already heading to their destination.
    pub fn run(&self, ctx: &mut TickContext<'_>) {
        let pools = ctx.pools;
        let arrival = Fixed::from_num(SCOUT_ARRIVAL);
        for scout in pools.scouts.iter() {
            let tag = scout.unit.tag;
            if ctx.is_claimed(tag) {
                continue;
            }
            ctx.reserve(tag);
            let Some(dest) = scout.task.destination() else {
                continue;
            };
            let heading = scout
                .unit
                .current_order()
                .is_some_and(|o| o.ability == AbilityId::Move && o.target == Target::Position(dest));
            if heading || scout.unit.position.is_within(dest, arrival) {
                continue;
            }
            ctx.issue(Command::move_to(tag, dest));
        }
    }
}

/// Own natural, map centre and enemy natural.
fn watch_points(pools: &Pools, map: &MapInfo) -> Vec<Vec2Fixed> {
    let mut points = Vec::new();
    if let Some(natural) = natural_of(pools, map.start_location) {
        points.push(natural);
    }
    points.push(map.center());
    if let Some(natural) = natural_of(pools, map.enemy_start()) {
        points.push(natural);
    }
    points
}

/// Second-closest townhall spot to `start`; the closest is the main.
fn natural_of(pools: &Pools, start: Vec2Fixed) -> Option<Vec2Fixed> {
    let mut sites: Vec<Vec2Fixed> = pools
        .resources
        .clusters()
        .iter()
        .filter_map(|c| c.base_position)
        .collect();
    sites.sort_by_key(|p| p.distance_squared(start));
    sites.get(1).copied()
}

fn enlist_zergling(pools: &mut Pools, map: &MapInfo) {
    let touring = pools
        .scouts
        .iter()
        .any(|s| matches!(s.task, ScoutTask::ScoutExpansions { .. }));
    if touring || pools.army.count(UnitTypeId::Zergling) <= ARMY_ZERGLINGS {
        return;
    }

    let enemy = map.enemy_start();
    let mut route: Vec<Vec2Fixed> = pools
        .resources
        .clusters()
        .iter()
        .filter(|c| pools.bases.owner_of(c.id).is_none())
        .filter_map(|c| c.base_position)
        .collect();
    route.sort_by_key(|p| p.distance_squared(enemy));
    route.truncate(ROUTE_LENGTH);
    if route.is_empty() {
        return;
    }

    let scouts = &pools.scouts;
    let Some(zergling) = pools
        .army
        .iter()
        .filter(|c| c.unit.unit_type == UnitTypeId::Zergling && !scouts.contains(c.unit.tag))
        .min_by_key(|c| (c.state != CombatState::Unassigned, c.unit.tag))
        .map(|c| c.unit.clone())
    else {
        return;
    };
    if pools
        .scouts
        .enlist(&zergling, ScoutTask::ScoutExpansions { route, next: 0 })
    {
        info!(target: "swarm_core::scouting", tag = zergling.tag, "zergling touring expansions");
    }
}

fn advance_routes(pools: &mut Pools) {
    let arrival = Fixed::from_num(SCOUT_ARRIVAL);
    let arrived: Vec<u64> = pools
        .scouts
        .iter()
        .filter(|s| matches!(s.task, ScoutTask::ScoutExpansions { .. }))
        .filter(|s| {
            s.task
                .destination()
                .is_some_and(|d| s.unit.position.is_within(d, arrival))
        })
        .map(|s| s.unit.tag)
        .collect();
    for tag in arrived {
        if let Some(scout) = pools.scouts.get_mut(tag) {
            scout.task.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TechTree;
    use crate::snapshot::{Alliance, Snapshot, UnitSnapshot};

    fn map() -> MapInfo {
        MapInfo::open(
            100,
            100,
            Vec2Fixed::from_ints(20, 20),
            Vec2Fixed::from_ints(80, 80),
        )
    }

    #[test]
    fn test_one_overlord_per_point() {
        let map = map();
        let snapshot = Snapshot {
            units: vec![
                UnitSnapshot::new(1, UnitTypeId::Overlord, Alliance::Own, Vec2Fixed::from_ints(20, 20)),
                UnitSnapshot::new(2, UnitTypeId::Overlord, Alliance::Own, Vec2Fixed::from_ints(22, 20)),
            ],
            ..Snapshot::default()
        };
        let mut pools = Pools::default();
        pools.update(&snapshot, &map, &TechTree::default()).unwrap();

        let mut manager = ScoutingManager {
            watch_points: Some(vec![map.center(), Vec2Fixed::from_ints(70, 70), Vec2Fixed::from_ints(30, 30)]),
        };
        manager.assign(&mut pools, &map);
        manager.assign(&mut pools, &map);

        // Two overlords, three points: each overlord holds exactly one.
        assert_eq!(pools.scouts.len(), 2);
        let tasks: Vec<_> = pools.scouts.iter().map(|s| s.task.clone()).collect();
        assert_ne!(tasks[0], tasks[1]);
    }

    #[test]
    fn test_zergling_waits_for_army_needs() {
        let map = map();
        let lings = |n: u64| Snapshot {
            units: (1..=n)
                .map(|t| UnitSnapshot::new(t, UnitTypeId::Zergling, Alliance::Own, Vec2Fixed::from_ints(20, 20)))
                .collect(),
            ..Snapshot::default()
        };
        let mut pools = Pools::default();
        pools.update(&lings(4), &map, &TechTree::default()).unwrap();
        enlist_zergling(&mut pools, &map);
        assert!(pools.scouts.is_empty());
    }
}
