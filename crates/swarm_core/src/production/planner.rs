//! Production planner state machine.
//!
//! ```text
//! ON_START ──► PLANNING ──► CUT-IN ──► EXECUTING ──┐
//!                 ▲                                 │
//!                 └─────────────────────────────────┘
//! ```
//!
//! Every tick walks the loop once. Planning refills an empty queue from the
//! strategy's goal generator. Cut-in runs the fixed-order checks (supply,
//! expansion, gas, then the dependency-deadlock loop). Executing emits at
//! most one intent for the queue head, and pops it only on success.

use tracing::{debug, info, warn};

use super::goals::{self, ProductionStrategy};
use super::queue::{BuildOrderQueue, CutInReason};
use crate::channels::{Intent, ProductionIntent};
use crate::context::TickContext;
use crate::data::{Cost, ProductionKind, ProductionTarget, TechEntry};
use crate::economy::HarvestPriority;
use crate::math::{Fixed, Vec2Fixed};
use crate::pools::{Base, Worker, WorkerState};
use crate::snapshot::Snapshot;
use crate::unit_type::UnitTypeId;

/// Game loops an emitted intent counts as in progress before the snapshot
/// shows it.
pub const PENDING_GRACE: u32 = 32;

/// Default stall limit: about three game minutes.
pub const DEFAULT_STALL_LIMIT: u32 = 4032;

/// Supply cap of the game.
const MAX_SUPPLY: u32 = 200;

/// Bound on chained prerequisite cut-ins per tick.
const MAX_CUT_IN_DEPTH: usize = 10;

/// Expansion sites this close to an enemy start are skipped.
const ENEMY_START_CLEARANCE: i32 = 20;

/// Minerals above which a gas shortfall flips the harvest priority.
const GAS_SIGNAL_MINERAL_FLOOR: u32 = 300;

/// Lifecycle of the planner within a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerState {
    /// Opening not loaded yet.
    OnStart,
    /// Refilling the queue.
    Planning,
    /// Running cut-in checks.
    CutIn,
    /// Trying to execute the head item.
    Executing,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    target: ProductionTarget,
    until: u32,
}

/// The production planner.
#[derive(Debug)]
pub struct ProductionPlanner {
    strategy: ProductionStrategy,
    state: PlannerState,
    queue: BuildOrderQueue,
    pending: Vec<Pending>,
    stall_limit: Option<u32>,
    /// Head blocked on a prerequisite, and the loop it was first seen blocked.
    head_since: Option<(ProductionTarget, u32)>,
}

impl ProductionPlanner {
    /// Create a planner. `stall_limit` of `None` waits on a blocked head forever.
    #[must_use]
    pub fn new(strategy: ProductionStrategy, stall_limit: Option<u32>) -> Self {
        Self {
            strategy,
            state: PlannerState::OnStart,
            queue: BuildOrderQueue::new(),
            pending: Vec::new(),
            stall_limit,
            head_since: None,
        }
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> PlannerState {
        self.state
    }

    /// The build-order queue.
    #[must_use]
    pub fn queue(&self) -> &BuildOrderQueue {
        &self.queue
    }

    /// Mutable access to the queue, for seeding scenarios.
    pub fn queue_mut(&mut self) -> &mut BuildOrderQueue {
        &mut self.queue
    }

    /// Skip the opening and start from whatever is queued.
    pub fn skip_opening(&mut self) {
        self.state = PlannerState::Planning;
    }

    /// Put back an item whose intent could not be carried out.
    pub fn requeue(&mut self, target: ProductionTarget) {
        self.pending.retain(|p| p.target != target);
        self.queue.push_front(target);
    }

    /// Run one pass of the state machine.
    pub fn tick(&mut self, ctx: &mut TickContext<'_>) {
        let game_loop = ctx.snapshot.game_loop;
        self.pending.retain(|p| p.until > game_loop);

        if self.state == PlannerState::OnStart {
            let opening = goals::opening(self.strategy);
            info!(
                target: "swarm_core::production",
                strategy = ?self.strategy,
                items = opening.len(),
                "loading opening"
            );
            self.queue.extend(opening);
            self.state = PlannerState::Planning;
        }

        if self.queue.is_empty() {
            let goals = goals::generate(self.strategy, ctx.pools, ctx.snapshot);
            debug!(target: "swarm_core::production", count = goals.len(), "new goals");
            self.queue.extend(goals);
        }

        self.state = PlannerState::CutIn;
        self.run_cut_ins(ctx);

        self.state = PlannerState::Executing;
        self.execute_head(ctx);

        ctx.channels
            .send(Intent::SetHarvestPriority(harvest_priority(ctx.snapshot)));
        self.state = PlannerState::Planning;
    }

    fn in_flight(&self, ctx: &TickContext<'_>, target: ProductionTarget) -> usize {
        ctx.pools.in_progress(target) + self.pending.iter().filter(|p| p.target == target).count()
    }

    fn queued_or_flying(&self, ctx: &TickContext<'_>, target: ProductionTarget) -> bool {
        self.in_flight(ctx, target) > 0
            || self.queue.has_cut_in(target)
            || self.queue.head().is_some_and(|h| h.target == target)
    }

    fn run_cut_ins(&mut self, ctx: &TickContext<'_>) {
        let pools = ctx.pools;
        let snapshot = ctx.snapshot;
        let overlord = ProductionTarget::Unit(UnitTypeId::Overlord);
        let hatchery = ProductionTarget::Unit(UnitTypeId::Hatchery);
        let extractor = ProductionTarget::Unit(UnitTypeId::Extractor);

        // Supply.
        let next_supply = self
            .queue
            .head()
            .and_then(|h| ctx.tech.get(h.target))
            .map_or(0, |e| e.cost.supply);
        let margin = goals::supply_margin(pools.structures.townhalls().count());
        if snapshot.food_cap < MAX_SUPPLY
            && snapshot.food_used + next_supply + margin > snapshot.food_cap
            && !self.queued_or_flying(ctx, overlord)
        {
            self.queue.cut_in(overlord, CutInReason::Supply);
        }

        let workers = goals::unit_count(pools, UnitTypeId::Drone);

        // Expansion.
        if let Some(threshold) = goals::expansion_threshold(self.strategy, pools.bases.len()) {
            if workers > threshold
                && !self.queued_or_flying(ctx, hatchery)
                && expansion_site(ctx).is_some()
            {
                self.queue.cut_in(hatchery, CutInReason::Expansion);
            }
        }

        // Gas.
        let extractors = pools.count(UnitTypeId::Extractor) + self.pending_count(extractor);
        if let Some(threshold) = goals::gas_threshold(self.strategy, extractors) {
            if workers >= threshold
                && !self.queued_or_flying(ctx, extractor)
                && gas_base(ctx).is_some()
            {
                self.queue.cut_in(extractor, CutInReason::Gas);
            }
        }

        // Dependency deadlock.
        for _ in 0..MAX_CUT_IN_DEPTH {
            let Some(head) = self.queue.head().copied() else {
                break;
            };
            let Some(missing) = self.missing_prerequisite(ctx, head.target) else {
                break;
            };
            if !self.queue.cut_in(missing, CutInReason::Prerequisite) {
                break;
            }
        }
    }

    fn pending_count(&self, target: ProductionTarget) -> usize {
        self.pending.iter().filter(|p| p.target == target).count()
    }

    /// First prerequisite of `target` that neither exists nor is coming.
    fn missing_prerequisite(
        &self,
        ctx: &TickContext<'_>,
        target: ProductionTarget,
    ) -> Option<ProductionTarget> {
        let pools = ctx.pools;
        let entry = ctx.tech.get(target)?;

        for required in &entry.required_units {
            let unit = ProductionTarget::Unit(*required);
            if !pools.has_completed(*required) && self.in_flight(ctx, unit) == 0 {
                return Some(unit);
            }
        }

        if let Some(upgrade) = entry.required_upgrade {
            let research = ProductionTarget::Upgrade(upgrade);
            if !ctx.snapshot.upgrades.contains(&upgrade) && self.in_flight(ctx, research) == 0 {
                return Some(research);
            }
        }

        // Larva respawn on their own.
        if entry.kind != ProductionKind::Larva {
            let has_builder = entry.builders.iter().any(|b| {
                pools.count(*b) > 0 || self.in_flight(ctx, ProductionTarget::Unit(*b)) > 0
            });
            if !has_builder {
                if let Some(builder) = entry.builders.first() {
                    return Some(ProductionTarget::Unit(*builder));
                }
            }
        }

        let extractor = ProductionTarget::Unit(UnitTypeId::Extractor);
        if entry.cost.vespene > 0
            && target != extractor
            && pools.count(UnitTypeId::Extractor) == 0
            && self.in_flight(ctx, extractor) == 0
        {
            return Some(extractor);
        }

        None
    }

    fn execute_head(&mut self, ctx: &mut TickContext<'_>) {
        let Some(item) = self.queue.head().copied() else {
            return;
        };
        let game_loop = ctx.snapshot.game_loop;

        let Some(entry) = ctx.tech.get(item.target) else {
            warn!(target: "swarm_core::production", target_item = %item.target, "no tech entry, abandoning");
            self.queue.pop_front();
            self.head_since = None;
            return;
        };

        // The cut-in loop already ran, so a prerequisite still missing here
        // could not be queued ahead of the head.
        if self.missing_prerequisite(ctx, item.target).is_some() {
            self.abandon_if_stalled(item.target, game_loop);
            return;
        }
        self.head_since = None;

        if !affordable(entry.cost, ctx.snapshot) {
            return;
        }
        let Some(intent) = select_builder(entry, ctx) else {
            debug!(target: "swarm_core::production", target_item = %item.target, "no eligible builder");
            return;
        };

        debug!(target: "swarm_core::production", ?intent, "executing");
        ctx.reserve(intent.actor());
        ctx.channels.send(intent);
        self.queue.pop_front();
        self.pending.push(Pending {
            target: item.target,
            until: game_loop.saturating_add(PENDING_GRACE),
        });
    }

    /// Drop a head blocked on an unqueueable prerequisite for longer than
    /// the stall limit. Unaffordable heads never get here.
    fn abandon_if_stalled(&mut self, target: ProductionTarget, game_loop: u32) {
        let since = match self.head_since {
            Some((blocked, since)) if blocked == target => since,
            _ => {
                self.head_since = Some((target, game_loop));
                return;
            }
        };
        let Some(limit) = self.stall_limit else {
            return;
        };
        let waited = game_loop.saturating_sub(since);
        if waited > limit {
            warn!(
                target: "swarm_core::production",
                target_item = %target,
                waited,
                "head item deadlocked on a prerequisite, abandoning"
            );
            self.queue.pop_front();
            self.head_since = None;
        }
    }
}

/// Gas-first when vespene lags far behind a healthy mineral bank.
#[must_use]
pub fn harvest_priority(snapshot: &Snapshot) -> HarvestPriority {
    if snapshot.vespene.saturating_mul(3) < snapshot.minerals
        && snapshot.minerals > GAS_SIGNAL_MINERAL_FLOOR
    {
        HarvestPriority::Gas
    } else {
        HarvestPriority::Minerals
    }
}

fn affordable(cost: Cost, snapshot: &Snapshot) -> bool {
    snapshot.minerals >= cost.minerals
        && snapshot.vespene >= cost.vespene
        && (cost.supply == 0 || snapshot.supply_left() >= cost.supply)
}

fn select_builder(entry: &TechEntry, ctx: &TickContext<'_>) -> Option<ProductionIntent> {
    let pools = ctx.pools;
    match (entry.kind, entry.target) {
        (ProductionKind::Larva, ProductionTarget::Unit(unit)) => {
            let mut bases: Vec<&Base> = pools.bases.iter().collect();
            if unit == UnitTypeId::Drone {
                // Favour the base with the largest harvester deficit.
                bases.sort_by_key(|b| std::cmp::Reverse(b.mineral_deficit()));
            }
            let source = bases
                .iter()
                .flat_map(|b| b.larva.iter().copied())
                .chain(pools.own_units(UnitTypeId::Larva).map(|l| l.tag))
                .find(|tag| !ctx.is_claimed(*tag))?;
            Some(ProductionIntent::BuildUnit { source, unit })
        }
        (ProductionKind::Townhall, ProductionTarget::Unit(unit)) => {
            let townhall = pools
                .bases
                .iter()
                .filter(|b| {
                    b.is_ready()
                        && b.townhall.is_idle()
                        && entry.builders.contains(&b.townhall.unit_type)
                        && !ctx.is_claimed(b.tag())
                })
                .min_by_key(|b| (b.queens.len(), b.tag()))?;
            Some(ProductionIntent::BuildUnit {
                source: townhall.tag(),
                unit,
            })
        }
        (ProductionKind::Worker, ProductionTarget::Unit(UnitTypeId::Hatchery)) => {
            let position = expansion_site(ctx)?;
            let builder = nearest_drone(ctx, position, None)?;
            Some(ProductionIntent::Expand { builder, position })
        }
        (ProductionKind::Worker, ProductionTarget::Unit(structure)) => {
            let base = if structure.is_gas_building() {
                gas_base(ctx)?
            } else if structure.is_static_defense() {
                ready_bases(ctx).max_by_key(|b| (start_distance(ctx, b), b.tag()))?
            } else {
                ready_bases(ctx).min_by_key(|b| (start_distance(ctx, b), b.tag()))?
            };
            let builder = nearest_drone(ctx, base.position(), Some(base))?;
            Some(ProductionIntent::BuildBuilding {
                builder,
                base: base.tag(),
                structure,
            })
        }
        (ProductionKind::StructureMorph, ProductionTarget::Unit(into)) => {
            let start = ctx.map.start_location;
            let source = pools
                .structures
                .iter()
                .filter(|s| {
                    entry.builders.contains(&s.unit_type)
                        && s.is_ready()
                        && s.is_idle()
                        && !ctx.is_claimed(s.tag)
                })
                .min_by_key(|s| (s.position.distance_squared(start), s.tag))?;
            Some(ProductionIntent::Morph {
                source: source.tag,
                into,
            })
        }
        (ProductionKind::UnitMorph, ProductionTarget::Unit(into)) => {
            let source = pools
                .army
                .iter()
                .map(|c| &c.unit)
                .chain(pools.others.values())
                .find(|u| {
                    entry.builders.contains(&u.unit_type)
                        && !ctx.is_claimed(u.tag)
                        && !pools.scouts.contains(u.tag)
                })?;
            Some(ProductionIntent::Morph {
                source: source.tag,
                into,
            })
        }
        (ProductionKind::Research, ProductionTarget::Upgrade(upgrade)) => {
            let source = pools.structures.iter().find(|s| {
                entry.builders.contains(&s.unit_type)
                    && s.is_ready()
                    && s.is_idle()
                    && !ctx.is_claimed(s.tag)
            })?;
            Some(ProductionIntent::Upgrade {
                source: source.tag,
                upgrade,
            })
        }
        _ => None,
    }
}

fn ready_bases<'a>(ctx: &TickContext<'a>) -> impl Iterator<Item = &'a Base> {
    ctx.pools.bases.iter().filter(|b| b.is_ready())
}

fn start_distance(ctx: &TickContext<'_>, base: &Base) -> Fixed {
    base.position().distance_squared(ctx.map.start_location)
}

/// First ready base with a geyser still free.
fn gas_base<'a>(ctx: &TickContext<'a>) -> Option<&'a Base> {
    let pools = ctx.pools;
    ready_bases(ctx).find(|b| !b.free_geysers(&pools.resources, &pools.structures).is_empty())
}

/// Nearest unowned cluster with a known townhall spot, away from enemy starts.
#[must_use]
pub fn expansion_site(ctx: &TickContext<'_>) -> Option<Vec2Fixed> {
    let pools = ctx.pools;
    let clearance = Fixed::from_num(ENEMY_START_CLEARANCE);
    let start = ctx.map.start_location;
    pools
        .resources
        .clusters()
        .iter()
        .filter(|c| pools.bases.owner_of(c.id).is_none())
        .filter_map(|c| c.base_position)
        .filter(|pos| {
            !ctx.map
                .enemy_start_locations
                .iter()
                .any(|e| e.is_within(*pos, clearance))
        })
        .min_by_key(|pos| pos.distance_squared(start))
}

/// Closest available drone, preferring members of `base` that mine minerals.
fn nearest_drone(ctx: &TickContext<'_>, pos: Vec2Fixed, base: Option<&Base>) -> Option<u64> {
    let pools = ctx.pools;
    let eligible = |w: &&Worker| {
        w.is_available() && !ctx.is_claimed(w.unit.tag) && !pools.scouts.contains(w.unit.tag)
    };
    let local = base.and_then(|b| {
        pools
            .workers
            .values()
            .filter(eligible)
            .filter(|w| w.base == Some(b.tag()))
            .min_by_key(|w| {
                let mining = matches!(w.state, WorkerState::HarvestingMineral(_));
                (!mining, w.unit.position.distance_squared(pos), w.unit.tag)
            })
    });
    local
        .or_else(|| {
            pools
                .workers
                .values()
                .filter(eligible)
                .min_by_key(|w| (w.unit.position.distance_squared(pos), w.unit.tag))
        })
        .map(|w| w.unit.tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_harvest_priority_signal() {
        let mut snapshot = Snapshot {
            minerals: 600,
            vespene: 100,
            ..Snapshot::default()
        };
        assert_eq!(harvest_priority(&snapshot), HarvestPriority::Gas);
        snapshot.vespene = 250;
        assert_eq!(harvest_priority(&snapshot), HarvestPriority::Minerals);
        snapshot.minerals = 250;
        snapshot.vespene = 0;
        assert_eq!(harvest_priority(&snapshot), HarvestPriority::Minerals);
    }

    #[test]
    fn test_affordable() {
        let snapshot = Snapshot {
            minerals: 100,
            vespene: 25,
            food_used: 13,
            food_cap: 14,
            ..Snapshot::default()
        };
        let roach = Cost {
            minerals: 75,
            vespene: 25,
            supply: 2,
        };
        assert!(!affordable(roach, &snapshot));
        let drone = Cost {
            minerals: 50,
            vespene: 0,
            supply: 1,
        };
        assert!(affordable(drone, &snapshot));
    }
}
