//! Worker assignment across mineral lines and extractors.
//!
//! Each tick the balancer builds one harvest slot per ready base (minerals)
//! and per ready extractor (gas), each carrying `ideal - assigned`. Passes
//! run in order and adjust the slot deficits as they issue commands, so a
//! single tick never over-corrects:
//!
//! 1. idle workers go to the nearest under-filled slot, favoured kind first;
//! 2. each under-filled slot pulls one donor from the other resource locally;
//! 3. each over-filled slot stops one of its harvesters;
//! 4. every [`REBALANCE_INTERVAL`] loops, a batch moves from the most staffed
//!    base to an empty base that is nearly finished.
//!
//! Anything unresolved is simply looked at again next tick.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::command::Command;
use crate::context::TickContext;
use crate::math::{Fixed, Vec2Fixed};
use crate::pools::{Base, Pools, Worker, WorkerState};
use crate::snapshot::Tag;

/// Game loops between rebalancing passes (about ten seconds).
pub const REBALANCE_INTERVAL: u32 = 224;

/// Workers moved per rebalancing pass.
pub const REBALANCE_BATCH: usize = 4;

/// A new base qualifies for rebalancing from this build progress on.
const NEARLY_COMPLETE: f64 = 0.9;

/// Which resource the economy should favour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HarvestPriority {
    /// Minerals first.
    #[default]
    Minerals,
    /// Vespene first.
    Gas,
}

impl HarvestPriority {
    /// The other resource.
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::Minerals => Self::Gas,
            Self::Gas => Self::Minerals,
        }
    }

    fn of_state(state: WorkerState) -> Option<Self> {
        match state {
            WorkerState::HarvestingMineral(_) => Some(Self::Minerals),
            WorkerState::HarvestingGas(_) => Some(Self::Gas),
            _ => None,
        }
    }
}

/// Runs a task at most once per `delay` game loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiter {
    delay: u32,
    last_loop: Option<u32>,
}

impl RateLimiter {
    /// Create a limiter that fires on first use.
    #[must_use]
    pub const fn new(delay: u32) -> Self {
        Self {
            delay,
            last_loop: None,
        }
    }

    /// Check whether the task may run at `game_loop`, recording the run if so.
    pub fn ready(&mut self, game_loop: u32) -> bool {
        if let Some(last) = self.last_loop {
            if last.saturating_add(self.delay) > game_loop {
                return false;
            }
        }
        self.last_loop = Some(game_loop);
        true
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    kind: HarvestPriority,
    base: Tag,
    /// Townhall for minerals, extractor for gas.
    tag: Tag,
    position: Vec2Fixed,
    deficit: i64,
}

/// The resource balancer.
#[derive(Debug)]
pub struct ResourceBalancer {
    priority: HarvestPriority,
    rebalance: RateLimiter,
    /// Per-tick count of workers sent to each mineral patch.
    patch_load: BTreeMap<Tag, usize>,
    /// Workers already handled this tick.
    moved: BTreeSet<Tag>,
}

impl Default for ResourceBalancer {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceBalancer {
    /// Create a balancer favouring minerals.
    #[must_use]
    pub fn new() -> Self {
        Self {
            priority: HarvestPriority::Minerals,
            rebalance: RateLimiter::new(REBALANCE_INTERVAL),
            patch_load: BTreeMap::new(),
            moved: BTreeSet::new(),
        }
    }

    /// Current harvest priority.
    #[must_use]
    pub const fn priority(&self) -> HarvestPriority {
        self.priority
    }

    /// Drain the harvest channel and run every balancing pass.
    pub fn run(&mut self, ctx: &mut TickContext<'_>) {
        if let Some(priority) = ctx.channels.harvest.drain().last() {
            if priority != self.priority {
                debug!(target: "swarm_core::economy", ?priority, "harvest priority changed");
            }
            self.priority = priority;
        }
        self.patch_load.clear();
        self.moved.clear();

        let pools = ctx.pools;
        let mut slots = collect_slots(pools);

        self.assign_idle(ctx, &mut slots);
        self.pull_donors(ctx, &mut slots);
        self.trim_overfill(ctx, &mut slots);
        if self.rebalance.ready(ctx.snapshot.game_loop) {
            self.rebalance_bases(ctx);
        }
    }

    fn assign_idle(&mut self, ctx: &mut TickContext<'_>, slots: &mut [Slot]) {
        let pools = ctx.pools;
        for worker in pools.workers.idle() {
            if !self.eligible(ctx, worker) {
                continue;
            }
            let pos = worker.unit.position;
            let pick = self
                .nearest_open(slots, self.priority, pos)
                .or_else(|| self.nearest_open(slots, self.priority.other(), pos));
            let Some(i) = pick else {
                // Nothing under-filled anywhere.
                break;
            };
            if self.send(ctx, worker.unit.tag, slots[i]) {
                slots[i].deficit -= 1;
            }
        }
    }

    fn pull_donors(&mut self, ctx: &mut TickContext<'_>, slots: &mut [Slot]) {
        let pools = ctx.pools;
        for i in 0..slots.len() {
            let slot = slots[i];
            if slot.deficit <= 0 {
                continue;
            }
            let favoured = slot.kind == self.priority;
            let donor = pools.workers.values().find(|w| {
                if w.base != Some(slot.base) || !self.eligible(&*ctx, w) {
                    return false;
                }
                if HarvestPriority::of_state(w.state) != Some(slot.kind.other()) {
                    return false;
                }
                // A slot of the unfavoured kind only takes surplus workers.
                favoured || slot_of(&*slots, w).is_some_and(|j| slots[j].deficit < 0)
            });
            let Some(donor) = donor else {
                continue;
            };
            let from = slot_of(slots, donor);
            if self.send(ctx, donor.unit.tag, slot) {
                debug!(
                    target: "swarm_core::economy",
                    worker = donor.unit.tag,
                    to = ?slot.kind,
                    base = slot.base,
                    "donor reassigned"
                );
                slots[i].deficit -= 1;
                if let Some(j) = from {
                    slots[j].deficit += 1;
                }
            }
        }
    }

    fn trim_overfill(&mut self, ctx: &mut TickContext<'_>, slots: &mut [Slot]) {
        let pools = ctx.pools;
        for slot in slots.iter_mut().filter(|s| s.deficit < 0) {
            let surplus = pools.workers.values().find(|w| {
                self.eligible(&*ctx, w)
                    && match slot.kind {
                        HarvestPriority::Minerals => {
                            w.base == Some(slot.base)
                                && matches!(w.state, WorkerState::HarvestingMineral(_))
                        }
                        HarvestPriority::Gas => w.state == WorkerState::HarvestingGas(slot.tag),
                    }
            });
            if let Some(worker) = surplus {
                debug!(target: "swarm_core::economy", worker = worker.unit.tag, "over-filled, stopping");
                self.moved.insert(worker.unit.tag);
                ctx.issue(Command::stop(worker.unit.tag));
                slot.deficit += 1;
            }
        }
    }

    fn rebalance_bases(&mut self, ctx: &mut TickContext<'_>) {
        let pools = ctx.pools;
        let threshold = Fixed::from_num(NEARLY_COMPLETE);
        let Some(empty) = pools.bases.iter().find(|b| {
            b.cluster.is_some() && b.workers.is_empty() && b.townhall.build_progress >= threshold
        }) else {
            return;
        };
        let Some(donor) = pools
            .bases
            .iter()
            .filter(|b| b.tag() != empty.tag())
            .max_by_key(|b| (b.workers.len(), std::cmp::Reverse(b.tag())))
        else {
            return;
        };
        if donor.workers.len() <= REBALANCE_BATCH {
            return;
        }

        let mut moved = 0;
        for tag in &donor.workers {
            if moved == REBALANCE_BATCH {
                break;
            }
            let Some(worker) = pools.workers.get(*tag) else {
                continue;
            };
            if !matches!(worker.state, WorkerState::HarvestingMineral(_)) || !self.eligible(ctx, worker) {
                continue;
            }
            let Some(patch) = self.pick_patch(pools, empty) else {
                return;
            };
            self.moved.insert(*tag);
            ctx.issue(Command::gather(*tag, patch));
            moved += 1;
        }
        debug!(
            target: "swarm_core::economy",
            from = donor.tag(),
            to = empty.tag(),
            moved,
            "rebalanced bases"
        );
    }

    fn eligible(&self, ctx: &TickContext<'_>, worker: &Worker) -> bool {
        let tag = worker.unit.tag;
        worker.is_available()
            && !ctx.is_claimed(tag)
            && !self.moved.contains(&tag)
            && !ctx.pools.scouts.contains(tag)
    }

    fn nearest_open(&self, slots: &[Slot], kind: HarvestPriority, pos: Vec2Fixed) -> Option<usize> {
        slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.kind == kind && s.deficit > 0)
            .min_by_key(|(i, s)| (s.position.distance_squared(pos), *i))
            .map(|(i, _)| i)
    }

    /// Issue the gather command for a slot. Returns `false` when a mineral
    /// slot has no patch left.
    fn send(&mut self, ctx: &mut TickContext<'_>, worker: Tag, slot: Slot) -> bool {
        let target = match slot.kind {
            HarvestPriority::Gas => Some(slot.tag),
            HarvestPriority::Minerals => ctx
                .pools
                .bases
                .get(slot.base)
                .and_then(|base| self.pick_patch(ctx.pools, base)),
        };
        let Some(target) = target else {
            return false;
        };
        self.moved.insert(worker);
        ctx.issue(Command::gather(worker, target));
        true
    }

    /// Least loaded live mineral patch of a base, nearest first on ties.
    fn pick_patch(&mut self, pools: &Pools, base: &Base) -> Option<Tag> {
        let cluster = base.cluster?;
        let patch = pools
            .resources
            .live_minerals(cluster)
            .min_by_key(|p| {
                let load = pools.workers.harvesting(p.tag).count()
                    + self.patch_load.get(&p.tag).copied().unwrap_or(0);
                (load, p.position.distance_squared(base.position()), p.tag)
            })?
            .tag;
        *self.patch_load.entry(patch).or_insert(0) += 1;
        Some(patch)
    }
}

fn collect_slots(pools: &Pools) -> Vec<Slot> {
    let mut slots = Vec::new();
    for base in pools.bases.iter().filter(|b| b.is_ready() && b.cluster.is_some()) {
        slots.push(Slot {
            kind: HarvestPriority::Minerals,
            base: base.tag(),
            tag: base.tag(),
            position: base.position(),
            deficit: base.mineral_deficit(),
        });
        for extractor in base
            .extractors
            .iter()
            .filter_map(|tag| pools.structures.get(*tag))
            .filter(|e| e.is_ready())
        {
            slots.push(Slot {
                kind: HarvestPriority::Gas,
                base: base.tag(),
                tag: extractor.tag,
                position: extractor.position,
                deficit: i64::from(extractor.ideal_harvesters) - i64::from(extractor.assigned_harvesters),
            });
        }
    }
    slots
}

/// Index of the slot a harvesting worker currently counts against.
fn slot_of(slots: &[Slot], worker: &Worker) -> Option<usize> {
    match worker.state {
        WorkerState::HarvestingMineral(_) => slots
            .iter()
            .position(|s| s.kind == HarvestPriority::Minerals && Some(s.base) == worker.base),
        WorkerState::HarvestingGas(extractor) => slots
            .iter()
            .position(|s| s.kind == HarvestPriority::Gas && s.tag == extractor),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter() {
        let mut limiter = RateLimiter::new(10);
        assert!(limiter.ready(5));
        assert!(!limiter.ready(14));
        assert!(limiter.ready(15));
        assert!(!limiter.ready(16));
    }

    #[test]
    fn test_priority_other() {
        assert_eq!(HarvestPriority::Minerals.other(), HarvestPriority::Gas);
        assert_eq!(HarvestPriority::Gas.other(), HarvestPriority::Minerals);
    }
}
