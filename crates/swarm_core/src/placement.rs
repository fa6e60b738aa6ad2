//! Building Placement Solver.
//!
//! Turns "build X near base Y" into a world position.
//!
//! - [`PlacementStrategy::NaivePredefined`]: a fixed offset table per type,
//!   mirrored when the base sits below the map diagonal.
//! - Hybrid variants work in a polar frame anchored at the townhall and
//!   facing away from its resource cluster. Static defense takes
//!   predefined slots round-robin. Everything else samples the rim in front
//!   of the base, accepting the last candidate once the attempts run out.
//!
//! | variant | slots | rim sampling | placement/collision | creep & pathing |
//! |---------|-------|--------------|---------------------|-----------------|
//! | v1      | yes   | no (naive)   | no                  | no              |
//! | v2      | yes   | yes          | yes                 | no              |
//! | v3      | yes   | yes          | yes                 | yes             |

use std::collections::BTreeMap;
use std::str::FromStr;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::context::TickContext;
use crate::error::AgentError;
use crate::math::{Fixed, Vec2Fixed, COMPASS, COMPASS_STEPS};
use crate::pools::Base;
use crate::unit_type::UnitTypeId;

/// Candidates tried before the last one is accepted regardless.
pub const RIM_ATTEMPTS: usize = 20;

const RIM_MIN_RADIUS: i32 = 6;
const RIM_MAX_RADIUS: i32 = 10;

/// Rim samples stay within this many compass steps of forward (90 degrees).
const RIM_SPREAD: usize = 4;

/// Building placement strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementStrategy {
    /// Fixed offset table.
    #[serde(alias = "naive", alias = "naive-predefined")]
    NaivePredefined,
    /// Polar slots for static defense, naive table otherwise.
    #[serde(alias = "hybrid-v1")]
    HybridV1,
    /// Slots plus checked rim sampling.
    #[serde(alias = "hybrid-v2")]
    HybridV2,
    /// Like v2, also checking creep and pathing.
    #[default]
    #[serde(alias = "hybrid-v3")]
    HybridV3,
}

impl FromStr for PlacementStrategy {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "naive" | "naive_predefined" => Ok(Self::NaivePredefined),
            "hybrid_v1" => Ok(Self::HybridV1),
            "hybrid_v2" => Ok(Self::HybridV2),
            "hybrid_v3" => Ok(Self::HybridV3),
            _ => Err(AgentError::UnknownStrategy {
                selector: "placement",
                value: s.to_string(),
            }),
        }
    }
}

/// Offsets from the townhall for a base above the map diagonal.
fn naive_offsets(structure: UnitTypeId) -> &'static [(i32, i32)] {
    match structure {
        UnitTypeId::SpawningPool => &[(6, -5)],
        UnitTypeId::EvolutionChamber => &[(-6, -5), (-6, -9)],
        UnitTypeId::RoachWarren => &[(9, -2)],
        UnitTypeId::BanelingNest => &[(9, -6)],
        UnitTypeId::HydraliskDen => &[(3, -9)],
        UnitTypeId::LurkerDen => &[(-3, -9)],
        UnitTypeId::Spire => &[(6, -9)],
        UnitTypeId::InfestationPit => &[(-9, -2)],
        UnitTypeId::UltraliskCavern => &[(-9, -6)],
        UnitTypeId::SpineCrawler => &[(5, -7), (7, -7), (3, -7), (1, -8)],
        UnitTypeId::SporeCrawler => &[(0, 4), (-3, 4), (3, 4)],
        _ => &[(0, -7)],
    }
}

/// Polar slots for static defense as (compass steps from forward, radius).
fn defense_slots(structure: UnitTypeId) -> &'static [(usize, i32)] {
    match structure {
        UnitTypeId::SpineCrawler => &[(0, 7), (1, 7), (15, 7), (2, 8), (14, 8)],
        // Behind the townhall, in the mineral line.
        UnitTypeId::SporeCrawler => &[(8, 5), (7, 5), (9, 5)],
        _ => &[],
    }
}

/// Stateful solver: slot cursors and the sampling RNG persist across ticks.
#[derive(Debug)]
pub struct PlacementSolver {
    strategy: PlacementStrategy,
    rng: ChaCha8Rng,
    cursors: BTreeMap<(u64, UnitTypeId), usize>,
}

impl PlacementSolver {
    /// Create a solver.
    #[must_use]
    pub fn new(strategy: PlacementStrategy, seed: u64) -> Self {
        Self {
            strategy,
            rng: ChaCha8Rng::seed_from_u64(seed),
            cursors: BTreeMap::new(),
        }
    }

    /// The configured strategy.
    #[must_use]
    pub const fn strategy(&self) -> PlacementStrategy {
        self.strategy
    }

    /// Resolve a build position for `structure` near `base`.
    ///
    /// Only returns `None` when the structure has no table entry at all,
    /// which never happens for drone-built types.
    pub fn place(
        &mut self,
        structure: UnitTypeId,
        base: &Base,
        ctx: &TickContext<'_>,
    ) -> Option<Vec2Fixed> {
        let pos = match self.strategy {
            PlacementStrategy::NaivePredefined => self.naive(structure, base, ctx),
            PlacementStrategy::HybridV1 => self
                .slot(structure, base, ctx, None)
                .or_else(|| self.naive(structure, base, ctx)),
            PlacementStrategy::HybridV2 | PlacementStrategy::HybridV3 => {
                let strict = self.strategy == PlacementStrategy::HybridV3;
                self.slot(structure, base, ctx, Some(strict))
                    .or_else(|| self.rim(structure, base, ctx, strict))
            }
        };
        debug!(
            target: "swarm_core::placement",
            ?structure,
            base = base.tag(),
            ?pos,
            "placement"
        );
        pos
    }

    fn naive(&mut self, structure: UnitTypeId, base: &Base, ctx: &TickContext<'_>) -> Option<Vec2Fixed> {
        let offsets = naive_offsets(structure);
        let index = self.next_cursor(base.tag(), structure, offsets.len())?;
        let (dx, dy) = offsets[index];
        let mirror = below_diagonal(base.position(), ctx);
        let (dx, dy) = if mirror { (-dx, -dy) } else { (dx, dy) };
        Some(snap(
            base.position() + Vec2Fixed::from_ints(dx, dy),
            structure,
        ))
    }

    fn slot(
        &mut self,
        structure: UnitTypeId,
        base: &Base,
        ctx: &TickContext<'_>,
        check: Option<bool>,
    ) -> Option<Vec2Fixed> {
        let slots = defense_slots(structure);
        let index = self.next_cursor(base.tag(), structure, slots.len())?;
        let (step, radius) = slots[index];
        let forward = forward_step(base, ctx);
        let dir = COMPASS[(forward + step) % COMPASS_STEPS];
        let pos = snap(base.position() + dir.scale(Fixed::from_num(radius)), structure);
        if let Some(strict) = check {
            if !is_clear(pos, structure, ctx, strict) {
                return None;
            }
        }
        Some(pos)
    }

    fn rim(
        &mut self,
        structure: UnitTypeId,
        base: &Base,
        ctx: &TickContext<'_>,
        strict: bool,
    ) -> Option<Vec2Fixed> {
        let forward = forward_step(base, ctx);
        let mut candidate = None;
        for _ in 0..RIM_ATTEMPTS {
            let spread = self.rng.gen_range(0..=2 * RIM_SPREAD);
            let step = (forward + COMPASS_STEPS + spread - RIM_SPREAD) % COMPASS_STEPS;
            let radius = self.rng.gen_range(RIM_MIN_RADIUS..=RIM_MAX_RADIUS);
            let pos = snap(
                base.position() + COMPASS[step].scale(Fixed::from_num(radius)),
                structure,
            );
            if is_clear(pos, structure, ctx, strict) {
                return Some(pos);
            }
            candidate = Some(pos);
        }
        warn!(
            target: "swarm_core::placement",
            ?structure,
            base = base.tag(),
            "no clear rim position, using last candidate"
        );
        candidate
    }

    fn next_cursor(&mut self, base: u64, structure: UnitTypeId, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        let cursor = self.cursors.entry((base, structure)).or_insert(0);
        let index = *cursor % len;
        *cursor += 1;
        Some(index)
    }
}

/// Compass step pointing away from the base's resources.
fn forward_step(base: &Base, ctx: &TickContext<'_>) -> usize {
    let resources = base
        .cluster
        .and_then(|c| ctx.pools.resources.cluster(c))
        .map(|c| c.mineral_center);
    let away = match resources {
        Some(center) => base.position() - center,
        None => ctx.map.center() - base.position(),
    };
    away.compass_index()
}

/// Check which side of the map's main diagonal `pos` lies on.
fn below_diagonal(pos: Vec2Fixed, ctx: &TickContext<'_>) -> bool {
    let w = Fixed::from_num(ctx.map.width);
    let h = Fixed::from_num(ctx.map.height);
    pos.y.saturating_mul(w) < pos.x.saturating_mul(h)
}

/// Snap to the grid: odd-sized footprints centre on half cells.
fn snap(pos: Vec2Fixed, structure: UnitTypeId) -> Vec2Fixed {
    let radius = structure.footprint_radius();
    let half = Fixed::from_num(1) / Fixed::from_num(2);
    let odd = radius.frac() != Fixed::ZERO;
    let offset = if odd { half } else { Fixed::ZERO };
    Vec2Fixed::new(pos.x.floor() + offset, pos.y.floor() + offset)
}

/// Placement grid and collision checks; `strict` adds creep and pathing.
fn is_clear(pos: Vec2Fixed, structure: UnitTypeId, ctx: &TickContext<'_>, strict: bool) -> bool {
    let radius = structure.footprint_radius();
    if !ctx.map.placement.is_area_set(pos, radius) {
        return false;
    }
    let collides = ctx.snapshot.units.iter().any(|u| {
        (u.is_structure || u.unit_type.is_resource())
            && u.position.is_within(pos, u.unit_type.footprint_radius() + radius)
    });
    if collides {
        return false;
    }
    if strict {
        if structure.requires_creep() {
            let creep = ctx.snapshot.creep.as_ref().unwrap_or(&ctx.map.creep);
            if !creep.is_area_set(pos, radius) {
                return false;
            }
        }
        if !ctx.map.pathing.is_area_set(pos, radius) {
            return false;
        }
    }
    true
}
