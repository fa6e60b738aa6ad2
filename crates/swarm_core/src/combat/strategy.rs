//! Combat strategy state machine.
//!
//! Each tick the planner re-resolves squads, forms new ones, and runs the
//! defend check. If the defend override fires it owns the tick; otherwise
//! the configured strategy drives the squads:
//!
//! ```text
//! rush:    every squad ─► ATTACK (nearest enemy cluster centroid)
//! reform:  IDLE ─► MOVE (rally) ─► ATTACK ─► RETREAT ─► MOVE ...
//! harass:  reform, plus one flying role squad cycling
//!          IDLE ─► STAGE ─► ADVANCE ─► STRIKE ─► STAGE ...
//! ```

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::micro::{Engagement, MicroTable, MicroVersion};
use super::power::{outweighs, tags_power};
use super::squad::{Squad, SquadManager, SquadRole, SquadStatus};
use crate::command::{Command, Target};
use crate::context::TickContext;
use crate::error::AgentError;
use crate::math::{Fixed, Vec2Fixed};
use crate::pools::Pools;
use crate::snapshot::{MapInfo, Tag, UnitSnapshot};
use crate::unit_type::{AbilityId, UnitTypeId};

/// Enemy combatants this close to a base trigger the defend override.
pub const DEFEND_RADIUS: i32 = 25;

/// A squad whose centroid is this close to a point has arrived.
pub const ARRIVAL_RADIUS: i32 = 5;

/// From this many bases on, defenders are sent by power instead of en masse.
const SELECTIVE_DEFENCE_BASES: usize = 3;

/// Defenders must reach `num / den` of the threat's power.
const DEFENCE_RATIO: (u32, u32) = (3, 2);

/// Army size at which reform squads leave the rally point.
const REFORM_ATTACK_SIZE: usize = 16;

/// Rally point distance in front of the forward base.
const RALLY_OFFSET: i32 = 8;

/// Harass squad size.
const HARASS_SIZE: usize = 4;

/// Reserve squad size.
const RESERVE_SIZE: usize = 4;

/// Combat strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatStrategy {
    /// Every squad attacks immediately.
    #[default]
    Rush,
    /// Gather, attack when strong enough, retreat when outmatched.
    #[serde(alias = "defensive")]
    Reform,
    /// Reform plus a flying raid group.
    Harass,
}

impl FromStr for CombatStrategy {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rush" => Ok(Self::Rush),
            "reform" | "defensive" | "reform/defensive" => Ok(Self::Reform),
            "harass" => Ok(Self::Harass),
            _ => Err(AgentError::UnknownStrategy {
                selector: "combat",
                value: s.to_string(),
            }),
        }
    }
}

/// Stage of the harass cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HarassPhase {
    /// Waiting for the role squad to fill.
    #[default]
    Idle,
    /// Gathering at the safe staging point.
    Stage,
    /// Moving to the forward staging point.
    Advance,
    /// Hitting the nearest economy target.
    Strike,
}

/// The combat planner.
#[derive(Debug)]
pub struct CombatPlanner {
    strategy: CombatStrategy,
    squads: SquadManager,
    micro: MicroTable,
    harass: HarassPhase,
    defending: bool,
}

impl CombatPlanner {
    /// Create a planner.
    #[must_use]
    pub fn new(strategy: CombatStrategy, micro: MicroVersion, seed: u64, squad_size: usize) -> Self {
        Self {
            strategy,
            squads: SquadManager::new(seed, squad_size),
            micro: MicroTable::new(micro),
            harass: HarassPhase::Idle,
            defending: false,
        }
    }

    /// The configured strategy.
    #[must_use]
    pub const fn strategy(&self) -> CombatStrategy {
        self.strategy
    }

    /// The squad manager.
    #[must_use]
    pub fn squads(&self) -> &SquadManager {
        &self.squads
    }

    /// Mutable squad manager, for seeding scenarios.
    pub fn squads_mut(&mut self) -> &mut SquadManager {
        &mut self.squads
    }

    /// Current harass phase.
    #[must_use]
    pub const fn harass_phase(&self) -> HarassPhase {
        self.harass
    }

    /// Check if the defend override fired on the last tick.
    #[must_use]
    pub const fn is_defending(&self) -> bool {
        self.defending
    }

    /// Run one tick.
    pub fn run(&mut self, ctx: &mut TickContext<'_>) {
        let pools = ctx.pools;
        self.squads.resolve(pools);
        match self.strategy {
            CombatStrategy::Rush => {}
            CombatStrategy::Reform => {
                self.squads
                    .form_role(SquadRole::Reserve, UnitTypeId::Zergling, RESERVE_SIZE, pools);
            }
            CombatStrategy::Harass => {
                self.squads
                    .form_role(SquadRole::Harass, UnitTypeId::Mutalisk, HARASS_SIZE, pools);
            }
        }
        self.squads.form(pools);

        if self.defend(ctx) {
            return;
        }

        match self.strategy {
            CombatStrategy::Rush => self.rush(ctx),
            CombatStrategy::Reform => self.reform(ctx),
            CombatStrategy::Harass => {
                self.harass(ctx);
                self.reform(ctx);
            }
        }
    }

    /// Redirect squads to a threat near a base. Returns `true` if it fired.
    fn defend(&mut self, ctx: &mut TickContext<'_>) -> bool {
        let pools = ctx.pools;
        let radius = Fixed::from_num(DEFEND_RADIUS);

        let threat = pools
            .bases
            .iter()
            .flat_map(|base| {
                pools
                    .enemies
                    .combatants_near(base.position(), radius)
                    .map(move |e| (e.unit.position.distance_squared(base.position()), base, e))
            })
            .min_by_key(|(d, _, e)| (*d, e.unit.tag));

        let Some((_, base, threat)) = threat else {
            if self.defending {
                info!(target: "swarm_core::combat", "threat cleared");
                self.defending = false;
            }
            return false;
        };
        if !self.defending {
            info!(
                target: "swarm_core::combat",
                base = base.tag(),
                enemy = threat.unit.tag,
                "defend override"
            );
            self.defending = true;
        }

        let target = threat.unit.position;
        let micro = &self.micro;
        let mut eligible: Vec<&mut Squad> = self
            .squads
            .squads_mut()
            .iter_mut()
            .filter(|s| s.role().is_none() && s.status() != SquadStatus::Scout)
            .collect();

        if pools.bases.len() < SELECTIVE_DEFENCE_BASES {
            for squad in eligible {
                squad.set_status(SquadStatus::Defend);
                engage(micro, squad.members(), target, ctx);
            }
            return true;
        }

        let threat_power = pools
            .enemies
            .combatants_near(base.position(), radius)
            .map(|e| e.power)
            .sum::<u32>();
        eligible.sort_by_key(|s| {
            let d = s
                .centroid(pools)
                .map_or(Fixed::MAX, |c| c.distance_squared(target));
            (d, s.id())
        });

        let mut committed = 0u32;
        for squad in eligible {
            if outweighs(committed, threat_power, DEFENCE_RATIO.0, DEFENCE_RATIO.1) && committed > 0 {
                break;
            }
            committed += tags_power(ctx.tech, pools, squad.members());
            squad.set_status(SquadStatus::Defend);
            engage(micro, squad.members(), target, ctx);
        }
        debug!(target: "swarm_core::combat", threat_power, committed, "defenders committed");
        true
    }

    fn rush(&mut self, ctx: &mut TickContext<'_>) {
        let pools = ctx.pools;
        let map = ctx.map;
        let micro = &self.micro;
        for squad in self.squads.squads_mut() {
            let Some(center) = squad.centroid(pools) else {
                continue;
            };
            let target = attack_target(pools, map, center);
            squad.set_status(SquadStatus::Attack);
            engage(micro, squad.members(), target, ctx);
        }
    }

    fn reform(&mut self, ctx: &mut TickContext<'_>) {
        let pools = ctx.pools;
        let map = ctx.map;
        let rally = rally_point(pools, map);
        let arrival = Fixed::from_num(ARRIVAL_RADIUS);

        let field: Vec<Tag> = self
            .squads
            .squads()
            .iter()
            .filter(|s| s.role().is_none())
            .flat_map(|s| s.members().iter().copied())
            .collect();
        let own_power = tags_power(ctx.tech, pools, &field);
        let enemy_power: u32 = pools.enemies.groups().iter().map(|g| g.power).sum();
        let strong = outweighs(own_power, enemy_power, 1, 1);
        let ready = field.len() >= REFORM_ATTACK_SIZE && strong;

        let micro = &self.micro;
        for squad in self.squads.squads_mut() {
            let Some(center) = squad.centroid(pools) else {
                continue;
            };
            match squad.role() {
                Some(SquadRole::Reserve) => {
                    let home = pools.bases.main_base().map_or(map.start_location, |b| b.position());
                    if !center.is_within(home, arrival) {
                        move_squad(squad.members(), home, ctx);
                    }
                    continue;
                }
                Some(SquadRole::Harass) => continue,
                None => {}
            }

            let arrived = center.is_within(rally, arrival);
            let next = match squad.status() {
                SquadStatus::Idle | SquadStatus::Defend => SquadStatus::Move,
                SquadStatus::Move if arrived && ready => SquadStatus::Attack,
                SquadStatus::Attack if !strong => SquadStatus::Retreat,
                SquadStatus::Retreat if arrived => SquadStatus::Move,
                other => other,
            };
            squad.set_status(next);

            match next {
                SquadStatus::Attack => {
                    let target = attack_target(pools, map, center);
                    engage(micro, squad.members(), target, ctx);
                }
                SquadStatus::Move | SquadStatus::Retreat if !arrived => {
                    move_squad(squad.members(), rally, ctx);
                }
                _ => {}
            }
        }
    }

    fn harass(&mut self, ctx: &mut TickContext<'_>) {
        let pools = ctx.pools;
        let map = ctx.map;
        let arrival = Fixed::from_num(ARRIVAL_RADIUS);
        let (safe, forward) = harass_staging(map);

        let Some(squad) = self
            .squads
            .squads_mut()
            .iter_mut()
            .find(|s| s.role() == Some(SquadRole::Harass))
        else {
            self.harass = HarassPhase::Idle;
            return;
        };
        let Some(center) = squad.centroid(pools) else {
            return;
        };
        squad.set_status(SquadStatus::Scout);

        let mut phase = self.harass;
        if phase == HarassPhase::Idle && squad.len() >= HARASS_SIZE {
            phase = HarassPhase::Stage;
        }
        if phase == HarassPhase::Stage && center.is_within(safe, arrival) {
            phase = HarassPhase::Advance;
        }
        if phase == HarassPhase::Advance && center.is_within(forward, arrival) {
            phase = HarassPhase::Strike;
        }
        if phase != self.harass {
            info!(target: "swarm_core::combat", from = ?self.harass, to = ?phase, "harass phase");
            self.harass = phase;
        }

        match phase {
            HarassPhase::Idle => {}
            HarassPhase::Stage => move_squad(squad.members(), safe, ctx),
            HarassPhase::Advance => move_squad(squad.members(), forward, ctx),
            HarassPhase::Strike => match economy_target(pools, center) {
                Some(target) => {
                    let units: Vec<Tag> = unclaimed(squad.members(), ctx);
                    if !units.is_empty() {
                        ctx.issue(Command::group(AbilityId::Attack, units, target));
                    }
                }
                None => {
                    debug!(target: "swarm_core::combat", "no economy target, restaging");
                    self.harass = HarassPhase::Stage;
                    move_squad(squad.members(), safe, ctx);
                }
            },
        }
    }
}

/// Nearest enemy group centroid, else nearest remembered structure, else
/// the enemy start.
#[must_use]
pub fn attack_target(pools: &Pools, map: &MapInfo, from: Vec2Fixed) -> Vec2Fixed {
    if let Some(group) = pools.enemies.nearest_group(from) {
        return group.centroid();
    }
    if let Some(structure) = pools.enemies.nearest_structure(from) {
        return structure.position;
    }
    map.enemy_start()
}

/// Where reform squads gather.
#[must_use]
pub fn rally_point(pools: &Pools, map: &MapInfo) -> Vec2Fixed {
    let anchor = pools
        .bases
        .forward_base()
        .map_or(map.start_location, |b| b.position());
    anchor.towards(map.center(), Fixed::from_num(RALLY_OFFSET))
}

/// Safe and forward staging points of the harass route.
///
/// The route hugs the corner shared by the own start column and the enemy
/// start row.
#[must_use]
pub fn harass_staging(map: &MapInfo) -> (Vec2Fixed, Vec2Fixed) {
    let start = map.start_location;
    let enemy = map.enemy_start();
    let corner = Vec2Fixed::new(start.x, enemy.y);
    let half = Fixed::from_num(1) / Fixed::from_num(2);
    (start.lerp(corner, half), corner.lerp(enemy, half))
}

/// Closest visible enemy worker or structure, else a remembered structure.
fn economy_target(pools: &Pools, from: Vec2Fixed) -> Option<Target> {
    let visible = pools
        .enemies
        .iter()
        .filter(|e| e.unit.unit_type.is_worker() || e.unit.is_structure)
        .min_by_key(|e| (e.unit.position.distance_squared(from), e.unit.tag));
    if let Some(enemy) = visible {
        return Some(Target::Unit(enemy.unit.tag));
    }
    pools
        .enemies
        .nearest_structure(from)
        .map(|s| Target::Position(s.position))
}

fn unclaimed(members: &[Tag], ctx: &TickContext<'_>) -> Vec<Tag> {
    members
        .iter()
        .copied()
        .filter(|t| !ctx.is_claimed(*t))
        .collect()
}

fn move_squad(members: &[Tag], pos: Vec2Fixed, ctx: &mut TickContext<'_>) {
    let units = unclaimed(members, ctx);
    if !units.is_empty() {
        ctx.issue(Command::group(AbilityId::Move, units, Target::Position(pos)));
    }
}

/// Attack `target` with a squad: specialised types go through the micro
/// table one by one, the rest share one attack-move.
fn engage(micro: &MicroTable, members: &[Tag], target: Vec2Fixed, ctx: &mut TickContext<'_>) {
    let pools = ctx.pools;
    let snapshot = ctx.snapshot;
    let enemies: Vec<&UnitSnapshot> = pools.enemies.iter().map(|e| &e.unit).collect();
    let allies: Vec<&UnitSnapshot> = snapshot.own().collect();

    let mut plain = Vec::new();
    for tag in members {
        if ctx.is_claimed(*tag) {
            continue;
        }
        let Some(member) = pools.army.get(*tag) else {
            continue;
        };
        if micro.is_specialised(member.unit.unit_type) {
            let command = micro.command(&Engagement {
                unit: &member.unit,
                target,
                enemies: &enemies,
                allies: &allies,
            });
            ctx.issue(command);
        } else {
            plain.push(*tag);
        }
    }
    if !plain.is_empty() {
        ctx.issue(Command::group(AbilityId::Attack, plain, Target::Position(target)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("defensive".parse::<CombatStrategy>().unwrap(), CombatStrategy::Reform);
        assert_eq!("reform".parse::<CombatStrategy>().unwrap(), CombatStrategy::Reform);
        assert_eq!("HARASS".parse::<CombatStrategy>().unwrap(), CombatStrategy::Harass);
        assert!(matches!(
            "turtle".parse::<CombatStrategy>(),
            Err(AgentError::UnknownStrategy { selector: "combat", .. })
        ));
    }

    #[test]
    fn test_harass_staging_route() {
        let map = MapInfo::open(
            100,
            100,
            Vec2Fixed::from_ints(20, 20),
            Vec2Fixed::from_ints(80, 80),
        );
        let (safe, forward) = harass_staging(&map);
        assert_eq!(safe, Vec2Fixed::from_ints(20, 50));
        assert_eq!(forward, Vec2Fixed::from_ints(50, 80));
    }

    #[test]
    fn test_attack_target_falls_back_to_enemy_start() {
        let map = MapInfo::open(
            100,
            100,
            Vec2Fixed::from_ints(20, 20),
            Vec2Fixed::from_ints(80, 80),
        );
        let pools = Pools::default();
        assert_eq!(
            attack_target(&pools, &map, Vec2Fixed::from_ints(30, 30)),
            Vec2Fixed::from_ints(80, 80)
        );
    }
}
