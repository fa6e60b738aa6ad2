//! Combat: squads, strategy state machine, army power and per-unit micro.

mod micro;
mod power;
mod squad;
mod strategy;

pub use micro::{attack_move, burrow_recover, kite, transfuse, Engagement, MicroTable, MicroVersion, Tactic};
pub use power::{army_power, outweighs, tags_power, unit_power};
pub use squad::{Squad, SquadManager, SquadRole, SquadStatus, DEFAULT_BLACKLIST, DEFAULT_SQUAD_SIZE};
pub use strategy::{
    attack_target, harass_staging, rally_point, CombatPlanner, CombatStrategy, HarassPhase,
    ARRIVAL_RADIUS, DEFEND_RADIUS,
};
