//! Per-unit combat micro.
//!
//! Dispatch goes through a lookup table from unit type to tactic, built once
//! per [`MicroVersion`]. A tactic is a plain function of the engagement and
//! returns exactly one command, so new unit types are handled by adding a
//! row rather than touching the callers.

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::command::{Command, Target};
use crate::error::AgentError;
use crate::math::{Fixed, Vec2Fixed};
use crate::snapshot::UnitSnapshot;
use crate::unit_type::{AbilityId, UnitTypeId};

/// Burrow below this health percentage.
const BURROW_BELOW: u32 = 35;

/// Unburrow once healed to this percentage.
const UNBURROW_AT: u32 = 80;

/// Enemies this close trigger kiting while the weapon reloads.
const KITE_TRIGGER: i32 = 4;

/// Distance a kiting unit steps back.
const KITE_STEP: i32 = 2;

/// Transfusion reach.
const TRANSFUSE_RANGE: i32 = 7;

/// Energy a transfusion costs.
const TRANSFUSE_ENERGY: u32 = 50;

/// Allies at or above this health are not worth a transfusion.
const TRANSFUSE_BELOW: u32 = 60;

/// Tactic set selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MicroVersion {
    /// Attack-move for everything.
    #[default]
    V1,
    /// Type-specific tactics.
    V2,
}

impl FromStr for MicroVersion {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v1" | "basic" => Ok(Self::V1),
            "v2" | "tactical" => Ok(Self::V2),
            _ => Err(AgentError::UnknownStrategy {
                selector: "micro",
                value: s.to_string(),
            }),
        }
    }
}

/// What a single unit sees when told to fight.
#[derive(Debug, Clone, Copy)]
pub struct Engagement<'a> {
    /// The unit to command.
    pub unit: &'a UnitSnapshot,
    /// Where its squad is attacking.
    pub target: Vec2Fixed,
    /// Visible enemies.
    pub enemies: &'a [&'a UnitSnapshot],
    /// Visible own units.
    pub allies: &'a [&'a UnitSnapshot],
}

/// A per-unit tactic.
pub type Tactic = fn(&Engagement<'_>) -> Command;

/// Unit type to tactic lookup.
#[derive(Clone)]
pub struct MicroTable {
    fallback: Tactic,
    tactics: HashMap<UnitTypeId, Tactic>,
}

impl std::fmt::Debug for MicroTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut specialised: Vec<_> = self.tactics.keys().collect();
        specialised.sort();
        f.debug_struct("MicroTable")
            .field("specialised", &specialised)
            .finish_non_exhaustive()
    }
}

impl MicroTable {
    /// Build the table for `version`.
    #[must_use]
    pub fn new(version: MicroVersion) -> Self {
        let mut table = Self {
            fallback: attack_move,
            tactics: HashMap::new(),
        };
        if version == MicroVersion::V2 {
            table.register(UnitTypeId::Roach, burrow_recover);
            table.register(UnitTypeId::Hydralisk, kite);
            table.register(UnitTypeId::Ravager, kite);
            table.register(UnitTypeId::Mutalisk, kite);
            table.register(UnitTypeId::Queen, transfuse);
        }
        table
    }

    /// Add or replace the tactic for a unit type.
    pub fn register(&mut self, unit_type: UnitTypeId, tactic: Tactic) {
        self.tactics.insert(unit_type, tactic);
    }

    /// Check if `unit_type` has its own row.
    #[must_use]
    pub fn is_specialised(&self, unit_type: UnitTypeId) -> bool {
        self.tactics.contains_key(&unit_type)
    }

    /// Resolve the tactic for a unit type.
    #[must_use]
    pub fn tactic(&self, unit_type: UnitTypeId) -> Tactic {
        self.tactics.get(&unit_type).copied().unwrap_or(self.fallback)
    }

    /// Run the tactic for the engaged unit.
    #[must_use]
    pub fn command(&self, engagement: &Engagement<'_>) -> Command {
        (self.tactic(engagement.unit.unit_type))(engagement)
    }
}

/// Attack-move to the squad target.
#[must_use]
pub fn attack_move(e: &Engagement<'_>) -> Command {
    Command::attack_move(e.unit.tag, e.target)
}

/// Burrow when badly hurt, stay under until healed, then resurface.
#[must_use]
pub fn burrow_recover(e: &Engagement<'_>) -> Command {
    let health = e.unit.health_percent();
    match (e.unit.is_burrowed, health) {
        (false, h) if h < BURROW_BELOW => Command::new(AbilityId::BurrowDown, e.unit.tag, Target::None),
        (true, h) if h >= UNBURROW_AT => Command::new(AbilityId::BurrowUp, e.unit.tag, Target::None),
        (true, _) => Command::hold(e.unit.tag),
        (false, _) => attack_move(e),
    }
}

/// Step away from the closest enemy while the weapon reloads.
#[must_use]
pub fn kite(e: &Engagement<'_>) -> Command {
    if e.unit.weapon_cooldown == 0 {
        return attack_move(e);
    }
    let pos = e.unit.position;
    let closest = e
        .enemies
        .iter()
        .filter(|enemy| enemy.position.is_within(pos, Fixed::from_num(KITE_TRIGGER)))
        .min_by_key(|enemy| (enemy.position.distance_squared(pos), enemy.tag));
    match closest {
        Some(enemy) => {
            let away = (pos - enemy.position).normalize();
            if away == Vec2Fixed::ZERO {
                return attack_move(e);
            }
            Command::move_to(e.unit.tag, pos + away.scale(Fixed::from_num(KITE_STEP)))
        }
        None => attack_move(e),
    }
}

/// Heal the most hurt ally in range, otherwise fight.
#[must_use]
pub fn transfuse(e: &Engagement<'_>) -> Command {
    if e.unit.energy < TRANSFUSE_ENERGY {
        return attack_move(e);
    }
    let range = Fixed::from_num(TRANSFUSE_RANGE);
    let patient = e
        .allies
        .iter()
        .filter(|a| a.tag != e.unit.tag && !a.is_structure)
        .filter(|a| a.position.is_within(e.unit.position, range))
        .filter(|a| a.health_percent() < TRANSFUSE_BELOW)
        .min_by_key(|a| (a.health_percent(), a.tag));
    match patient {
        Some(ally) => Command::new(AbilityId::Transfusion, e.unit.tag, Target::Unit(ally.tag)),
        None => attack_move(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Alliance;

    fn unit(tag: u64, unit_type: UnitTypeId, x: i32, y: i32) -> UnitSnapshot {
        UnitSnapshot::new(tag, unit_type, Alliance::Own, Vec2Fixed::from_ints(x, y))
    }

    fn engage<'a>(
        me: &'a UnitSnapshot,
        enemies: &'a [&'a UnitSnapshot],
        allies: &'a [&'a UnitSnapshot],
    ) -> Engagement<'a> {
        Engagement {
            unit: me,
            target: Vec2Fixed::from_ints(50, 50),
            enemies,
            allies,
        }
    }

    #[test]
    fn test_v1_attack_moves_everything() {
        let table = MicroTable::new(MicroVersion::V1);
        let mut roach = unit(1, UnitTypeId::Roach, 0, 0);
        roach.health = 10;
        let cmd = table.command(&engage(&roach, &[], &[]));
        assert_eq!(cmd, Command::attack_move(1, Vec2Fixed::from_ints(50, 50)));
    }

    #[test]
    fn test_roach_burrow_cycle() {
        let table = MicroTable::new(MicroVersion::V2);
        let mut roach = unit(1, UnitTypeId::Roach, 0, 0);
        roach.health = 30;
        assert_eq!(table.command(&engage(&roach, &[], &[])).ability, AbilityId::BurrowDown);

        roach.is_burrowed = true;
        assert_eq!(table.command(&engage(&roach, &[], &[])).ability, AbilityId::HoldPosition);

        roach.health = roach.health_max;
        assert_eq!(table.command(&engage(&roach, &[], &[])).ability, AbilityId::BurrowUp);
    }

    #[test]
    fn test_kite_steps_away_on_cooldown() {
        let mut hydra = unit(1, UnitTypeId::Hydralisk, 10, 10);
        hydra.weapon_cooldown = 5;
        let zealot = UnitSnapshot::new(9, UnitTypeId::Zealot, Alliance::Enemy, Vec2Fixed::from_ints(12, 10));
        let enemies = [&zealot];
        let cmd = kite(&engage(&hydra, &enemies, &[]));
        assert_eq!(cmd, Command::move_to(1, Vec2Fixed::from_ints(8, 10)));

        hydra.weapon_cooldown = 0;
        assert_eq!(kite(&engage(&hydra, &enemies, &[])).ability, AbilityId::Attack);
    }

    #[test]
    fn test_transfuse_picks_most_hurt_ally() {
        let mut queen = unit(1, UnitTypeId::Queen, 0, 0);
        queen.energy = 60;
        let mut a = unit(2, UnitTypeId::Roach, 2, 0);
        a.health = a.health_max / 2;
        let mut b = unit(3, UnitTypeId::Roach, 3, 0);
        b.health = a.health_max / 4;
        let mut far = unit(4, UnitTypeId::Roach, 30, 0);
        far.health = 1;
        let allies = [&queen, &a, &b, &far];
        let cmd = transfuse(&engage(&queen, &[], &allies));
        assert_eq!(cmd, Command::new(AbilityId::Transfusion, 1, Target::Unit(3)));
    }

    #[test]
    fn test_register_overrides() {
        let mut table = MicroTable::new(MicroVersion::V1);
        assert!(!table.is_specialised(UnitTypeId::Zergling));
        table.register(UnitTypeId::Zergling, kite);
        assert!(table.is_specialised(UnitTypeId::Zergling));
    }
}
