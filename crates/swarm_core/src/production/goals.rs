//! Goal generation and timing tables per production strategy.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::data::ProductionTarget::{self, Unit, Upgrade};
use crate::error::AgentError;
use crate::pools::Pools;
use crate::snapshot::Snapshot;
use crate::unit_type::{UnitTypeId, UpgradeId};

/// Game loops per game minute.
pub const LOOPS_PER_MINUTE: u32 = 1344;

/// Most copies of one target a single goal list may ask for.
const MAX_BATCH: usize = 6;

/// Drone count the rush strategy stops at.
const RUSH_DRONES: usize = 16;

/// Production strategy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductionStrategy {
    /// Small aggressive goal list.
    #[default]
    Rush,
    /// Time-keyed tech progression.
    #[serde(alias = "advanced-tech", alias = "advanced_tech")]
    Advanced,
}

impl FromStr for ProductionStrategy {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rush" => Ok(Self::Rush),
            "advanced" | "advanced-tech" | "advanced_tech" => Ok(Self::Advanced),
            _ => Err(AgentError::UnknownStrategy {
                selector: "production",
                value: s.to_string(),
            }),
        }
    }
}

const RUSH_OPENING: &[ProductionTarget] = &[
    Unit(UnitTypeId::Drone),
    Unit(UnitTypeId::SpawningPool),
    Unit(UnitTypeId::Drone),
    Unit(UnitTypeId::Overlord),
    Unit(UnitTypeId::Zergling),
    Unit(UnitTypeId::Zergling),
    Unit(UnitTypeId::Zergling),
    Unit(UnitTypeId::Queen),
];

const ADVANCED_OPENING: &[ProductionTarget] = &[
    Unit(UnitTypeId::Drone),
    Unit(UnitTypeId::Drone),
    Unit(UnitTypeId::Overlord),
    Unit(UnitTypeId::Drone),
    Unit(UnitTypeId::Drone),
    Unit(UnitTypeId::Drone),
    Unit(UnitTypeId::Hatchery),
    Unit(UnitTypeId::Drone),
    Unit(UnitTypeId::Extractor),
    Unit(UnitTypeId::SpawningPool),
    Unit(UnitTypeId::Drone),
    Unit(UnitTypeId::Drone),
    Unit(UnitTypeId::Overlord),
    Unit(UnitTypeId::Queen),
    Unit(UnitTypeId::Queen),
    Unit(UnitTypeId::Zergling),
    Upgrade(UpgradeId::ZerglingSpeed),
];

/// Quota rows: from this game minute on, hold these counts.
const ADVANCED_QUOTAS: &[(u32, &[(ProductionTarget, usize)])] = &[
    (
        0,
        &[
            (Unit(UnitTypeId::Queen), 2),
            (Unit(UnitTypeId::Drone), 28),
            (Unit(UnitTypeId::Zergling), 8),
        ],
    ),
    (
        4,
        &[
            (Unit(UnitTypeId::Queen), 3),
            (Unit(UnitTypeId::RoachWarren), 1),
            (Unit(UnitTypeId::Drone), 38),
            (Unit(UnitTypeId::Roach), 8),
            (Unit(UnitTypeId::Lair), 1),
            (Unit(UnitTypeId::EvolutionChamber), 1),
        ],
    ),
    (
        6,
        &[
            (Unit(UnitTypeId::Queen), 4),
            (Upgrade(UpgradeId::GlialReconstitution), 1),
            (Upgrade(UpgradeId::MissileWeapons1), 1),
            (Unit(UnitTypeId::HydraliskDen), 1),
            (Unit(UnitTypeId::Drone), 54),
            (Unit(UnitTypeId::Roach), 16),
            (Unit(UnitTypeId::Hydralisk), 8),
            (Unit(UnitTypeId::Overseer), 1),
        ],
    ),
    (
        9,
        &[
            (Upgrade(UpgradeId::GroundCarapace1), 1),
            (Upgrade(UpgradeId::GroovedSpines), 1),
            (Upgrade(UpgradeId::MuscularAugments), 1),
            (Unit(UnitTypeId::Drone), 66),
            (Unit(UnitTypeId::Roach), 20),
            (Unit(UnitTypeId::Hydralisk), 20),
            (Unit(UnitTypeId::SporeCrawler), 2),
        ],
    ),
    (
        12,
        &[
            (Unit(UnitTypeId::InfestationPit), 1),
            (Unit(UnitTypeId::Hive), 1),
            (Upgrade(UpgradeId::MissileWeapons2), 1),
            (Unit(UnitTypeId::Drone), 70),
            (Unit(UnitTypeId::Roach), 24),
            (Unit(UnitTypeId::Hydralisk), 24),
        ],
    ),
];

/// Worker count above which a new base is wanted, by current base count.
const ADVANCED_EXPANSION: &[usize] = &[14, 30, 44, 58, 68];
const RUSH_EXPANSION: &[usize] = &[24, 40];

/// Worker count at which another extractor is wanted, by extractor count.
const ADVANCED_GAS: &[usize] = &[16, 24, 36, 44, 52, 60];
const RUSH_GAS: &[usize] = &[14];

/// Supply safety margin, by townhall count.
const SUPPLY_MARGIN: &[u32] = &[2, 4, 6, 8];

/// Fixed opening build order.
#[must_use]
pub fn opening(strategy: ProductionStrategy) -> Vec<ProductionTarget> {
    match strategy {
        ProductionStrategy::Rush => RUSH_OPENING.to_vec(),
        ProductionStrategy::Advanced => ADVANCED_OPENING.to_vec(),
    }
}

/// Produce the next goal list once the queue has run dry.
#[must_use]
pub fn generate(strategy: ProductionStrategy, pools: &Pools, snapshot: &Snapshot) -> Vec<ProductionTarget> {
    let goals = match strategy {
        ProductionStrategy::Rush => rush_goals(pools),
        ProductionStrategy::Advanced => advanced_goals(pools, snapshot),
    };
    if goals.is_empty() {
        // Every quota met: keep the larva busy.
        vec![Unit(UnitTypeId::Zergling)]
    } else {
        goals
    }
}

fn rush_goals(pools: &Pools) -> Vec<ProductionTarget> {
    let mut goals = Vec::new();
    if unit_count(pools, UnitTypeId::Drone) < RUSH_DRONES {
        goals.push(Unit(UnitTypeId::Drone));
    }
    if unit_count(pools, UnitTypeId::Queen) < pools.bases.len() {
        goals.push(Unit(UnitTypeId::Queen));
    }
    goals.extend([Unit(UnitTypeId::Zergling); 4]);
    goals
}

fn advanced_goals(pools: &Pools, snapshot: &Snapshot) -> Vec<ProductionTarget> {
    let minutes = snapshot.game_loop / LOOPS_PER_MINUTE;
    let Some((_, quotas)) = ADVANCED_QUOTAS.iter().rev().find(|(from, _)| *from <= minutes) else {
        return Vec::new();
    };

    let mut goals = Vec::new();
    for &(target, quota) in *quotas {
        let missing = match target {
            Upgrade(upgrade) => {
                let done = snapshot.upgrades.contains(&upgrade) || pools.in_progress(target) > 0;
                usize::from(!done)
            }
            // One command trains a pair.
            Unit(UnitTypeId::Zergling) => {
                quota.saturating_sub(unit_count(pools, UnitTypeId::Zergling)).div_ceil(2)
            }
            Unit(unit_type) => quota.saturating_sub(unit_count(pools, unit_type)),
        };
        goals.extend(std::iter::repeat(target).take(missing.min(MAX_BATCH)));
    }
    goals
}

/// Existing plus in-production count of a unit type.
#[must_use]
pub fn unit_count(pools: &Pools, unit_type: UnitTypeId) -> usize {
    let producing = pools.in_progress(Unit(unit_type));
    let per_command = if unit_type == UnitTypeId::Zergling { 2 } else { 1 };
    // Unfinished structures are already counted by `count`.
    let unfinished = if unit_type.is_structure() {
        pools.structures.of_type(unit_type).filter(|s| !s.is_ready()).count()
    } else {
        0
    };
    pools.count(unit_type) + producing.saturating_sub(unfinished) * per_command
}

/// Worker count that triggers an expansion at `bases` bases.
#[must_use]
pub fn expansion_threshold(strategy: ProductionStrategy, bases: usize) -> Option<usize> {
    let table = match strategy {
        ProductionStrategy::Rush => RUSH_EXPANSION,
        ProductionStrategy::Advanced => ADVANCED_EXPANSION,
    };
    table.get(bases.saturating_sub(1)).copied()
}

/// Worker count that triggers another extractor at `extractors` extractors.
#[must_use]
pub fn gas_threshold(strategy: ProductionStrategy, extractors: usize) -> Option<usize> {
    let table = match strategy {
        ProductionStrategy::Rush => RUSH_GAS,
        ProductionStrategy::Advanced => ADVANCED_GAS,
    };
    table.get(extractors).copied()
}

/// Supply headroom to keep at `townhalls` townhalls.
#[must_use]
pub fn supply_margin(townhalls: usize) -> u32 {
    let idx = townhalls.saturating_sub(1).min(SUPPLY_MARGIN.len() - 1);
    SUPPLY_MARGIN[idx]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("rush".parse::<ProductionStrategy>().unwrap(), ProductionStrategy::Rush);
        assert_eq!(
            "advanced-tech".parse::<ProductionStrategy>().unwrap(),
            ProductionStrategy::Advanced
        );
        let err = "turtle".parse::<ProductionStrategy>().unwrap_err();
        assert!(matches!(err, AgentError::UnknownStrategy { selector: "production", .. }));
    }

    #[test]
    fn test_threshold_tables() {
        assert_eq!(expansion_threshold(ProductionStrategy::Advanced, 1), Some(14));
        assert_eq!(expansion_threshold(ProductionStrategy::Advanced, 2), Some(30));
        assert_eq!(expansion_threshold(ProductionStrategy::Rush, 1), Some(24));
        assert_eq!(expansion_threshold(ProductionStrategy::Rush, 2), Some(40));
        assert_eq!(expansion_threshold(ProductionStrategy::Rush, 3), None);
        assert_eq!(gas_threshold(ProductionStrategy::Rush, 0), Some(14));
        assert_eq!(gas_threshold(ProductionStrategy::Advanced, 0), Some(16));
        assert_eq!(gas_threshold(ProductionStrategy::Rush, 1), None);
        assert_eq!(supply_margin(0), 2);
        assert_eq!(supply_margin(3), 6);
        assert_eq!(supply_margin(9), 8);
    }

    #[test]
    fn test_goals_never_empty() {
        let pools = Pools::default();
        let snapshot = Snapshot::default();
        assert!(!generate(ProductionStrategy::Rush, &pools, &snapshot).is_empty());
        let advanced = generate(ProductionStrategy::Advanced, &pools, &snapshot);
        assert!(advanced.contains(&Unit(UnitTypeId::Queen)));
        // Capped per target.
        let drones = advanced.iter().filter(|t| **t == Unit(UnitTypeId::Drone)).count();
        assert_eq!(drones, MAX_BATCH);
    }

    #[test]
    fn test_quotas_follow_game_time() {
        let pools = Pools::default();
        let snapshot = Snapshot {
            game_loop: LOOPS_PER_MINUTE * 7,
            ..Snapshot::default()
        };
        let goals = generate(ProductionStrategy::Advanced, &pools, &snapshot);
        assert!(goals.contains(&Upgrade(UpgradeId::GlialReconstitution)));
        assert!(!goals.contains(&Unit(UnitTypeId::Zergling)));
    }
}
