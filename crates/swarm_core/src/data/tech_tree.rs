//! Tech tree lookup: costs, builders and prerequisites per production target.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::unit_type::{AbilityId, UnitTypeId, UpgradeId};

/// The embedded standard table.
const STANDARD_TABLE: &str = include_str!("../../data/tech_tree.ron");

/// Power weight assumed for combat types missing from the table.
pub const DEFAULT_FOREIGN_WEIGHT: u32 = 3;

/// Something the production planner can be asked to make.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProductionTarget {
    /// A unit or structure.
    Unit(UnitTypeId),
    /// A researched upgrade.
    Upgrade(UpgradeId),
}

impl ProductionTarget {
    /// The unit type, if this target is a unit or structure.
    #[must_use]
    pub const fn unit(self) -> Option<UnitTypeId> {
        match self {
            Self::Unit(t) => Some(t),
            Self::Upgrade(_) => None,
        }
    }
}

impl std::fmt::Display for ProductionTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unit(t) => write!(f, "{t:?}"),
            Self::Upgrade(u) => write!(f, "{u:?}"),
        }
    }
}

/// How a target is produced, which decides builder selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductionKind {
    /// Trained from a larva.
    Larva,
    /// Trained directly from a townhall.
    Townhall,
    /// A drone walks out and builds it.
    Worker,
    /// An existing structure morphs into it.
    StructureMorph,
    /// An existing unit morphs into it.
    UnitMorph,
    /// A structure researches it.
    Research,
}

/// Resource and supply cost of one production command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cost {
    /// Mineral cost.
    #[serde(default)]
    pub minerals: u32,
    /// Vespene cost.
    #[serde(default)]
    pub vespene: u32,
    /// Supply consumed.
    #[serde(default)]
    pub supply: u32,
}

/// One row of the tech table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechEntry {
    /// What this row produces.
    pub target: ProductionTarget,
    /// How it is produced.
    pub kind: ProductionKind,
    /// Cost per command.
    pub cost: Cost,
    /// Unit types able to issue the production ability.
    pub builders: Vec<UnitTypeId>,
    /// Units or structures that must exist first.
    #[serde(default)]
    pub required_units: Vec<UnitTypeId>,
    /// Upgrade that must be researched first.
    #[serde(default)]
    pub required_upgrade: Option<UpgradeId>,
    /// Contribution to army power per produced unit.
    #[serde(default)]
    pub army_weight: u32,
}

impl TechEntry {
    /// The ability the builder must be given.
    #[must_use]
    pub fn ability(&self) -> AbilityId {
        match (self.kind, self.target) {
            (ProductionKind::Research, ProductionTarget::Upgrade(u)) => AbilityId::Research(u),
            (ProductionKind::Worker, ProductionTarget::Unit(t)) => AbilityId::Build(t),
            (ProductionKind::StructureMorph | ProductionKind::UnitMorph, ProductionTarget::Unit(t)) => {
                AbilityId::Morph(t)
            }
            (_, ProductionTarget::Unit(t)) => AbilityId::Train(t),
            (_, ProductionTarget::Upgrade(u)) => AbilityId::Research(u),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TechTable {
    entries: Vec<TechEntry>,
    #[serde(default)]
    foreign_weights: Vec<(UnitTypeId, u32)>,
}

/// Lookup table from production target to its requirements.
#[derive(Debug, Clone, Default)]
pub struct TechTree {
    entries: HashMap<ProductionTarget, TechEntry>,
    foreign_weights: HashMap<UnitTypeId, u32>,
}

impl TechTree {
    /// Load the embedded standard table.
    pub fn standard() -> Result<Self> {
        Self::from_ron_str(STANDARD_TABLE)
    }

    /// Load a table from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let table: TechTable =
            ron::from_str(ron).map_err(|e| AgentError::DataParse(e.to_string()))?;
        let mut entries = HashMap::with_capacity(table.entries.len());
        for entry in table.entries {
            if entries.insert(entry.target, entry.clone()).is_some() {
                return Err(AgentError::DataParse(format!(
                    "duplicate entry for {}",
                    entry.target
                )));
            }
        }
        Ok(Self {
            entries,
            foreign_weights: table.foreign_weights.into_iter().collect(),
        })
    }

    /// Look up a target.
    #[must_use]
    pub fn get(&self, target: ProductionTarget) -> Option<&TechEntry> {
        self.entries.get(&target)
    }

    /// Look up a unit or structure target.
    #[must_use]
    pub fn unit(&self, unit_type: UnitTypeId) -> Option<&TechEntry> {
        self.get(ProductionTarget::Unit(unit_type))
    }

    /// Number of rows in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Power weight of a single unit of this type.
    ///
    /// Own types use their table weight (a Zergling entry trains a pair, so
    /// its weight is halved). Foreign types fall back to
    /// [`DEFAULT_FOREIGN_WEIGHT`] when they can attack.
    #[must_use]
    pub fn power_weight(&self, unit_type: UnitTypeId, can_attack: bool) -> u32 {
        if let Some(entry) = self.unit(unit_type) {
            if unit_type == UnitTypeId::Zergling {
                return (entry.army_weight / 2).max(1);
            }
            return entry.army_weight;
        }
        if let Some(weight) = self.foreign_weights.get(&unit_type) {
            return *weight;
        }
        if can_attack {
            DEFAULT_FOREIGN_WEIGHT
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table_loads() {
        let tree = TechTree::standard().unwrap();
        assert!(tree.len() > 40);
        let pool = tree.unit(UnitTypeId::SpawningPool).unwrap();
        assert_eq!(pool.cost.minerals, 200);
        assert_eq!(pool.required_units, vec![UnitTypeId::Hatchery]);
        assert_eq!(pool.ability(), AbilityId::Build(UnitTypeId::SpawningPool));
    }

    #[test]
    fn test_every_requirement_is_producible() {
        let tree = TechTree::standard().unwrap();
        for entry in tree.entries.values() {
            for required in &entry.required_units {
                assert!(
                    tree.unit(*required).is_some(),
                    "{} requires {:?} which has no row",
                    entry.target,
                    required
                );
            }
            if let Some(upgrade) = entry.required_upgrade {
                assert!(tree.get(ProductionTarget::Upgrade(upgrade)).is_some());
            }
        }
    }

    #[test]
    fn test_abilities_by_kind() {
        let tree = TechTree::standard().unwrap();
        assert_eq!(
            tree.unit(UnitTypeId::Lair).unwrap().ability(),
            AbilityId::Morph(UnitTypeId::Lair)
        );
        assert_eq!(
            tree.unit(UnitTypeId::Queen).unwrap().ability(),
            AbilityId::Train(UnitTypeId::Queen)
        );
        assert_eq!(
            tree.get(ProductionTarget::Upgrade(UpgradeId::Burrow))
                .unwrap()
                .ability(),
            AbilityId::Research(UpgradeId::Burrow)
        );
    }

    #[test]
    fn test_power_weights() {
        let tree = TechTree::standard().unwrap();
        assert_eq!(tree.power_weight(UnitTypeId::Roach, true), 4);
        assert_eq!(tree.power_weight(UnitTypeId::Zergling, true), 1);
        assert_eq!(tree.power_weight(UnitTypeId::Marine, true), 2);
        assert_eq!(
            tree.power_weight(UnitTypeId::Other(99), true),
            DEFAULT_FOREIGN_WEIGHT
        );
        assert_eq!(tree.power_weight(UnitTypeId::Other(99), false), 0);
    }

    #[test]
    fn test_duplicate_rows_rejected() {
        let ron = "(entries: [
            (target: Unit(Drone), kind: Larva, cost: (minerals: 50), builders: [Larva]),
            (target: Unit(Drone), kind: Larva, cost: (minerals: 50), builders: [Larva]),
        ])";
        assert!(matches!(
            TechTree::from_ron_str(ron),
            Err(AgentError::DataParse(_))
        ));
    }
}
