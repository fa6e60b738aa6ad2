//! Agent configuration.
//!
//! Read once at construction, either from a RON document or from a flat
//! `name → value` option map. Unknown option names are ignored; a known
//! strategy selector with an unknown value is fatal.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::combat::{CombatStrategy, MicroVersion, DEFAULT_SQUAD_SIZE};
use crate::error::{AgentError, Result};
use crate::placement::PlacementStrategy;
use crate::production::{ProductionStrategy, DEFAULT_STALL_LIMIT};

const LEVELS: &[&str] = &["off", "error", "warn", "info", "debug", "trace"];

/// Log level per subsystem, as `tracing` level names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Verbosity {
    /// Production planner and executor.
    pub production: String,
    /// Resource balancer.
    pub economy: String,
    /// Squads and strategy.
    pub combat: String,
    /// Placement solver.
    pub placement: String,
    /// Entity pools.
    pub pools: String,
    /// Scouting.
    pub scouting: String,
}

impl Default for Verbosity {
    fn default() -> Self {
        let info = || "info".to_string();
        Self {
            production: info(),
            economy: info(),
            combat: info(),
            placement: "warn".to_string(),
            pools: "warn".to_string(),
            scouting: info(),
        }
    }
}

impl Verbosity {
    fn slot(&mut self, subsystem: &str) -> Option<&mut String> {
        match subsystem {
            "production" => Some(&mut self.production),
            "economy" => Some(&mut self.economy),
            "combat" => Some(&mut self.combat),
            "placement" => Some(&mut self.placement),
            "pools" => Some(&mut self.pools),
            "scouting" => Some(&mut self.scouting),
            _ => None,
        }
    }

    /// `EnvFilter` directive string with one directive per subsystem.
    #[must_use]
    pub fn log_filter(&self) -> String {
        [
            ("production", &self.production),
            ("economy", &self.economy),
            ("combat", &self.combat),
            ("placement", &self.placement),
            ("pools", &self.pools),
            ("scouting", &self.scouting),
        ]
        .iter()
        .fold("warn".to_string(), |mut acc, (name, level)| {
            acc.push_str(&format!(",swarm_core::{name}={level}"));
            acc
        })
    }
}

/// Everything the agent reads at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Combat strategy.
    pub combat_strategy: CombatStrategy,
    /// Production strategy.
    pub production_strategy: ProductionStrategy,
    /// Building placement strategy.
    pub placement_strategy: PlacementStrategy,
    /// Default micro tactic set.
    pub micro_version: MicroVersion,
    /// Per-subsystem log levels.
    pub verbosity: Verbosity,
    /// Seed for squad sampling and rim placement.
    pub seed: u64,
    /// Game loops a head deadlocked on a prerequisite may wait before being abandoned.
    pub stall_limit: Option<u32>,
    /// Members per general squad.
    pub squad_size: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            combat_strategy: CombatStrategy::default(),
            production_strategy: ProductionStrategy::default(),
            placement_strategy: PlacementStrategy::default(),
            micro_version: MicroVersion::default(),
            verbosity: Verbosity::default(),
            seed: 0,
            stall_limit: Some(DEFAULT_STALL_LIMIT),
            squad_size: DEFAULT_SQUAD_SIZE,
        }
    }
}

impl AgentConfig {
    /// Parse a RON document. Missing fields take their defaults.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        ron::from_str(ron).map_err(|e| AgentError::ConfigParse(e.to_string()))
    }

    /// Serialize to pretty RON.
    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| AgentError::ConfigParse(e.to_string()))
    }

    /// Build a config from defaults plus a flat option map.
    pub fn from_options(options: &BTreeMap<String, String>) -> Result<Self> {
        let mut config = Self::default();
        for (name, value) in options {
            config.apply_option(name, value)?;
        }
        Ok(config)
    }

    /// Apply one named option. Unknown names are ignored.
    pub fn apply_option(&mut self, name: &str, value: &str) -> Result<()> {
        let key = name.trim().to_ascii_lowercase().replace('-', "_");
        let invalid = || AgentError::InvalidOption {
            name: name.to_string(),
            value: value.to_string(),
        };
        match key.as_str() {
            "combat_strategy" | "combat" => self.combat_strategy = value.parse()?,
            "production_strategy" | "production" => self.production_strategy = value.parse()?,
            "placement_strategy" | "placement" => self.placement_strategy = value.parse()?,
            "micro_version" | "micro" => self.micro_version = value.parse()?,
            "seed" => self.seed = value.trim().parse().map_err(|_| invalid())?,
            "squad_size" => {
                let size: usize = value.trim().parse().map_err(|_| invalid())?;
                if size == 0 {
                    return Err(invalid());
                }
                self.squad_size = size;
            }
            "stall_limit" => {
                self.stall_limit = match value.trim() {
                    "none" | "off" => None,
                    v => Some(v.parse().map_err(|_| invalid())?),
                };
            }
            _ => {
                let Some(subsystem) = key.strip_prefix("verbosity.").or_else(|| key.strip_prefix("verbosity_"))
                else {
                    return Ok(());
                };
                let level = value.trim().to_ascii_lowercase();
                if !LEVELS.contains(&level.as_str()) {
                    return Err(invalid());
                }
                if let Some(slot) = self.verbosity.slot(subsystem) {
                    *slot = level;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_options_with_aliases() {
        let config = AgentConfig::from_options(&options(&[
            ("combat_strategy", "reform/defensive"),
            ("production_strategy", "advanced-tech"),
            ("placement_strategy", "naive-predefined"),
            ("micro_version", "v2"),
            ("seed", "7"),
            ("verbosity.combat", "debug"),
            ("colour", "purple"),
        ]))
        .unwrap();
        assert_eq!(config.combat_strategy, CombatStrategy::Reform);
        assert_eq!(config.production_strategy, ProductionStrategy::Advanced);
        assert_eq!(config.placement_strategy, PlacementStrategy::NaivePredefined);
        assert_eq!(config.micro_version, MicroVersion::V2);
        assert_eq!(config.seed, 7);
        assert_eq!(config.verbosity.combat, "debug");
    }

    #[test]
    fn test_unknown_strategy_is_fatal() {
        let err = AgentConfig::from_options(&options(&[("combat_strategy", "turtle")])).unwrap_err();
        assert!(matches!(err, AgentError::UnknownStrategy { selector: "combat", .. }));

        let err = AgentConfig::from_options(&options(&[("seed", "abc")])).unwrap_err();
        assert!(matches!(err, AgentError::InvalidOption { .. }));
    }

    #[test]
    fn test_ron_defaults_fill_in() {
        let config = AgentConfig::from_ron_str("(combat_strategy: harass, stall_limit: None)").unwrap();
        assert_eq!(config.combat_strategy, CombatStrategy::Harass);
        assert_eq!(config.stall_limit, None);
        assert_eq!(config.squad_size, DEFAULT_SQUAD_SIZE);

        let text = config.to_ron_string().unwrap();
        assert_eq!(AgentConfig::from_ron_str(&text).unwrap(), config);
    }

    #[test]
    fn test_log_filter_lists_subsystems() {
        let filter = Verbosity::default().log_filter();
        assert!(filter.starts_with("warn,"));
        assert!(filter.contains("swarm_core::combat=info"));
        assert!(filter.contains("swarm_core::pools=warn"));
    }
}
