//! Agent orchestration.
//!
//! [`Agent`] owns the pools, the channels and every subsystem. Each call to
//! [`Agent::step`] refreshes the pools, builds a fresh [`TickContext`] and
//! runs the subsystems in a fixed order:
//!
//! 1. pools update
//! 2. scouting
//! 3. production planner
//! 4. larva injector
//! 5. combat strategy
//! 6. resource balancer
//! 7. production executor
//!
//! The command batch of the tick is whatever the context collected.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::channels::Channels;
use crate::combat::CombatPlanner;
use crate::command::Command;
use crate::config::AgentConfig;
use crate::context::TickContext;
use crate::data::TechTree;
use crate::economy::ResourceBalancer;
use crate::error::{AgentError, Result};
use crate::placement::PlacementSolver;
use crate::pools::{CombatState, Pools};
use crate::production::{LarvaInjector, ProductionExecutor, ProductionPlanner};
use crate::scouting::ScoutingManager;
use crate::snapshot::{MapInfo, Snapshot};

/// The decision pipeline.
#[derive(Debug)]
pub struct Agent {
    config: AgentConfig,
    tech: TechTree,
    map: Option<MapInfo>,
    pools: Pools,
    channels: Channels,
    scouting: ScoutingManager,
    planner: ProductionPlanner,
    injector: LarvaInjector,
    combat: CombatPlanner,
    balancer: ResourceBalancer,
    executor: ProductionExecutor,
    ticks: u64,
}

impl Agent {
    /// Create an agent with the embedded tech table.
    pub fn new(config: AgentConfig) -> Result<Self> {
        Ok(Self::with_tech(config, TechTree::standard()?))
    }

    /// Create an agent from a flat option map.
    pub fn from_options(options: &BTreeMap<String, String>) -> Result<Self> {
        Self::new(AgentConfig::from_options(options)?)
    }

    /// Create an agent with a custom tech table.
    #[must_use]
    pub fn with_tech(config: AgentConfig, tech: TechTree) -> Self {
        let planner = ProductionPlanner::new(config.production_strategy, config.stall_limit);
        let combat = CombatPlanner::new(
            config.combat_strategy,
            config.micro_version,
            config.seed,
            config.squad_size,
        );
        // Separate streams so squad sampling never shifts placement.
        let placement = PlacementSolver::new(config.placement_strategy, config.seed.wrapping_add(1));
        Self {
            tech,
            map: None,
            pools: Pools::new(),
            channels: Channels::default(),
            scouting: ScoutingManager::new(),
            planner,
            injector: LarvaInjector::new(),
            combat,
            balancer: ResourceBalancer::new(),
            executor: ProductionExecutor::new(placement),
            ticks: 0,
            config,
        }
    }

    /// Begin an episode. Every subsystem is rebuilt from the config, so
    /// nothing carries over from a previous episode.
    pub fn on_start(&mut self, map: MapInfo, snapshot: &Snapshot) -> Result<()> {
        info!(
            combat = ?self.config.combat_strategy,
            production = ?self.config.production_strategy,
            placement = ?self.config.placement_strategy,
            "episode start"
        );
        let tech = std::mem::take(&mut self.tech);
        *self = Self::with_tech(self.config.clone(), tech);
        self.pools.update(snapshot, &map, &self.tech)?;
        self.map = Some(map);
        Ok(())
    }

    /// Run the pipeline for one snapshot and return the command batch.
    ///
    /// Only invariant violations and a missing `on_start` are errors.
    pub fn step(&mut self, snapshot: &Snapshot) -> Result<Vec<Command>> {
        let map = self.map.as_ref().ok_or(AgentError::NotStarted)?;

        self.pools.update(snapshot, map, &self.tech)?;
        sync_squad_membership(&mut self.pools, &self.combat);
        self.scouting.assign(&mut self.pools, map);
        self.channels.clear();

        let mut ctx = TickContext::new(snapshot, map, &self.tech, &self.pools, &mut self.channels);
        self.scouting.run(&mut ctx);
        self.planner.tick(&mut ctx);
        self.injector.request(&mut ctx);
        self.injector.run(&mut ctx);
        self.combat.run(&mut ctx);
        self.balancer.run(&mut ctx);
        let failed = self.executor.run(&mut ctx);
        let commands = ctx.into_commands();

        for target in failed {
            self.planner.requeue(target);
        }
        self.ticks += 1;
        debug!(
            tick = self.ticks,
            game_loop = snapshot.game_loop,
            commands = commands.len(),
            "step"
        );
        Ok(commands)
    }

    /// The configuration the agent was built with.
    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// The tech table.
    #[must_use]
    pub fn tech(&self) -> &TechTree {
        &self.tech
    }

    /// Map info, once started.
    #[must_use]
    pub fn map(&self) -> Option<&MapInfo> {
        self.map.as_ref()
    }

    /// Entity pools as of the last step.
    #[must_use]
    pub fn pools(&self) -> &Pools {
        &self.pools
    }

    /// The production planner.
    #[must_use]
    pub fn planner(&self) -> &ProductionPlanner {
        &self.planner
    }

    /// Mutable production planner, for seeding scenarios.
    pub fn planner_mut(&mut self) -> &mut ProductionPlanner {
        &mut self.planner
    }

    /// The combat planner.
    #[must_use]
    pub fn combat(&self) -> &CombatPlanner {
        &self.combat
    }

    /// The resource balancer.
    #[must_use]
    pub fn balancer(&self) -> &ResourceBalancer {
        &self.balancer
    }

    /// Steps run since `on_start`.
    #[must_use]
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }
}

/// Mirror squad membership into the army pool's per-unit flag.
fn sync_squad_membership(pools: &mut Pools, combat: &CombatPlanner) {
    let tags: Vec<_> = pools.army.tags().collect();
    for tag in tags {
        pools.army.set_state(tag, CombatState::Unassigned);
    }
    for (tag, squad) in combat.squads().membership() {
        pools.army.set_state(tag, CombatState::InSquad(squad));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec2Fixed;

    #[test]
    fn test_step_before_start_fails() {
        let mut agent = Agent::new(AgentConfig::default()).unwrap();
        let err = agent.step(&Snapshot::default()).unwrap_err();
        assert!(matches!(err, AgentError::NotStarted));
    }

    #[test]
    fn test_empty_world_is_quiet() {
        let mut agent = Agent::new(AgentConfig::default()).unwrap();
        let map = MapInfo::open(64, 64, Vec2Fixed::from_ints(10, 10), Vec2Fixed::from_ints(54, 54));
        agent.on_start(map, &Snapshot::default()).unwrap();
        let commands = agent.step(&Snapshot::default()).unwrap();
        assert!(commands.is_empty());
        assert_eq!(agent.ticks(), 1);
    }
}
