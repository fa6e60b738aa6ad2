//! Resource balancing through the full agent pipeline.

use swarm_core::agent::Agent;
use swarm_core::command::{Command, Target};
use swarm_core::config::AgentConfig;
use swarm_core::unit_type::{AbilityId, UnitTypeId};
use swarm_test_utils::fixtures::{fixed_f, pos, standard_map, SnapshotBuilder};

// =============================================================================
// Helpers
// =============================================================================

fn gathers(commands: &[Command]) -> Vec<&Command> {
    commands
        .iter()
        .filter(|c| c.ability == AbilityId::HarvestGather)
        .collect()
}

/// Main base at (30, 30), broke so production stays quiet.
fn main_base(assigned: u32) -> (SnapshotBuilder, Vec<u64>, u64) {
    let mut world = SnapshotBuilder::new();
    world.minerals(0).supply(12, 30);
    let layout = world.resources(30, 30);
    let hatch = world.hatchery(30, 30, 16, assigned);
    for i in 0..assigned as usize {
        let patch = layout.minerals[i % layout.minerals.len()];
        world.harvester(patch, pos(30, 34));
    }
    (world, layout.minerals, hatch)
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn test_idle_workers_fill_deficit_exactly() {
    let (mut world, minerals, hatch) = main_base(12);
    let idle = world.own_many(UnitTypeId::Drone, 4, pos(31, 33));

    let mut agent = Agent::new(AgentConfig::default()).unwrap();
    agent.on_start(standard_map(), &world.build()).unwrap();
    let commands = agent.step(&world.build()).unwrap();

    let sent = gathers(&commands);
    assert_eq!(sent.len(), 4, "commands: {commands:?}");
    for command in &sent {
        assert_eq!(command.units.len(), 1);
        assert!(idle.contains(&command.units[0]));
        let Target::Unit(patch) = command.target else {
            panic!("gather without a unit target: {command:?}");
        };
        assert!(minerals.contains(&patch));
    }

    // The engine now reports the base as saturated.
    for command in &sent {
        world.order(command.units[0], AbilityId::HarvestGather, command.target);
    }
    world.edit(hatch, |h| h.assigned_harvesters = 16).advance(8);
    let commands = agent.step(&world.build()).unwrap();
    assert!(gathers(&commands).is_empty(), "commands: {commands:?}");
}

#[test]
fn test_over_filled_base_stops_one_worker_per_tick() {
    let (mut world, _, hatch) = main_base(12);
    world.edit(hatch, |h| {
        h.ideal_harvesters = 10;
    });

    let mut agent = Agent::new(AgentConfig::default()).unwrap();
    agent.on_start(standard_map(), &world.build()).unwrap();
    let commands = agent.step(&world.build()).unwrap();

    let stops: Vec<_> = commands.iter().filter(|c| c.ability == AbilityId::Stop).collect();
    assert_eq!(stops.len(), 1, "commands: {commands:?}");
}

#[test]
fn test_idle_worker_without_base_stays_idle() {
    let mut world = SnapshotBuilder::new();
    world.minerals(0);
    world.resources(30, 30);
    world.own(UnitTypeId::Drone, pos(30, 34));

    let mut agent = Agent::new(AgentConfig::default()).unwrap();
    agent.on_start(standard_map(), &world.build()).unwrap();
    let commands = agent.step(&world.build()).unwrap();
    assert!(gathers(&commands).is_empty());
}

#[test]
fn test_nearly_finished_base_takes_a_batch_every_interval() {
    let (mut world, main_minerals, _) = main_base(16);
    let expansion = world.resources(70, 30);
    let hatch = world.hatchery(70, 30, 0, 0);
    world.edit(hatch, |h| h.build_progress = fixed_f(0.95)).supply(16, 30);

    let mut agent = Agent::new(AgentConfig::default()).unwrap();
    agent.on_start(standard_map(), &world.build()).unwrap();
    let commands = agent.step(&world.build()).unwrap();

    let sent = gathers(&commands);
    assert_eq!(sent.len(), 4, "commands: {commands:?}");
    for command in &sent {
        let unit = world.unit(command.units[0]).unwrap();
        let Target::Unit(from) = unit.orders[0].target else {
            panic!("harvester without a patch: {unit:?}");
        };
        assert!(main_minerals.contains(&from));
        let Target::Unit(to) = command.target else {
            panic!("gather without a unit target: {command:?}");
        };
        assert!(expansion.minerals.contains(&to));
    }

    world.advance(8);
    let commands = agent.step(&world.build()).unwrap();
    assert!(gathers(&commands).is_empty(), "commands: {commands:?}");

    world.game_loop(224);
    let commands = agent.step(&world.build()).unwrap();
    assert_eq!(gathers(&commands).len(), 4, "commands: {commands:?}");
}

#[test]
fn test_half_built_base_gets_no_workers() {
    let (mut world, _, _) = main_base(16);
    world.resources(70, 30);
    let hatch = world.hatchery(70, 30, 0, 0);
    world.edit(hatch, |h| h.build_progress = fixed_f(0.5));

    let mut agent = Agent::new(AgentConfig::default()).unwrap();
    agent.on_start(standard_map(), &world.build()).unwrap();
    let commands = agent.step(&world.build()).unwrap();
    assert!(gathers(&commands).is_empty(), "commands: {commands:?}");
}
