//! Production planner and executor through the full agent pipeline.

use swarm_core::agent::Agent;
use swarm_core::command::Target;
use swarm_core::config::AgentConfig;
use swarm_core::data::ProductionTarget;
use swarm_core::command::Command;
use swarm_core::production::{CutInReason, PlannerState, INJECT_COOLDOWN};
use swarm_core::unit_type::{AbilityId, UnitTypeId};
use swarm_test_utils::fixtures::{pos, standard_map, standard_opening, SnapshotBuilder};

// =============================================================================
// Helpers
// =============================================================================

fn seeded_agent(world: &SnapshotBuilder, queue: &[ProductionTarget]) -> Agent {
    let mut agent = Agent::new(AgentConfig::default()).unwrap();
    agent.on_start(standard_map(), &world.build()).unwrap();
    agent.planner_mut().skip_opening();
    agent.planner_mut().queue_mut().extend(queue.iter().copied());
    agent
}

fn queued(agent: &Agent) -> Vec<(ProductionTarget, Option<CutInReason>)> {
    agent.planner().queue().iter().map(|i| (i.target, i.cut_in)).collect()
}

fn injects(commands: &[Command]) -> Vec<&Command> {
    commands
        .iter()
        .filter(|c| c.ability == AbilityId::InjectLarva)
        .collect()
}

/// Broke main with a spare expansion cluster at (70, 30).
fn crowded_main(drones: usize) -> SnapshotBuilder {
    let mut world = SnapshotBuilder::new();
    world.minerals(0).supply(25, 26);
    world.resources(30, 30);
    world.resources(70, 30);
    world.hatchery(30, 30, 16, 0);
    world.own_many(UnitTypeId::Drone, drones, pos(30, 33));
    world
}

/// Ready hatchery with no larva and a queen beside it.
fn queen_at_hatchery(energy: u32) -> (SnapshotBuilder, u64, u64) {
    let mut world = SnapshotBuilder::new();
    world.minerals(0).supply(12, 30);
    world.resources(30, 30);
    let hatch = world.hatchery(30, 30, 16, 0);
    let queen = world.own(UnitTypeId::Queen, pos(30, 27));
    world.edit(queen, |q| q.energy = energy);
    (world, hatch, queen)
}

fn started(world: &SnapshotBuilder, config: AgentConfig) -> Agent {
    let mut agent = Agent::new(config).unwrap();
    agent.on_start(standard_map(), &world.build()).unwrap();
    agent
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn test_extractor_goes_on_a_free_geyser() {
    let mut world = SnapshotBuilder::new();
    world.minerals(25).supply(12, 30);
    let layout = world.resources(30, 30);
    world.hatchery(30, 30, 16, 0);
    let drone = world.own(UnitTypeId::Drone, pos(30, 33));

    let mut agent = seeded_agent(&world, &[ProductionTarget::Unit(UnitTypeId::Extractor)]);
    let commands = agent.step(&world.build()).unwrap();

    assert_eq!(commands.len(), 1, "commands: {commands:?}");
    let command = &commands[0];
    assert_eq!(command.ability, AbilityId::Build(UnitTypeId::Extractor));
    assert_eq!(command.units, vec![drone]);
    let Target::Unit(geyser) = command.target else {
        panic!("extractor without a geyser target: {command:?}");
    };
    assert!(layout.geysers.contains(&geyser));
    assert!(agent.planner().queue().is_empty());
}

#[test]
fn test_unaffordable_head_waits_in_queue() {
    let mut world = SnapshotBuilder::new();
    world.minerals(10).supply(12, 30);
    world.resources(30, 30);
    world.hatchery(30, 30, 16, 0);
    world.own(UnitTypeId::Drone, pos(30, 33));

    let mut agent = seeded_agent(&world, &[ProductionTarget::Unit(UnitTypeId::Extractor)]);
    let commands = agent.step(&world.build()).unwrap();

    assert!(commands.iter().all(|c| c.ability != AbilityId::Build(UnitTypeId::Extractor)));
    assert_eq!(
        agent.planner().queue().head().map(|h| h.target),
        Some(ProductionTarget::Unit(UnitTypeId::Extractor))
    );
}

#[test]
fn test_opening_trains_a_drone_from_larva() {
    let mut opening = standard_opening();
    opening.world.supply(12, 30);
    let mut agent = Agent::new(AgentConfig::default()).unwrap();
    agent.on_start(standard_map(), &opening.world.build()).unwrap();
    assert_eq!(agent.planner().state(), PlannerState::OnStart);

    let commands = agent.step(&opening.world.build()).unwrap();

    let trains: Vec<_> = commands
        .iter()
        .filter(|c| c.ability == AbilityId::Train(UnitTypeId::Drone))
        .collect();
    assert_eq!(trains.len(), 1, "commands: {commands:?}");
    assert!(opening.larva.contains(&trains[0].units[0]));
    assert_eq!(agent.planner().state(), PlannerState::Planning);
}

#[test]
fn test_supply_cut_in_precedes_opening() {
    let mut opening = standard_opening();
    opening.world.minerals(100);
    let mut agent = Agent::new(AgentConfig::default()).unwrap();
    agent.on_start(standard_map(), &opening.world.build()).unwrap();

    let commands = agent.step(&opening.world.build()).unwrap();

    let trains: Vec<_> = commands
        .iter()
        .filter(|c| matches!(c.ability, AbilityId::Train(_)))
        .collect();
    assert_eq!(trains.len(), 1, "commands: {commands:?}");
    assert_eq!(trains[0].ability, AbilityId::Train(UnitTypeId::Overlord));
    assert_eq!(
        agent.planner().queue().head().map(|h| h.target),
        Some(ProductionTarget::Unit(UnitTypeId::Drone))
    );
}

#[test]
fn test_missing_prerequisite_cuts_in_ahead() {
    let mut world = SnapshotBuilder::new();
    world.minerals(0).supply(12, 30);
    world.resources(30, 30);
    world.hatchery(30, 30, 16, 0);
    world.own(UnitTypeId::Drone, pos(30, 33));
    world.own(UnitTypeId::Larva, pos(30, 28));

    let mut agent = seeded_agent(&world, &[ProductionTarget::Unit(UnitTypeId::Zergling)]);
    agent.step(&world.build()).unwrap();

    assert_eq!(
        agent.planner().queue().head().map(|h| h.target),
        Some(ProductionTarget::Unit(UnitTypeId::SpawningPool))
    );
}

// =============================================================================
// Cut-ins
// =============================================================================

#[test]
fn test_cut_ins_stack_supply_expansion_gas() {
    let world = crowded_main(25);
    let mut agent = seeded_agent(&world, &[ProductionTarget::Unit(UnitTypeId::Zergling)]);
    agent.step(&world.build()).unwrap();

    // Each cut-in goes to the front, so the last one applied leads.
    assert_eq!(
        queued(&agent),
        vec![
            (ProductionTarget::Unit(UnitTypeId::Extractor), Some(CutInReason::Gas)),
            (ProductionTarget::Unit(UnitTypeId::Hatchery), Some(CutInReason::Expansion)),
            (ProductionTarget::Unit(UnitTypeId::Overlord), Some(CutInReason::Supply)),
            (ProductionTarget::Unit(UnitTypeId::Zergling), None),
        ]
    );
}

#[test]
fn test_expansion_needs_more_workers_than_threshold() {
    // 24 drones sits exactly on the one-base expansion threshold.
    let world = crowded_main(24);
    let mut agent = seeded_agent(&world, &[ProductionTarget::Unit(UnitTypeId::Zergling)]);
    agent.step(&world.build()).unwrap();

    let targets: Vec<_> = queued(&agent).into_iter().map(|(t, _)| t).collect();
    assert!(!targets.contains(&ProductionTarget::Unit(UnitTypeId::Hatchery)), "{targets:?}");
    assert_eq!(targets[0], ProductionTarget::Unit(UnitTypeId::Extractor));
}

#[test]
fn test_gas_waits_below_threshold() {
    let mut world = crowded_main(13);
    world.supply(13, 30);
    let mut agent = seeded_agent(&world, &[ProductionTarget::Unit(UnitTypeId::Zergling)]);
    agent.step(&world.build()).unwrap();

    let targets: Vec<_> = queued(&agent).into_iter().map(|(t, _)| t).collect();
    assert!(!targets.contains(&ProductionTarget::Unit(UnitTypeId::Extractor)), "{targets:?}");
}

#[test]
fn test_deadlock_cut_in_runs_after_others() {
    let mut world = crowded_main(25);
    world.supply(25, 40);
    let mut agent = seeded_agent(&world, &[ProductionTarget::Unit(UnitTypeId::Zergling)]);
    agent.step(&world.build()).unwrap();

    // Only the head is checked for prerequisites, and the extractor has none.
    let targets: Vec<_> = queued(&agent).into_iter().map(|(t, _)| t).collect();
    assert_eq!(targets[0], ProductionTarget::Unit(UnitTypeId::Extractor));
    assert!(!targets.contains(&ProductionTarget::Unit(UnitTypeId::SpawningPool)), "{targets:?}");
}

// =============================================================================
// Stall handling
// =============================================================================

#[test]
fn test_deadlocked_head_is_abandoned() {
    let mut world = SnapshotBuilder::new();
    world.minerals(0).supply(12, 30);
    world.resources(30, 30);
    world.hatchery(30, 30, 16, 0);
    world.own(UnitTypeId::Drone, pos(30, 33));

    let config = AgentConfig {
        stall_limit: Some(100),
        ..AgentConfig::default()
    };
    let mut agent = started(&world, config);
    agent.planner_mut().skip_opening();
    // The pool sits behind the zergling, so it cannot be cut in again.
    let queue = agent.planner_mut().queue_mut();
    assert!(queue.cut_in(ProductionTarget::Unit(UnitTypeId::SpawningPool), CutInReason::Prerequisite));
    queue.push_front(ProductionTarget::Unit(UnitTypeId::Zergling));

    agent.step(&world.build()).unwrap();
    assert_eq!(agent.planner().queue().len(), 2);

    world.advance(100);
    agent.step(&world.build()).unwrap();
    assert_eq!(agent.planner().queue().len(), 2);

    world.advance(1);
    agent.step(&world.build()).unwrap();
    assert_eq!(agent.planner().queue().len(), 1);
    assert_eq!(
        agent.planner().queue().head().map(|h| h.target),
        Some(ProductionTarget::Unit(UnitTypeId::SpawningPool))
    );
}

#[test]
fn test_unaffordable_head_is_never_abandoned() {
    let mut world = SnapshotBuilder::new();
    world.minerals(20).supply(12, 30);
    world.resources(30, 30);
    world.hatchery(30, 30, 16, 0);
    world.own(UnitTypeId::Drone, pos(30, 33));

    let mut agent = seeded_agent(&world, &[ProductionTarget::Unit(UnitTypeId::Extractor)]);
    agent.step(&world.build()).unwrap();
    world.advance(4100);
    agent.step(&world.build()).unwrap();

    assert_eq!(queued(&agent), vec![(ProductionTarget::Unit(UnitTypeId::Extractor), None)]);
}

// =============================================================================
// Episodes
// =============================================================================

#[test]
fn test_second_episode_starts_from_scratch() {
    let mut opening = standard_opening();
    opening.world.minerals(300).supply(12, 30);
    let mut agent = started(&opening.world, AgentConfig::default());
    for _ in 0..3 {
        agent.step(&opening.world.build()).unwrap();
        opening.world.advance(16);
    }
    assert_eq!(agent.planner().state(), PlannerState::Planning);

    let mut fresh_world = standard_opening();
    fresh_world.world.supply(12, 30);
    let snapshot = fresh_world.world.build();
    agent.on_start(standard_map(), &snapshot).unwrap();
    assert_eq!(agent.planner().state(), PlannerState::OnStart);
    assert!(agent.planner().queue().is_empty());

    let mut fresh = started(&fresh_world.world, AgentConfig::default());
    let restarted_commands = agent.step(&snapshot).unwrap();
    let fresh_commands = fresh.step(&snapshot).unwrap();
    assert_eq!(restarted_commands, fresh_commands);
    assert_eq!(queued(&agent), queued(&fresh));
}

// =============================================================================
// Larva injection
// =============================================================================

#[test]
fn test_queen_injects_once_per_cooldown() {
    let (mut world, hatch, queen) = queen_at_hatchery(50);
    let mut agent = started(&world, AgentConfig::default());

    let commands = agent.step(&world.build()).unwrap();
    let sent = injects(&commands);
    assert_eq!(sent.len(), 1, "commands: {commands:?}");
    assert_eq!(sent[0].units, vec![queen]);
    assert_eq!(sent[0].target, Target::Unit(hatch));

    world.game_loop(INJECT_COOLDOWN - 1);
    let commands = agent.step(&world.build()).unwrap();
    assert!(injects(&commands).is_empty(), "commands: {commands:?}");

    world.game_loop(INJECT_COOLDOWN);
    let commands = agent.step(&world.build()).unwrap();
    assert_eq!(injects(&commands).len(), 1, "commands: {commands:?}");
}

#[test]
fn test_one_inject_per_hatchery() {
    let (mut world, hatch, _) = queen_at_hatchery(50);
    let second = world.own(UnitTypeId::Queen, pos(31, 27));
    world.edit(second, |q| q.energy = 50);
    let mut agent = started(&world, AgentConfig::default());

    let commands = agent.step(&world.build()).unwrap();
    let sent = injects(&commands);
    assert_eq!(sent.len(), 1, "commands: {commands:?}");
    assert_eq!(sent[0].target, Target::Unit(hatch));
}

#[test]
fn test_queen_waits_for_inject_energy() {
    let (mut world, _, queen) = queen_at_hatchery(24);
    let mut agent = started(&world, AgentConfig::default());

    let commands = agent.step(&world.build()).unwrap();
    assert!(injects(&commands).is_empty(), "commands: {commands:?}");

    world.edit(queen, |q| q.energy = 25).advance(16);
    let commands = agent.step(&world.build()).unwrap();
    assert_eq!(injects(&commands).len(), 1, "commands: {commands:?}");
}

#[test]
fn test_saturated_hatchery_is_not_injected() {
    let (mut world, _, _) = queen_at_hatchery(50);
    world.own_many(UnitTypeId::Larva, 3, pos(30, 28));
    let mut agent = started(&world, AgentConfig::default());

    let commands = agent.step(&world.build()).unwrap();
    assert!(injects(&commands).is_empty(), "commands: {commands:?}");
}

#[test]
fn test_inject_cooldown_holds_at_the_end_of_time() {
    let (mut world, _, _) = queen_at_hatchery(50);
    world.game_loop(u32::MAX - 10);
    let mut agent = started(&world, AgentConfig::default());

    let commands = agent.step(&world.build()).unwrap();
    assert_eq!(injects(&commands).len(), 1, "commands: {commands:?}");

    world.advance(5);
    let commands = agent.step(&world.build()).unwrap();
    assert!(injects(&commands).is_empty(), "commands: {commands:?}");
}
