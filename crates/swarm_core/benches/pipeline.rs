//! Decision pipeline benchmarks for swarm_core.
//!
//! Run with: `cargo bench -p swarm_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use swarm_core::agent::Agent;
use swarm_core::config::AgentConfig;
use swarm_core::math::{Fixed, Vec2Fixed};
use swarm_core::pools::ResourcePool;
use swarm_core::unit_type::UnitTypeId;
use swarm_test_utils::fixtures::{pos, standard_map, standard_opening};

/// Full `Agent::step` on the opening and on a mid-game army.
pub fn step_benchmark(c: &mut Criterion) {
    let opening = standard_opening();
    let snapshot = opening.world.build();
    c.bench_function("step_opening", |b| {
        b.iter_batched(
            || {
                let mut agent = Agent::new(AgentConfig::default()).unwrap();
                agent.on_start(standard_map(), &snapshot).unwrap();
                agent
            },
            |mut agent| black_box(agent.step(&snapshot).unwrap()),
            BatchSize::SmallInput,
        );
    });

    let mut world = standard_opening().world;
    world.own_many(UnitTypeId::Roach, 40, pos(40, 40));
    world.own_many(UnitTypeId::Zergling, 40, pos(45, 40));
    for i in 0..30 {
        world.enemy(UnitTypeId::Marine, pos(80 + i % 6, 80 + i / 6));
    }
    let army = world.build();
    c.bench_function("step_army_80v30", |b| {
        let mut agent = Agent::new(AgentConfig::default()).unwrap();
        agent.on_start(standard_map(), &army).unwrap();
        b.iter(|| black_box(agent.step(&army).unwrap()));
    });
}

/// Cluster formation plus townhall spot search.
pub fn cluster_benchmark(c: &mut Criterion) {
    let snapshot = standard_opening().world.build();
    c.bench_function("resource_clusters", |b| {
        b.iter(|| {
            let mut pool = ResourcePool::default();
            pool.update(black_box(&snapshot));
            black_box(pool.clusters().len())
        });
    });

    let points: Vec<Vec2Fixed> = (0..200)
        .map(|i| Vec2Fixed::new(Fixed::from_num(i % 20 * 6), Fixed::from_num(i / 20 * 6)))
        .collect();
    c.bench_function("greedy_clusters_200", |b| {
        b.iter(|| swarm_core::pools::cluster::greedy_clusters(black_box(&points), Fixed::from_num(10)));
    });
}

criterion_group!(benches, step_benchmark, cluster_benchmark);
criterion_main!(benches);
