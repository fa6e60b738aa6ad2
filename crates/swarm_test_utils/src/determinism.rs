//! Determinism testing utilities.
//!
//! The agent must emit the same command batches for the same configuration
//! and snapshot sequence. Sources of divergence include:
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Anything that orders commands iterates in tag order instead.
//!
//! - **Unseeded randomness**: squad sampling and rim placement draw from
//!   generators seeded by [`AgentConfig::seed`].
//!
//! - **Floating-point math**: positions and distances use
//!   [`swarm_core::math::Fixed`].

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use swarm_core::agent::Agent;
use swarm_core::command::Command;
use swarm_core::config::AgentConfig;
use swarm_core::error::Result;
use swarm_core::snapshot::{MapInfo, Snapshot};

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks per run.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic agent).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that every run matched, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Agent is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Hash one command batch, order included.
#[must_use]
pub fn hash_commands(commands: &[Command]) -> u64 {
    let mut hasher = DefaultHasher::new();
    commands.hash(&mut hasher);
    hasher.finish()
}

/// Run a fresh agent over `snapshots`, returning every tick's batch.
///
/// The first snapshot is also the one passed to `on_start`.
pub fn replay(config: &AgentConfig, map: &MapInfo, snapshots: &[Snapshot]) -> Result<Vec<Vec<Command>>> {
    let mut agent = Agent::new(config.clone())?;
    let Some(first) = snapshots.first() else {
        return Ok(Vec::new());
    };
    agent.on_start(map.clone(), first)?;
    snapshots.iter().map(|s| agent.step(s)).collect()
}

/// Replay the same snapshots `runs` times and compare the batches.
pub fn verify_agent_determinism(
    runs: usize,
    config: &AgentConfig,
    map: &MapInfo,
    snapshots: &[Snapshot],
) -> Result<DeterminismResult> {
    let mut hashes = Vec::with_capacity(runs);
    for _ in 0..runs {
        let batches = replay(config, map, snapshots)?;
        let mut hasher = DefaultHasher::new();
        for batch in &batches {
            hash_commands(batch).hash(&mut hasher);
        }
        hashes.push(hasher.finish());
    }

    Ok(DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        ticks: snapshots.len() as u64,
    })
}
