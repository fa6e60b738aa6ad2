//! Larva injection.
//!
//! The request side looks for townhalls short on larva that have a queen;
//! the consumer side drains the larva channel and sends a queen to inject.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::channels::{Intent, SpawnLarva};
use crate::command::{Command, Target};
use crate::context::TickContext;
use crate::snapshot::Tag;
use crate::unit_type::AbilityId;

/// Energy an injection costs.
pub const INJECT_ENERGY: u32 = 25;

/// Game loops before the same townhall is injected again.
pub const INJECT_COOLDOWN: u32 = 650;

/// Townhalls with at least this many larva are left alone.
const LARVA_SATURATION: usize = 3;

/// Queen-driven larva supply.
#[derive(Debug, Default)]
pub struct LarvaInjector {
    injected: BTreeMap<Tag, u32>,
}

impl LarvaInjector {
    /// Create an injector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit a [`SpawnLarva`] for every ready townhall that needs one.
    pub fn request(&mut self, ctx: &mut TickContext<'_>) {
        let game_loop = ctx.snapshot.game_loop;
        self.injected.retain(|_, until| *until > game_loop);

        let pools = ctx.pools;
        for base in pools.bases.iter() {
            if !base.is_ready()
                || base.queens.is_empty()
                || base.larva.len() >= LARVA_SATURATION
                || self.injected.contains_key(&base.tag())
            {
                continue;
            }
            ctx.channels.send(Intent::SpawnLarva(SpawnLarva {
                townhall: base.tag(),
            }));
        }
    }

    /// Drain the larva channel and issue injections.
    pub fn run(&mut self, ctx: &mut TickContext<'_>) {
        let requests: Vec<SpawnLarva> = ctx.channels.larva.drain().collect();
        let pools = ctx.pools;

        for SpawnLarva { townhall } in requests {
            let Some(base) = pools.bases.get(townhall) else {
                debug!(target: "swarm_core::production", townhall, "inject target gone");
                continue;
            };
            let queen = base.queens.iter().filter_map(|tag| ctx.unit(*tag)).find(|q| {
                q.energy >= INJECT_ENERGY
                    && !q.has_order(AbilityId::InjectLarva)
                    && !ctx.is_claimed(q.tag)
            });
            let Some(queen) = queen else {
                trace!(target: "swarm_core::production", townhall, "no queen ready to inject");
                continue;
            };
            ctx.issue(Command::new(
                AbilityId::InjectLarva,
                queen.tag,
                Target::Unit(townhall),
            ));
            self.injected
                .insert(townhall, ctx.snapshot.game_loop.saturating_add(INJECT_COOLDOWN));
        }
    }
}
