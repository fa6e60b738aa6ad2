//! Production executor: turns production intents into engine commands.

use tracing::{debug, warn};

use crate::channels::ProductionIntent;
use crate::command::Command;
use crate::context::TickContext;
use crate::data::ProductionTarget;
use crate::placement::PlacementSolver;
use crate::unit_type::UnitTypeId;

/// Consumer of the production channel.
#[derive(Debug)]
pub struct ProductionExecutor {
    placement: PlacementSolver,
}

impl ProductionExecutor {
    /// Create an executor that places structures with `placement`.
    #[must_use]
    pub fn new(placement: PlacementSolver) -> Self {
        Self { placement }
    }

    /// The placement solver.
    #[must_use]
    pub fn placement(&self) -> &PlacementSolver {
        &self.placement
    }

    /// Drain the production channel and issue one command per intent.
    ///
    /// Returns the targets whose intents could not be carried out, so the
    /// planner can put them back in its queue.
    pub fn run(&mut self, ctx: &mut TickContext<'_>) -> Vec<ProductionTarget> {
        let intents: Vec<ProductionIntent> = ctx.channels.production.drain().collect();
        let mut failed = Vec::new();

        for intent in intents {
            if ctx.unit(intent.actor()).is_none() {
                debug!(target: "swarm_core::production", ?intent, "actor gone, dropping intent");
                failed.push(target_of(intent));
                continue;
            }
            match self.translate(intent, ctx) {
                Some(command) => ctx.issue(command),
                None => {
                    warn!(target: "swarm_core::production", ?intent, "intent could not be carried out");
                    failed.push(target_of(intent));
                }
            }
        }
        failed
    }

    fn translate(&mut self, intent: ProductionIntent, ctx: &TickContext<'_>) -> Option<Command> {
        let pools = ctx.pools;
        match intent {
            ProductionIntent::BuildBuilding {
                builder,
                base,
                structure,
            } => {
                let base = pools.bases.get(base)?;
                if structure.is_gas_building() {
                    let geyser = base
                        .free_geysers(&pools.resources, &pools.structures)
                        .into_iter()
                        .next()?;
                    Some(Command::build_on(builder, structure, geyser.tag))
                } else {
                    let pos = self.placement.place(structure, base, ctx)?;
                    Some(Command::build_at(builder, structure, pos))
                }
            }
            ProductionIntent::Expand { builder, position } => {
                Some(Command::build_at(builder, UnitTypeId::Hatchery, position))
            }
            ProductionIntent::BuildUnit { source, unit } => Some(Command::train(source, unit)),
            ProductionIntent::Upgrade { source, upgrade } => Some(Command::research(source, upgrade)),
            ProductionIntent::Morph { source, into } => Some(Command::morph(source, into)),
        }
    }
}

fn target_of(intent: ProductionIntent) -> ProductionTarget {
    match intent {
        ProductionIntent::BuildBuilding { structure, .. } => ProductionTarget::Unit(structure),
        ProductionIntent::Expand { .. } => ProductionTarget::Unit(UnitTypeId::Hatchery),
        ProductionIntent::BuildUnit { unit, .. } => ProductionTarget::Unit(unit),
        ProductionIntent::Upgrade { upgrade, .. } => ProductionTarget::Upgrade(upgrade),
        ProductionIntent::Morph { into, .. } => ProductionTarget::Unit(into),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::Channels;
    use crate::data::TechTree;
    use crate::math::Vec2Fixed;
    use crate::placement::PlacementStrategy;
    use crate::pools::Pools;
    use crate::snapshot::{Alliance, MapInfo, Snapshot, UnitSnapshot};
    use crate::unit_type::AbilityId;

    #[test]
    fn test_translates_and_reports_failures() {
        let snapshot = Snapshot {
            units: vec![UnitSnapshot::new(
                7,
                UnitTypeId::Larva,
                Alliance::Own,
                Vec2Fixed::from_ints(10, 10),
            )],
            ..Snapshot::default()
        };
        let map = MapInfo::default();
        let tech = TechTree::default();
        let pools = Pools::default();
        let mut channels = Channels::default();
        channels.send(ProductionIntent::BuildUnit {
            source: 7,
            unit: UnitTypeId::Drone,
        });
        // Unknown actor.
        channels.send(ProductionIntent::Morph {
            source: 99,
            into: UnitTypeId::Lair,
        });

        let mut executor = ProductionExecutor::new(PlacementSolver::new(PlacementStrategy::default(), 1));
        let mut ctx = TickContext::new(&snapshot, &map, &tech, &pools, &mut channels);
        let failed = executor.run(&mut ctx);

        assert_eq!(failed, vec![ProductionTarget::Unit(UnitTypeId::Lair)]);
        let commands = ctx.into_commands();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].ability, AbilityId::Train(UnitTypeId::Drone));
        assert!(channels.production.is_empty());
    }
}
