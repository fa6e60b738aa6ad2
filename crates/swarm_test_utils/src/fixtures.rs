//! Test fixtures and helpers.
//!
//! A [`SnapshotBuilder`] hands out stable tags, so tests can keep one
//! builder across ticks, edit units between calls to
//! [`SnapshotBuilder::build`] and feed each result to the agent.

use fixed::types::I32F32;
use swarm_core::command::Target;
use swarm_core::math::Vec2Fixed;
use swarm_core::snapshot::{Alliance, MapInfo, Snapshot, Tag, UnitOrder, UnitSnapshot};
use swarm_core::unit_type::{AbilityId, UnitTypeId, UpgradeId};

/// Side length of the fixture map.
pub const MAP_SIZE: u32 = 128;

/// Mineral patches per base layout.
pub const PATCHES_PER_BASE: usize = 8;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Integer position.
#[must_use]
pub fn pos(x: i32, y: i32) -> Vec2Fixed {
    Vec2Fixed::from_ints(x, y)
}

/// Own start location on the fixture map.
#[must_use]
pub fn start_location() -> Vec2Fixed {
    pos(30, 30)
}

/// Enemy start location on the fixture map.
#[must_use]
pub fn enemy_location() -> Vec2Fixed {
    pos(98, 98)
}

/// Open square map with the fixture start locations.
#[must_use]
pub fn standard_map() -> MapInfo {
    MapInfo::open(MAP_SIZE, MAP_SIZE, start_location(), enemy_location())
}

/// Like [`standard_map`] with creep spread around the own start.
#[must_use]
pub fn creeped_map(radius: i32) -> MapInfo {
    let mut map = standard_map();
    let (cx, cy) = (30, 30);
    for y in cy - radius..=cy + radius {
        for x in cx - radius..=cx + radius {
            map.creep.set(x, y, 1);
        }
    }
    map
}

/// Resource tags of one base layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseLayout {
    /// Mineral patch tags, west to east.
    pub minerals: Vec<Tag>,
    /// Geyser tags, west first.
    pub geysers: Vec<Tag>,
}

/// Incrementally built snapshot with stable tags.
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    snapshot: Snapshot,
    next_tag: Tag,
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotBuilder {
    /// Empty world at loop zero with the usual starting stockpile.
    #[must_use]
    pub fn new() -> Self {
        Self {
            snapshot: Snapshot {
                minerals: 50,
                food_used: 12,
                food_cap: 14,
                ..Snapshot::default()
            },
            next_tag: 1,
        }
    }

    /// Set the game loop.
    pub fn game_loop(&mut self, game_loop: u32) -> &mut Self {
        self.snapshot.game_loop = game_loop;
        self
    }

    /// Advance the game loop.
    pub fn advance(&mut self, loops: u32) -> &mut Self {
        self.snapshot.game_loop += loops;
        self
    }

    /// Set the mineral stockpile.
    pub fn minerals(&mut self, minerals: u32) -> &mut Self {
        self.snapshot.minerals = minerals;
        self
    }

    /// Set the vespene stockpile.
    pub fn vespene(&mut self, vespene: u32) -> &mut Self {
        self.snapshot.vespene = vespene;
        self
    }

    /// Set supply used and cap.
    pub fn supply(&mut self, used: u32, cap: u32) -> &mut Self {
        self.snapshot.food_used = used;
        self.snapshot.food_cap = cap;
        self
    }

    /// Mark an upgrade as completed.
    pub fn upgrade(&mut self, upgrade: UpgradeId) -> &mut Self {
        self.snapshot.upgrades.insert(upgrade);
        self
    }

    /// Add a prepared unit. A zero tag is replaced by a fresh one.
    pub fn add(&mut self, mut unit: UnitSnapshot) -> Tag {
        if unit.tag == 0 {
            unit.tag = self.next_tag;
        }
        self.next_tag = self.next_tag.max(unit.tag + 1);
        let tag = unit.tag;
        self.snapshot.units.push(unit);
        tag
    }

    /// Add a unit with default fields.
    pub fn spawn(&mut self, unit_type: UnitTypeId, alliance: Alliance, at: Vec2Fixed) -> Tag {
        self.add(UnitSnapshot::new(0, unit_type, alliance, at))
    }

    /// Add an own unit.
    pub fn own(&mut self, unit_type: UnitTypeId, at: Vec2Fixed) -> Tag {
        self.spawn(unit_type, Alliance::Own, at)
    }

    /// Add an enemy unit.
    pub fn enemy(&mut self, unit_type: UnitTypeId, at: Vec2Fixed) -> Tag {
        self.spawn(unit_type, Alliance::Enemy, at)
    }

    /// Add `count` own units of one type stacked at `at`.
    pub fn own_many(&mut self, unit_type: UnitTypeId, count: usize, at: Vec2Fixed) -> Vec<Tag> {
        (0..count).map(|_| self.own(unit_type, at)).collect()
    }

    /// Mineral line north of `(cx, cy)` with a geyser on each flank.
    ///
    /// The derived townhall spot sits a few cells north of `(cx, cy)`.
    pub fn resources(&mut self, cx: i32, cy: i32) -> BaseLayout {
        let minerals = (0..PATCHES_PER_BASE as i32)
            .map(|i| {
                let mut patch = UnitSnapshot::new(
                    0,
                    UnitTypeId::MineralField,
                    Alliance::Neutral,
                    pos(cx - 4 + i, cy + 7 + (i % 2)),
                );
                patch.mineral_contents = 1800;
                self.add(patch)
            })
            .collect();
        let geysers = [cx - 7, cx + 7]
            .into_iter()
            .map(|x| {
                let mut geyser =
                    UnitSnapshot::new(0, UnitTypeId::VespeneGeyser, Alliance::Neutral, pos(x, cy + 3));
                geyser.vespene_contents = 2250;
                self.add(geyser)
            })
            .collect();
        BaseLayout { minerals, geysers }
    }

    /// Own hatchery at `(cx, cy)` reporting its harvester saturation.
    pub fn hatchery(&mut self, cx: i32, cy: i32, ideal: u32, assigned: u32) -> Tag {
        let mut hatch = UnitSnapshot::new(0, UnitTypeId::Hatchery, Alliance::Own, pos(cx, cy));
        hatch.ideal_harvesters = ideal;
        hatch.assigned_harvesters = assigned;
        self.add(hatch)
    }

    /// Enemy townhall with its resources, so the enemy owns a cluster.
    pub fn enemy_base(&mut self, cx: i32, cy: i32) -> (Tag, BaseLayout) {
        let layout = self.resources(cx, cy);
        let hatch = self.enemy(UnitTypeId::Hatchery, pos(cx, cy));
        (hatch, layout)
    }

    /// Own drone gathering from `patch`.
    pub fn harvester(&mut self, patch: Tag, at: Vec2Fixed) -> Tag {
        let drone = self.own(UnitTypeId::Drone, at);
        self.order(drone, AbilityId::HarvestGather, Target::Unit(patch));
        drone
    }

    /// Replace a unit's orders with a single order.
    pub fn order(&mut self, tag: Tag, ability: AbilityId, target: Target) -> &mut Self {
        self.edit(tag, |u| u.orders = vec![UnitOrder::new(ability, target)])
    }

    /// Modify a unit in place. Unknown tags are ignored.
    pub fn edit(&mut self, tag: Tag, f: impl FnOnce(&mut UnitSnapshot)) -> &mut Self {
        if let Some(unit) = self.snapshot.units.iter_mut().find(|u| u.tag == tag) {
            f(unit);
        }
        self
    }

    /// Remove a unit, as if it died or was depleted.
    pub fn remove(&mut self, tag: Tag) -> &mut Self {
        self.snapshot.units.retain(|u| u.tag != tag);
        self
    }

    /// Look up a unit.
    #[must_use]
    pub fn unit(&self, tag: Tag) -> Option<&UnitSnapshot> {
        self.snapshot.units.iter().find(|u| u.tag == tag)
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn build(&self) -> Snapshot {
        self.snapshot.clone()
    }
}

/// Handles into [`standard_opening`].
#[derive(Debug, Clone)]
pub struct Opening {
    /// The world builder.
    pub world: SnapshotBuilder,
    /// Own main hatchery.
    pub hatchery: Tag,
    /// Main resources.
    pub main: BaseLayout,
    /// Starting drones.
    pub drones: Vec<Tag>,
    /// Starting larva.
    pub larva: Vec<Tag>,
    /// Starting overlord.
    pub overlord: Tag,
}

/// Game start: main with twelve idle drones, three larva and an overlord,
/// a free expansion at each side and an enemy main.
#[must_use]
pub fn standard_opening() -> Opening {
    let mut world = SnapshotBuilder::new();
    let main = world.resources(30, 30);
    let hatchery = world.hatchery(30, 30, 16, 0);
    let drones = world.own_many(UnitTypeId::Drone, 12, pos(30, 33));
    let larva = world.own_many(UnitTypeId::Larva, 3, pos(30, 28));
    let overlord = world.own(UnitTypeId::Overlord, pos(28, 28));

    world.resources(30, 70);
    world.resources(70, 30);
    world.resources(98, 60);
    world.enemy_base(98, 98);

    Opening {
        world,
        hatchery,
        main,
        drones,
        larva,
        overlord,
    }
}
