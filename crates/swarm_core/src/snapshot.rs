//! Per-tick world snapshot supplied by the engine.
//!
//! A [`Snapshot`] is an immutable view of everything visible at one game
//! loop. [`MapInfo`] carries the static grids that only change at episode
//! start (creep aside, which snapshots may refresh).

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::command::Target;
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::unit_type::{AbilityId, UnitTypeId, UpgradeId};

/// Stable per-entity identifier.
pub type Tag = u64;

/// Game loops per real-time second at faster speed.
pub const LOOPS_PER_SECOND: u32 = 22;

/// Relationship of an entity to the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Alliance {
    /// Controlled by the agent.
    Own,
    /// Controlled by a teammate.
    Ally,
    /// Resources, rocks and other neutral entities.
    Neutral,
    /// Controlled by an opponent.
    Enemy,
}

/// An order currently queued on a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitOrder {
    /// The ability being executed.
    pub ability: AbilityId,
    /// Order target.
    pub target: Target,
}

impl UnitOrder {
    /// Create an order.
    #[must_use]
    pub const fn new(ability: AbilityId, target: Target) -> Self {
        Self { ability, target }
    }
}

/// Immutable per-tick record of one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSnapshot {
    /// Stable identity.
    pub tag: Tag,
    /// Type of the entity.
    pub unit_type: UnitTypeId,
    /// Owner classification.
    pub alliance: Alliance,
    /// World position.
    pub position: Vec2Fixed,
    /// Current health.
    pub health: u32,
    /// Maximum health.
    pub health_max: u32,
    /// Current energy.
    pub energy: u32,
    /// Construction progress, 0 to 1.
    #[serde(with = "fixed_serde")]
    pub build_progress: Fixed,
    /// Remaining weapon cooldown in game loops.
    pub weapon_cooldown: u32,
    /// Pending orders, current first.
    pub orders: Vec<UnitOrder>,
    /// Minerals left in a mineral patch.
    pub mineral_contents: u32,
    /// Vespene left in a geyser or gas building.
    pub vespene_contents: u32,
    /// Engine-reported optimal harvester count (townhalls, gas buildings).
    pub ideal_harvesters: u32,
    /// Engine-reported current harvester count.
    pub assigned_harvesters: u32,
    /// Whether the unit is airborne.
    pub is_flying: bool,
    /// Whether the entity is a structure.
    pub is_structure: bool,
    /// Whether the unit has any weapon.
    pub can_attack: bool,
    /// Whether the unit is burrowed.
    pub is_burrowed: bool,
}

impl UnitSnapshot {
    /// Create a fully built, idle entity with type-derived flags.
    #[must_use]
    pub fn new(tag: Tag, unit_type: UnitTypeId, alliance: Alliance, position: Vec2Fixed) -> Self {
        let is_structure = unit_type.is_structure();
        let can_attack = unit_type.is_army()
            || matches!(
                unit_type,
                UnitTypeId::Queen
                    | UnitTypeId::Drone
                    | UnitTypeId::Scv
                    | UnitTypeId::Probe
                    | UnitTypeId::Marine
                    | UnitTypeId::Zealot
                    | UnitTypeId::SpineCrawler
                    | UnitTypeId::SporeCrawler
                    | UnitTypeId::PlanetaryFortress
            );
        Self {
            tag,
            unit_type,
            alliance,
            position,
            health: 100,
            health_max: 100,
            energy: 0,
            build_progress: Fixed::from_num(1),
            weapon_cooldown: 0,
            orders: Vec::new(),
            mineral_contents: 0,
            vespene_contents: 0,
            ideal_harvesters: 0,
            assigned_harvesters: 0,
            is_flying: unit_type.is_flyer(),
            is_structure,
            can_attack: can_attack && unit_type != UnitTypeId::Overseer,
            is_burrowed: false,
        }
    }

    /// Check if construction has finished.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.build_progress >= Fixed::from_num(1)
    }

    /// Check if the unit has no orders.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.orders.is_empty()
    }

    /// The current (first) order.
    #[must_use]
    pub fn current_order(&self) -> Option<&UnitOrder> {
        self.orders.first()
    }

    /// Check if any queued order uses `ability`.
    #[must_use]
    pub fn has_order(&self, ability: AbilityId) -> bool {
        self.orders.iter().any(|o| o.ability == ability)
    }

    /// Health as a percentage of maximum (0 when maximum is zero).
    #[must_use]
    pub fn health_percent(&self) -> u32 {
        if self.health_max == 0 {
            0
        } else {
            self.health * 100 / self.health_max
        }
    }

    /// Check if this is an enemy unit that threatens our units.
    #[must_use]
    pub fn is_enemy_combatant(&self) -> bool {
        self.alliance == Alliance::Enemy
            && self.can_attack
            && !self.is_structure
            && !self.unit_type.is_worker()
    }
}

/// Dense byte grid over the map (placement, pathing, creep, height).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Grid {
    /// Width in cells.
    pub width: u32,
    /// Height in cells.
    pub height: u32,
    /// Row-major cell values.
    pub data: Vec<u8>,
}

impl Grid {
    /// Create a grid filled with `value`.
    #[must_use]
    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; (width as usize) * (height as usize)],
        }
    }

    /// Value at a cell, `None` outside the grid.
    #[must_use]
    pub fn get(&self, x: i32, y: i32) -> Option<u8> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        self.data
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    /// Set a cell, ignoring out-of-range coordinates.
    pub fn set(&mut self, x: i32, y: i32, value: u8) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let idx = y as usize * self.width as usize + x as usize;
        if let Some(cell) = self.data.get_mut(idx) {
            *cell = value;
        }
    }

    /// Check if the cell containing `pos` is non-zero.
    #[must_use]
    pub fn is_set(&self, pos: Vec2Fixed) -> bool {
        self.get(pos.x.to_num::<i32>(), pos.y.to_num::<i32>())
            .is_some_and(|v| v != 0)
    }

    /// Check that every cell of the square of half-size `radius` around
    /// `center` is non-zero.
    #[must_use]
    pub fn is_area_set(&self, center: Vec2Fixed, radius: Fixed) -> bool {
        let x0 = (center.x - radius).to_num::<i32>();
        let x1 = (center.x + radius - Fixed::DELTA).to_num::<i32>();
        let y0 = (center.y - radius).to_num::<i32>();
        let y1 = (center.y + radius - Fixed::DELTA).to_num::<i32>();
        (y0..=y1).all(|y| (x0..=x1).all(|x| self.get(x, y).is_some_and(|v| v != 0)))
    }
}

/// Static map data supplied at episode start.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MapInfo {
    /// Map width.
    pub width: u32,
    /// Map height.
    pub height: u32,
    /// Agent's start location.
    pub start_location: Vec2Fixed,
    /// Possible enemy start locations.
    pub enemy_start_locations: Vec<Vec2Fixed>,
    /// Cells where structures may be placed.
    pub placement: Grid,
    /// Cells ground units can walk.
    pub pathing: Grid,
    /// Cells covered by creep.
    pub creep: Grid,
    /// Terrain height per cell.
    pub terrain_height: Grid,
}

impl MapInfo {
    /// Open map of the given size: everything placeable and pathable, no creep.
    #[must_use]
    pub fn open(width: u32, height: u32, start: Vec2Fixed, enemy_start: Vec2Fixed) -> Self {
        Self {
            width,
            height,
            start_location: start,
            enemy_start_locations: vec![enemy_start],
            placement: Grid::filled(width, height, 1),
            pathing: Grid::filled(width, height, 1),
            creep: Grid::filled(width, height, 0),
            terrain_height: Grid::filled(width, height, 0),
        }
    }

    /// Centre of the playable area.
    #[must_use]
    pub fn center(&self) -> Vec2Fixed {
        Vec2Fixed::new(
            Fixed::from_num(self.width) / Fixed::from_num(2),
            Fixed::from_num(self.height) / Fixed::from_num(2),
        )
    }

    /// Most likely enemy start location (the first listed).
    #[must_use]
    pub fn enemy_start(&self) -> Vec2Fixed {
        self.enemy_start_locations
            .first()
            .copied()
            .unwrap_or_else(|| self.center())
    }
}

/// Everything the engine reports for one game loop.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    /// Game loop counter.
    pub game_loop: u32,
    /// Mineral stockpile.
    pub minerals: u32,
    /// Vespene stockpile.
    pub vespene: u32,
    /// Supply in use.
    pub food_used: u32,
    /// Supply capacity.
    pub food_cap: u32,
    /// Visible entities.
    pub units: Vec<UnitSnapshot>,
    /// Completed upgrades.
    pub upgrades: BTreeSet<UpgradeId>,
    /// Fresh creep layer, if the engine sent one this loop.
    pub creep: Option<Grid>,
}

impl Snapshot {
    /// Own entities.
    pub fn own(&self) -> impl Iterator<Item = &UnitSnapshot> {
        self.by_alliance(Alliance::Own)
    }

    /// Enemy entities.
    pub fn enemies(&self) -> impl Iterator<Item = &UnitSnapshot> {
        self.by_alliance(Alliance::Enemy)
    }

    /// Neutral entities.
    pub fn neutral(&self) -> impl Iterator<Item = &UnitSnapshot> {
        self.by_alliance(Alliance::Neutral)
    }

    fn by_alliance(&self, alliance: Alliance) -> impl Iterator<Item = &UnitSnapshot> {
        self.units.iter().filter(move |u| u.alliance == alliance)
    }

    /// Build a tag index over this snapshot.
    #[must_use]
    pub fn index(&self) -> HashMap<Tag, &UnitSnapshot> {
        self.units.iter().map(|u| (u.tag, u)).collect()
    }

    /// Elapsed game time in whole seconds.
    #[must_use]
    pub const fn seconds(&self) -> u32 {
        self.game_loop / LOOPS_PER_SECOND
    }

    /// Free supply.
    #[must_use]
    pub const fn supply_left(&self) -> u32 {
        self.food_cap.saturating_sub(self.food_used)
    }
}
