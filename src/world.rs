use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::geometry::{Rect, WorldPoint};
use crate::ledger::{ResourceKind, ResourceLedger, ResourceTotals};
use crate::map::{GridMap, TileKind, TilePos};
use crate::pathfinding::PathFinder;
use crate::presentation::AnimationKey;
use crate::selection::{IssuedOrder, SelectionController, SelectionSettings};
use crate::unit::{
    DropOff, Facing, TickContext, UnitAgent, UnitEvent, UnitId, UnitState, UnitTuning,
};

/// Player input, queued until the next tick applies it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    SelectAt(WorldPoint),
    SelectInRect(Rect),
    SelectAll,
    MoveTo(WorldPoint),
    GatherAt(TilePos),
    /// Gather if the point lies on a resource, walk there otherwise.
    OrderAt(WorldPoint),
    /// Gather the closest reachable `resource` to the first selected unit.
    GatherNearest { resource: ResourceKind },
}

#[derive(Debug, Clone)]
pub struct WorldSettings {
    pub dt_ms: f32,
    pub tuning: UnitTuning,
    pub drop_off: DropOff,
    pub selection: SelectionSettings,
    pub starting_resources: ResourceTotals,
    pub max_path_expansions: Option<usize>,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            dt_ms: 50.0,
            tuning: UnitTuning::default(),
            drop_off: DropOff {
                point: WorldPoint::default(),
                radius: 40.0,
            },
            selection: SelectionSettings::default(),
            starting_resources: ResourceTotals::default(),
            max_path_expansions: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitSnapshot {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub state: UnitState,
    pub facing: Facing,
    pub animation: String,
    pub carrying: Option<ResourceKind>,
    pub amount: u32,
    pub selected: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub scenario: String,
    pub tick: u64,
    pub elapsed_ms: f64,
    pub resources: ResourceTotals,
    pub selection: Vec<u32>,
    pub units: Vec<UnitSnapshot>,
    pub events: Vec<UnitEvent>,
}

/// Static terrain, sent once to viewers. `tiles` is row-major.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapSnapshot {
    pub width: u32,
    pub height: u32,
    pub tile_size: f32,
    pub tiles: Vec<TileKind>,
}

#[derive(Debug)]
pub struct World {
    grid: GridMap,
    units: Vec<UnitAgent>,
    ledger: ResourceLedger,
    selection: SelectionController,
    pathfinder: PathFinder,
    drop_off: DropOff,
    tuning: UnitTuning,
    next_unit: u32,
    tick: u64,
    elapsed_ms: f64,
    dt_ms: f32,
    pending: VecDeque<Command>,
    events: Vec<UnitEvent>,
}

impl World {
    pub fn new(grid: GridMap, settings: WorldSettings) -> Self {
        Self {
            grid,
            units: Vec::new(),
            ledger: ResourceLedger::new(settings.starting_resources),
            selection: SelectionController::new(settings.selection),
            pathfinder: PathFinder::new().with_expansion_limit(settings.max_path_expansions),
            drop_off: settings.drop_off,
            tuning: settings.tuning,
            next_unit: 0,
            tick: 0,
            elapsed_ms: 0.0,
            dt_ms: settings.dt_ms,
            pending: VecDeque::new(),
            events: Vec::new(),
        }
    }

    /// Places a villager at the center of `tile`. Returns `None` when the
    /// tile cannot be stood on.
    pub fn spawn_unit(&mut self, tile: TilePos) -> Option<UnitId> {
        if !self.grid.is_walkable(tile) {
            warn!(x = tile.x, y = tile.y, "spawn tile is not walkable");
            return None;
        }
        let id = UnitId::new(self.next_unit);
        self.next_unit += 1;
        self.units
            .push(UnitAgent::new(id, self.grid.tile_center(tile), self.tuning));
        debug!(unit = %id, x = tile.x, y = tile.y, "spawned villager");
        Some(id)
    }

    pub fn grid(&self) -> &GridMap {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut GridMap {
        &mut self.grid
    }

    pub fn units(&self) -> &[UnitAgent] {
        &self.units
    }

    pub fn unit(&self, id: UnitId) -> Option<&UnitAgent> {
        self.units.iter().find(|unit| unit.id() == id)
    }

    pub fn ledger(&self) -> &ResourceLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut ResourceLedger {
        &mut self.ledger
    }

    pub fn selection(&self) -> &SelectionController {
        &self.selection
    }

    pub fn pathfinder(&self) -> &PathFinder {
        &self.pathfinder
    }

    pub fn drop_off(&self) -> &DropOff {
        &self.drop_off
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn dt_ms(&self) -> f32 {
        self.dt_ms
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }

    pub fn queue(&mut self, command: Command) {
        self.pending.push_back(command);
    }

    pub fn pending_commands(&self) -> usize {
        self.pending.len()
    }

    /// Applies queued commands in arrival order.
    pub fn apply_pending_commands(&mut self) -> usize {
        let mut applied = 0;
        while let Some(command) = self.pending.pop_front() {
            self.apply(command);
            applied += 1;
        }
        applied
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::SelectAt(point) => {
                let picked = self.selection.select_at(point, &self.units).len();
                debug!(x = point.x, y = point.y, picked, "select at");
            }
            Command::SelectInRect(rect) => {
                let picked = self.selection.select_in_rect(rect, &self.units).len();
                debug!(picked, "select in rect");
            }
            Command::SelectAll => {
                let picked = self.selection.select_all(&self.units).len();
                debug!(picked, "select all");
            }
            Command::MoveTo(point) => {
                self.selection.issue_move_order(
                    point,
                    &mut self.units,
                    &self.grid,
                    &self.pathfinder,
                );
            }
            Command::GatherAt(tile) => match self.grid.kind_at(tile) {
                Some(kind) if kind.is_resource() => {
                    self.selection.issue_gather_order(
                        tile,
                        kind,
                        &mut self.units,
                        &self.grid,
                        &self.pathfinder,
                    );
                }
                _ => debug!(x = tile.x, y = tile.y, "gather order on a non-resource tile"),
            },
            Command::OrderAt(point) => {
                let issued = self.selection.issue_order_at(
                    point,
                    &mut self.units,
                    &self.grid,
                    &self.pathfinder,
                );
                if issued == IssuedOrder::Nothing {
                    debug!(x = point.x, y = point.y, "order ignored");
                }
            }
            Command::GatherNearest { resource } => self.gather_nearest(resource),
        }
    }

    fn gather_nearest(&mut self, resource: ResourceKind) {
        let Some(anchor) = self
            .selection
            .selected()
            .first()
            .and_then(|id| self.units.iter().find(|unit| unit.id() == *id))
            .map(|unit| unit.tile(&self.grid))
        else {
            debug!(resource = resource.as_str(), "nearest gather with nothing selected");
            return;
        };
        let kind = resource.tile_kind();
        match self.grid.nearest_of_kind(anchor, kind) {
            Some(tile) => {
                self.selection.issue_gather_order(
                    tile,
                    kind,
                    &mut self.units,
                    &self.grid,
                    &self.pathfinder,
                );
            }
            None => warn!(resource = resource.as_str(), "no reachable resource left"),
        }
    }

    /// Advances every unit by `dt_ms`. Events from this pass replace the
    /// previous ones.
    pub fn update_units(&mut self, dt_ms: f32) {
        self.events.clear();
        let mut ctx = TickContext {
            grid: &self.grid,
            pathfinder: &self.pathfinder,
            ledger: &mut self.ledger,
            drop_off: &self.drop_off,
        };
        for unit in &mut self.units {
            unit.update(dt_ms, &mut ctx);
            self.events.extend(unit.take_events());
        }
    }

    pub fn advance_time(&mut self) {
        self.tick += 1;
        self.elapsed_ms += f64::from(self.dt_ms);
    }

    pub fn events(&self) -> &[UnitEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<UnitEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn snapshot(&self, scenario: &str) -> WorldSnapshot {
        let units = self
            .units
            .iter()
            .map(|unit| {
                let position = unit.position();
                let inventory = unit.inventory();
                UnitSnapshot {
                    id: unit.id().raw(),
                    x: position.x,
                    y: position.y,
                    state: unit.state(),
                    facing: unit.facing(),
                    animation: AnimationKey::for_unit(unit).id(),
                    carrying: inventory.kind,
                    amount: inventory.amount,
                    selected: self.selection.is_selected(unit.id()),
                }
            })
            .collect();
        WorldSnapshot {
            scenario: scenario.to_string(),
            tick: self.tick,
            elapsed_ms: self.elapsed_ms,
            resources: self.ledger.totals(),
            selection: self.selection.selected().iter().map(|id| id.raw()).collect(),
            units,
            events: self.events.clone(),
        }
    }

    pub fn map_snapshot(&self) -> MapSnapshot {
        MapSnapshot {
            width: self.grid.width(),
            height: self.grid.height(),
            tile_size: self.grid.tile_size(),
            tiles: self.grid.tiles().iter().map(|tile| tile.kind).collect(),
        }
    }
}
