//! Villager state machine: walk, gather, deliver, repeat.

use std::collections::VecDeque;
use std::f32::consts::FRAC_PI_4;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::geometry::WorldPoint;
use crate::ledger::{ResourceKind, ResourceLedger};
use crate::map::{GridMap, TileKind, TilePos};
use crate::pathfinding::PathFinder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(u32);

impl UnitId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitState {
    Idle,
    Walking,
    Gathering,
    Delivering,
}

impl UnitState {
    pub fn as_str(self) -> &'static str {
        match self {
            UnitState::Idle => "idle",
            UnitState::Walking => "walking",
            UnitState::Gathering => "gathering",
            UnitState::Delivering => "delivering",
        }
    }
}

/// Movement heading bucketed into compass octants. Screen space, so `Down`
/// is positive `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    Right,
    DownRight,
    Down,
    DownLeft,
    Left,
    UpLeft,
    Up,
    UpRight,
}

impl Facing {
    /// Clockwise on screen starting from `Right`, indexed by octant.
    pub const ALL: [Facing; 8] = [
        Facing::Right,
        Facing::DownRight,
        Facing::Down,
        Facing::DownLeft,
        Facing::Left,
        Facing::UpLeft,
        Facing::Up,
        Facing::UpRight,
    ];

    pub fn from_vector(dx: f32, dy: f32) -> Self {
        let angle = dy.atan2(dx);
        let octant = (angle / FRAC_PI_4).round() as i32;
        Self::ALL[octant.rem_euclid(8) as usize]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Facing::Right => "right",
            Facing::DownRight => "down_right",
            Facing::Down => "down",
            Facing::DownLeft => "down_left",
            Facing::Left => "left",
            Facing::UpLeft => "up_left",
            Facing::Up => "up",
            Facing::UpRight => "up_right",
        }
    }
}

fn default_speed() -> f32 {
    90.0
}

fn default_capacity() -> u32 {
    10
}

fn default_gathering_rate() -> f32 {
    1.0
}

/// Per-unit movement and harvest parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitTuning {
    /// World pixels per second.
    #[serde(default = "default_speed")]
    pub speed: f32,
    #[serde(default = "default_capacity")]
    pub capacity: u32,
    /// Units harvested per second.
    #[serde(default = "default_gathering_rate")]
    pub gathering_rate: f32,
}

impl Default for UnitTuning {
    fn default() -> Self {
        Self {
            speed: default_speed(),
            capacity: default_capacity(),
            gathering_rate: default_gathering_rate(),
        }
    }
}

impl UnitTuning {
    pub fn gather_interval_ms(&self) -> f32 {
        1000.0 / self.gathering_rate
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub kind: Option<ResourceKind>,
    pub amount: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatherTarget {
    pub tile: TilePos,
    pub kind: TileKind,
}

/// Where delivering units credit the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DropOff {
    pub point: WorldPoint,
    pub radius: f32,
}

impl DropOff {
    pub fn contains(&self, point: WorldPoint) -> bool {
        self.point.distance(point) <= self.radius
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitEvent {
    pub unit: UnitId,
    pub kind: UnitEventKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum UnitEventKind {
    StateChanged { from: UnitState, to: UnitState },
    Deposited { resource: ResourceKind, amount: u32 },
    Blocked { tile: TilePos },
}

/// Everything a unit reads or credits during its tick.
pub struct TickContext<'a> {
    pub grid: &'a GridMap,
    pub pathfinder: &'a PathFinder,
    pub ledger: &'a mut ResourceLedger,
    pub drop_off: &'a DropOff,
}

#[derive(Debug, Clone)]
pub struct UnitAgent {
    id: UnitId,
    position: WorldPoint,
    tuning: UnitTuning,
    state: UnitState,
    path: VecDeque<TilePos>,
    waypoint: Option<TilePos>,
    facing: Facing,
    inventory: Inventory,
    gather_target: Option<GatherTarget>,
    gather_timer_ms: f32,
    gather_slot: usize,
    events: Vec<UnitEvent>,
}

impl UnitAgent {
    pub fn new(id: UnitId, position: WorldPoint, tuning: UnitTuning) -> Self {
        Self {
            id,
            position,
            tuning,
            state: UnitState::Idle,
            path: VecDeque::new(),
            waypoint: None,
            facing: Facing::Down,
            inventory: Inventory::default(),
            gather_target: None,
            gather_timer_ms: 0.0,
            gather_slot: 0,
            events: Vec::new(),
        }
    }

    pub fn id(&self) -> UnitId {
        self.id
    }

    pub fn position(&self) -> WorldPoint {
        self.position
    }

    pub fn tuning(&self) -> &UnitTuning {
        &self.tuning
    }

    pub fn state(&self) -> UnitState {
        self.state
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn inventory(&self) -> Inventory {
        self.inventory
    }

    pub fn gather_target(&self) -> Option<GatherTarget> {
        self.gather_target
    }

    pub fn waypoint(&self) -> Option<TilePos> {
        self.waypoint
    }

    /// Cells still to visit after the current waypoint.
    pub fn remaining_path(&self) -> impl Iterator<Item = &TilePos> {
        self.path.iter()
    }

    pub fn tile(&self, grid: &GridMap) -> TilePos {
        grid.world_to_tile(self.position)
    }

    pub fn take_events(&mut self) -> Vec<UnitEvent> {
        std::mem::take(&mut self.events)
    }

    /// Walks to the cell under `target`, dropping any gather order. Returns
    /// false when no route exists; the unit then stays put.
    pub fn order_move(
        &mut self,
        target: WorldPoint,
        grid: &GridMap,
        pathfinder: &PathFinder,
    ) -> bool {
        self.gather_target = None;
        let goal = grid.world_to_tile(target);
        if self.start_route(goal, grid, pathfinder, UnitState::Walking) {
            true
        } else {
            self.transition(UnitState::Idle);
            false
        }
    }

    /// Heads for the walkable cell beside `tile` and harvests it. Carried
    /// resources are forfeited unless the order repeats the current target.
    pub fn order_gather(
        &mut self,
        tile: TilePos,
        kind: TileKind,
        grid: &GridMap,
        pathfinder: &PathFinder,
    ) -> bool {
        self.order_gather_in_slot(tile, kind, 0, grid, pathfinder)
    }

    /// Like [`order_gather`](Self::order_gather), but stands on the
    /// `slot`-th open side of the resource, counting outwards from the
    /// nearest one. Slots wrap around when the resource has fewer sides.
    pub fn order_gather_in_slot(
        &mut self,
        tile: TilePos,
        kind: TileKind,
        slot: usize,
        grid: &GridMap,
        pathfinder: &PathFinder,
    ) -> bool {
        if !kind.is_resource() {
            return self.order_move(grid.tile_center(tile), grid, pathfinder);
        }

        let target = GatherTarget { tile, kind };
        if self.gather_target != Some(target) {
            self.inventory = Inventory::default();
            self.gather_timer_ms = 0.0;
        }
        self.gather_target = Some(target);
        self.gather_slot = slot;

        let here = self.tile(grid);
        let sides = grid.open_sides(tile, here);
        let Some(&stand) = sides.get(slot % sides.len().max(1)) else {
            debug!(unit = %self.id, x = tile.x, y = tile.y, "resource has no open side");
            self.gather_target = None;
            self.clear_route();
            self.transition(UnitState::Idle);
            return false;
        };

        if stand == here {
            self.clear_route();
            self.begin_gathering(grid);
            return true;
        }

        if self.start_route(stand, grid, pathfinder, UnitState::Walking) {
            true
        } else {
            self.gather_target = None;
            self.transition(UnitState::Idle);
            false
        }
    }

    /// Advances the unit by `dt_ms` milliseconds.
    pub fn update(&mut self, dt_ms: f32, ctx: &mut TickContext<'_>) {
        match self.state {
            UnitState::Idle => {}
            UnitState::Gathering => self.gather(dt_ms, ctx),
            UnitState::Delivering if ctx.drop_off.contains(self.position) => self.deliver(ctx),
            UnitState::Walking | UnitState::Delivering => self.advance(dt_ms, ctx),
        }
    }

    fn gather(&mut self, dt_ms: f32, ctx: &mut TickContext<'_>) {
        let Some(target) = self.gather_target else {
            self.transition(UnitState::Idle);
            return;
        };
        if ctx.grid.kind_at(target.tile) != Some(target.kind) {
            debug!(unit = %self.id, x = target.tile.x, y = target.tile.y, "resource gone");
            self.gather_target = None;
            self.transition(UnitState::Idle);
            return;
        }

        if self.inventory.amount < self.tuning.capacity {
            self.gather_timer_ms += dt_ms;
            if self.gather_timer_ms >= self.tuning.gather_interval_ms() {
                self.inventory.amount += 1;
                self.inventory.kind = target.kind.resource_kind();
                self.gather_timer_ms = 0.0;
            }
        }

        if self.inventory.amount >= self.tuning.capacity {
            self.start_delivery(ctx);
        }
    }

    fn start_delivery(&mut self, ctx: &mut TickContext<'_>) {
        let goal = ctx.grid.world_to_tile(ctx.drop_off.point);
        let here = self.tile(ctx.grid);
        self.path = ctx.pathfinder.find_path(here, goal, ctx.grid).into();
        self.waypoint = None;
        self.transition(UnitState::Delivering);
    }

    fn deliver(&mut self, ctx: &mut TickContext<'_>) {
        let carried = std::mem::take(&mut self.inventory);
        if let Some(resource) = carried.kind.filter(|_| carried.amount > 0) {
            let amount = carried.amount;
            ctx.ledger.deposit(resource, amount);
            self.events.push(UnitEvent {
                unit: self.id,
                kind: UnitEventKind::Deposited { resource, amount },
            });
        }
        self.clear_route();

        match self.gather_target {
            Some(target) => {
                self.order_gather_in_slot(
                    target.tile,
                    target.kind,
                    self.gather_slot,
                    ctx.grid,
                    ctx.pathfinder,
                );
            }
            None => self.transition(UnitState::Idle),
        }
    }

    fn advance(&mut self, dt_ms: f32, ctx: &mut TickContext<'_>) {
        let grid = ctx.grid;
        let waypoint = match self.waypoint {
            Some(waypoint) => waypoint,
            None => match self.path.pop_front() {
                Some(next) => {
                    self.waypoint = Some(next);
                    next
                }
                None => {
                    self.finish_route(grid);
                    return;
                }
            },
        };

        let target = grid.tile_center(waypoint);
        let dx = target.x - self.position.x;
        let dy = target.y - self.position.y;
        let distance = (dx * dx + dy * dy).sqrt();
        let step = self.tuning.speed * dt_ms / 1000.0;
        let arrived = distance <= step;
        let next = if arrived {
            target
        } else {
            self.position.offset(dx / distance * step, dy / distance * step)
        };

        // A diagonal step can graze the corner of a side cell; those are
        // judged by the cell being entered.
        let here = grid.world_to_tile(self.position);
        let landing = grid.world_to_tile(next);
        let entered = if landing == here || landing == waypoint {
            landing
        } else {
            waypoint
        };
        if !grid.is_walkable(entered) {
            self.abort(entered);
            return;
        }

        self.position = next;
        if distance > f32::EPSILON {
            self.facing = Facing::from_vector(dx, dy);
        }
        if arrived {
            self.waypoint = None;
        }
    }

    fn finish_route(&mut self, grid: &GridMap) {
        match self.state {
            UnitState::Walking if self.gather_target.is_some() => self.begin_gathering(grid),
            UnitState::Walking => self.transition(UnitState::Idle),
            UnitState::Delivering => {
                warn!(unit = %self.id, "drop-off out of reach");
                self.transition(UnitState::Idle);
            }
            UnitState::Idle | UnitState::Gathering => {}
        }
    }

    fn begin_gathering(&mut self, grid: &GridMap) {
        if let Some(target) = self.gather_target {
            let resource = grid.tile_center(target.tile);
            let dx = resource.x - self.position.x;
            let dy = resource.y - self.position.y;
            if dx != 0.0 || dy != 0.0 {
                self.facing = Facing::from_vector(dx, dy);
            }
        }
        self.gather_timer_ms = 0.0;
        self.transition(UnitState::Gathering);
    }

    fn abort(&mut self, blocked: TilePos) {
        debug!(unit = %self.id, x = blocked.x, y = blocked.y, "step blocked");
        self.events.push(UnitEvent {
            unit: self.id,
            kind: UnitEventKind::Blocked { tile: blocked },
        });
        self.clear_route();
        self.gather_target = None;
        self.transition(UnitState::Idle);
    }

    fn start_route(
        &mut self,
        goal: TilePos,
        grid: &GridMap,
        pathfinder: &PathFinder,
        moving: UnitState,
    ) -> bool {
        let path = pathfinder.find_path(self.tile(grid), goal, grid);
        self.waypoint = None;
        self.path = path.into();
        if self.path.is_empty() {
            return false;
        }
        self.transition(moving);
        true
    }

    fn clear_route(&mut self) {
        self.path.clear();
        self.waypoint = None;
    }

    fn transition(&mut self, to: UnitState) {
        if self.state == to {
            return;
        }
        let from = self.state;
        debug!(unit = %self.id, from = from.as_str(), to = to.as_str(), "state change");
        self.events.push(UnitEvent {
            unit: self.id,
            kind: UnitEventKind::StateChanged { from, to },
        });
        self.state = to;
    }
}
