//! Pointer selection and order fan-out for the player's villagers.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::geometry::{Rect, WorldPoint};
use crate::map::{GridMap, TileKind, TilePos};
use crate::pathfinding::PathFinder;
use crate::unit::{UnitAgent, UnitId};

fn default_pick_radius() -> f32 {
    30.0
}

fn default_formation_spacing() -> f32 {
    25.0
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectionSettings {
    /// How close a click must land to a unit to pick it, in world pixels.
    #[serde(default = "default_pick_radius")]
    pub pick_radius: f32,
    /// Gap between neighbouring units of a move order's formation.
    #[serde(default = "default_formation_spacing")]
    pub formation_spacing: f32,
}

impl Default for SelectionSettings {
    fn default() -> Self {
        Self {
            pick_radius: default_pick_radius(),
            formation_spacing: default_formation_spacing(),
        }
    }
}

/// What a context order resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssuedOrder {
    Nothing,
    Move { routed: usize },
    Gather { kind: TileKind, routed: usize },
}

/// Owns the current selection. Every gesture replaces it outright.
#[derive(Debug, Clone, Default)]
pub struct SelectionController {
    settings: SelectionSettings,
    selected: Vec<UnitId>,
}

impl SelectionController {
    pub fn new(settings: SelectionSettings) -> Self {
        Self {
            settings,
            selected: Vec::new(),
        }
    }

    pub fn settings(&self) -> &SelectionSettings {
        &self.settings
    }

    pub fn selected(&self) -> &[UnitId] {
        &self.selected
    }

    pub fn is_selected(&self, id: UnitId) -> bool {
        self.selected.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Picks the first unit within the pick radius of `point`, if any.
    pub fn select_at(&mut self, point: WorldPoint, units: &[UnitAgent]) -> &[UnitId] {
        self.selected.clear();
        if let Some(unit) = units
            .iter()
            .find(|unit| unit.position().distance(point) < self.settings.pick_radius)
        {
            self.selected.push(unit.id());
        }
        &self.selected
    }

    pub fn select_in_rect(&mut self, rect: Rect, units: &[UnitAgent]) -> &[UnitId] {
        self.selected.clear();
        self.selected.extend(
            units
                .iter()
                .filter(|unit| rect.contains(unit.position()))
                .map(UnitAgent::id),
        );
        &self.selected
    }

    pub fn select_all(&mut self, units: &[UnitAgent]) -> &[UnitId] {
        self.selected.clear();
        self.selected.extend(units.iter().map(UnitAgent::id));
        &self.selected
    }

    /// Offset of the `index`-th unit in a three-wide formation centred on
    /// the order point.
    pub fn formation_offset(&self, index: usize) -> (f32, f32) {
        let spacing = self.settings.formation_spacing;
        let column = (index % 3) as f32;
        let row = (index / 3) as f32;
        (column * spacing - spacing, row * spacing - spacing)
    }

    /// Sends every selected unit towards `point`, spread into a formation.
    /// A unit whose formation slot is blocked or unreachable heads for
    /// `point` itself. Returns how many found a route.
    pub fn issue_move_order(
        &self,
        point: WorldPoint,
        units: &mut [UnitAgent],
        grid: &GridMap,
        pathfinder: &PathFinder,
    ) -> usize {
        let mut routed = 0;
        for (index, id) in self.selected.iter().enumerate() {
            let Some(unit) = units.iter_mut().find(|unit| unit.id() == *id) else {
                continue;
            };
            let (dx, dy) = self.formation_offset(index);
            let slot = point.offset(dx, dy);
            let reached =
                grid.is_walkable_world(slot) && unit.order_move(slot, grid, pathfinder);
            if reached || unit.order_move(point, grid, pathfinder) {
                routed += 1;
            }
        }
        debug!(selected = self.selected.len(), routed, "move order");
        routed
    }

    /// Sends every selected unit to harvest `tile`. The `n`-th selected unit
    /// takes the `n`-th nearest open side from where it stands, so a group
    /// does not crowd onto one cell.
    pub fn issue_gather_order(
        &self,
        tile: TilePos,
        kind: TileKind,
        units: &mut [UnitAgent],
        grid: &GridMap,
        pathfinder: &PathFinder,
    ) -> usize {
        let mut routed = 0;
        for (index, id) in self.selected.iter().enumerate() {
            let Some(unit) = units.iter_mut().find(|unit| unit.id() == *id) else {
                continue;
            };
            if unit.order_gather_in_slot(tile, kind, index, grid, pathfinder) {
                routed += 1;
            }
        }
        debug!(
            selected = self.selected.len(),
            routed,
            kind = kind.as_str(),
            "gather order"
        );
        routed
    }

    /// Context order: harvest when `point` lies on a resource, walk there
    /// otherwise. Off-map points and empty selections do nothing.
    pub fn issue_order_at(
        &self,
        point: WorldPoint,
        units: &mut [UnitAgent],
        grid: &GridMap,
        pathfinder: &PathFinder,
    ) -> IssuedOrder {
        if self.selected.is_empty() {
            return IssuedOrder::Nothing;
        }
        let tile = grid.world_to_tile(point);
        match grid.kind_at(tile) {
            None => IssuedOrder::Nothing,
            Some(kind) if kind.is_resource() => IssuedOrder::Gather {
                kind,
                routed: self.issue_gather_order(tile, kind, units, grid, pathfinder),
            },
            Some(_) => IssuedOrder::Move {
                routed: self.issue_move_order(point, units, grid, pathfinder),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::{UnitState, UnitTuning};

    fn units_at(points: &[(f32, f32)]) -> Vec<UnitAgent> {
        points
            .iter()
            .enumerate()
            .map(|(index, (x, y))| {
                UnitAgent::new(
                    UnitId::new(index as u32),
                    WorldPoint::new(*x, *y),
                    UnitTuning::default(),
                )
            })
            .collect()
    }

    #[test]
    fn select_at_takes_first_match_in_order() {
        let units = units_at(&[(100.0, 100.0), (110.0, 100.0)]);
        let mut selection = SelectionController::default();
        let picked = selection.select_at(WorldPoint::new(108.0, 100.0), &units);
        assert_eq!(picked, &[UnitId::new(0)]);
    }

    #[test]
    fn select_at_empty_space_clears() {
        let units = units_at(&[(100.0, 100.0)]);
        let mut selection = SelectionController::default();
        selection.select_at(WorldPoint::new(100.0, 100.0), &units);
        assert!(!selection.is_empty());
        selection.select_at(WorldPoint::new(400.0, 400.0), &units);
        assert!(selection.is_empty());
    }

    #[test]
    fn formation_spreads_three_wide() {
        let selection = SelectionController::default();
        assert_eq!(selection.formation_offset(0), (-25.0, -25.0));
        assert_eq!(selection.formation_offset(1), (0.0, -25.0));
        assert_eq!(selection.formation_offset(2), (25.0, -25.0));
        assert_eq!(selection.formation_offset(3), (-25.0, 0.0));
        assert_eq!(selection.formation_offset(4), (0.0, 0.0));
    }

    #[test]
    fn context_order_on_resource_gathers() {
        let mut grid = GridMap::new(20, 20, 32.0);
        grid.set_kind(TilePos::new(10, 10), TileKind::Gold);
        let pathfinder = PathFinder::new();
        let mut units = units_at(&[(80.0, 80.0), (80.0, 144.0)]);
        let mut selection = SelectionController::default();
        selection.select_in_rect(
            Rect::from_corners(WorldPoint::new(0.0, 0.0), WorldPoint::new(200.0, 200.0)),
            &units,
        );

        let order = selection.issue_order_at(
            grid.tile_center(TilePos::new(10, 10)),
            &mut units,
            &grid,
            &pathfinder,
        );
        assert_eq!(
            order,
            IssuedOrder::Gather {
                kind: TileKind::Gold,
                routed: 2
            }
        );
        assert!(units.iter().all(|unit| unit.state() == UnitState::Walking));

        let order = selection.issue_order_at(
            WorldPoint::new(-50.0, 10.0),
            &mut units,
            &grid,
            &pathfinder,
        );
        assert_eq!(order, IssuedOrder::Nothing);
    }

    #[test]
    fn blocked_formation_slot_falls_back_to_click() {
        let mut grid = GridMap::new(20, 20, 32.0);
        grid.set_kind(TilePos::new(9, 9), TileKind::Forest);
        let pathfinder = PathFinder::new();
        let mut units = units_at(&[(80.0, 80.0)]);
        let mut selection = SelectionController::default();
        selection.select_at(WorldPoint::new(80.0, 80.0), &units);

        let click = grid.tile_center(TilePos::new(10, 10));
        let routed = selection.issue_move_order(click, &mut units, &grid, &pathfinder);
        assert_eq!(routed, 1);
        assert_eq!(units[0].state(), UnitState::Walking);
        assert_eq!(units[0].remaining_path().last(), Some(&TilePos::new(10, 10)));
    }

    #[test]
    fn gather_order_spreads_group_around_resource() {
        let mut grid = GridMap::new(20, 20, 32.0);
        grid.set_kind(TilePos::new(10, 10), TileKind::Forest);
        let pathfinder = PathFinder::new();
        let start = grid.tile_center(TilePos::new(3, 10));
        let mut units = units_at(&[(start.x, start.y), (start.x, start.y)]);
        let mut selection = SelectionController::default();
        selection.select_in_rect(
            Rect::from_corners(WorldPoint::new(0.0, 0.0), WorldPoint::new(200.0, 400.0)),
            &units,
        );

        let routed = selection.issue_gather_order(
            TilePos::new(10, 10),
            TileKind::Forest,
            &mut units,
            &grid,
            &pathfinder,
        );
        assert_eq!(routed, 2);
        let goals: Vec<_> = units
            .iter()
            .map(|unit| unit.remaining_path().last().copied())
            .collect();
        assert_eq!(goals, vec![Some(TilePos::new(9, 10)), Some(TilePos::new(9, 9))]);
    }

    #[test]
    fn move_order_only_touches_selected_units() {
        let grid = GridMap::new(20, 20, 32.0);
        let pathfinder = PathFinder::new();
        let mut units = units_at(&[(80.0, 80.0), (400.0, 400.0)]);
        let mut selection = SelectionController::default();
        selection.select_at(WorldPoint::new(80.0, 80.0), &units);

        let routed = selection.issue_move_order(
            WorldPoint::new(300.0, 100.0),
            &mut units,
            &grid,
            &pathfinder,
        );
        assert_eq!(routed, 1);
        assert_eq!(units[0].state(), UnitState::Walking);
        assert_eq!(units[1].state(), UnitState::Idle);
    }
}
