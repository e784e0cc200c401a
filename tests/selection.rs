use homestead::{
    geometry::{Rect, WorldPoint},
    map::{GridMap, TilePos},
    unit::UnitState,
    world::{Command, World, WorldSettings},
};

fn field_with_units() -> World {
    let mut world = World::new(GridMap::new(24, 24, 32.0), WorldSettings::default());
    for tile in [
        TilePos::new(2, 2),
        TilePos::new(3, 2),
        TilePos::new(12, 12),
        TilePos::new(13, 12),
        TilePos::new(14, 12),
    ] {
        world.spawn_unit(tile).unwrap();
    }
    world
}

#[test]
fn drag_box_selects_only_enclosed_units() {
    let mut world = field_with_units();
    world.queue(Command::SelectInRect(Rect::from_corners(
        WorldPoint::new(140.0, 40.0),
        WorldPoint::new(40.0, 100.0),
    )));
    world.apply_pending_commands();

    let selected: Vec<u32> = world
        .selection()
        .selected()
        .iter()
        .map(|id| id.raw())
        .collect();
    assert_eq!(selected, vec![0, 1]);
}

#[test]
fn click_on_empty_ground_clears_selection() {
    let mut world = field_with_units();
    world.queue(Command::SelectInRect(Rect::from_corners(
        WorldPoint::new(0.0, 0.0),
        WorldPoint::new(768.0, 768.0),
    )));
    world.apply_pending_commands();
    assert_eq!(world.selection().selected().len(), 5);

    world.queue(Command::SelectAt(WorldPoint::new(600.0, 100.0)));
    world.apply_pending_commands();
    assert!(world.selection().is_empty());

    world.queue(Command::MoveTo(WorldPoint::new(300.0, 300.0)));
    world.apply_pending_commands();
    assert!(world
        .units()
        .iter()
        .all(|unit| unit.state() == UnitState::Idle));
}

#[test]
fn move_order_spreads_into_formation() {
    let mut world = field_with_units();
    world.queue(Command::SelectInRect(Rect::from_corners(
        WorldPoint::new(40.0, 40.0),
        WorldPoint::new(140.0, 100.0),
    )));
    let target = world.grid().tile_center(TilePos::new(8, 8));
    world.queue(Command::MoveTo(target));
    world.apply_pending_commands();

    for _ in 0..100 {
        world.update_units(world.dt_ms());
        world.advance_time();
    }

    let grid = world.grid();
    let tiles: Vec<TilePos> = world.units()[..2]
        .iter()
        .map(|unit| unit.tile(grid))
        .collect();
    assert_eq!(tiles, vec![TilePos::new(7, 7), TilePos::new(8, 7)]);
    assert!(world.units()[..2]
        .iter()
        .all(|unit| unit.state() == UnitState::Idle));
    assert_eq!(world.units()[2].state(), UnitState::Idle);
    assert_eq!(world.units()[2].tile(grid), TilePos::new(12, 12));
}
