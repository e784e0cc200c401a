use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use homestead::{
    engine::{Engine, EngineBuilder, EngineSettings},
    geometry::WorldPoint,
    ledger::{ResourceKind, ResourceTotals},
    map::{GridMap, TileKind, TilePos},
    unit::{DropOff, UnitEventKind, UnitState},
    world::{Command, World, WorldSettings},
};

const TREE: TilePos = TilePos::new(14, 10);
const STAND: TilePos = TilePos::new(13, 11);

fn camp() -> World {
    let mut grid = GridMap::new(20, 20, 32.0);
    grid.protect_area(TilePos::new(10, 10), 3);
    grid.set_kind(TREE, TileKind::Forest);
    let settings = WorldSettings {
        dt_ms: 100.0,
        drop_off: DropOff {
            point: grid.tile_center(TilePos::new(10, 12)),
            radius: 40.0,
        },
        ..WorldSettings::default()
    };
    World::new(grid, settings)
}

fn engine() -> Engine {
    EngineBuilder::new(EngineSettings {
        scenario_name: "camp".into(),
        snapshot_interval_ticks: 0,
        snapshot_dir: PathBuf::from("snapshots_unused"),
    })
    .with_default_systems()
    .build()
}

#[test]
fn villager_chops_and_delivers_one_load() {
    let mut world = camp();
    let id = world.spawn_unit(STAND).unwrap();
    let seen: Arc<Mutex<Vec<ResourceTotals>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    world
        .ledger_mut()
        .subscribe(move |totals| sink.lock().unwrap().push(*totals));

    let at = world.unit(id).unwrap().position();
    world.queue(Command::SelectAt(at));
    world.queue(Command::GatherAt(TREE));

    let mut engine = engine();
    engine.run(&mut world, 99).unwrap();
    let unit = world.unit(id).unwrap();
    assert_eq!(unit.state(), UnitState::Gathering);
    assert_eq!(unit.inventory().amount, 9);

    engine.step(&mut world).unwrap();
    assert_eq!(world.unit(id).unwrap().state(), UnitState::Delivering);

    engine.run(&mut world, 20).unwrap();
    assert_eq!(world.ledger().get(ResourceKind::Wood), 10);
    assert_eq!(world.ledger().totals().total(), 10);

    let unit = world.unit(id).unwrap();
    assert_eq!(unit.inventory().amount, 0);
    assert_eq!(unit.gather_target().map(|target| target.tile), Some(TREE));
    assert!(matches!(
        unit.state(),
        UnitState::Walking | UnitState::Gathering
    ));

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].wood, 10);
}

#[test]
fn villager_walks_to_the_tree_and_delivers_a_full_load() {
    let mut world = camp();
    let id = world.spawn_unit(TilePos::new(10, 13)).unwrap();
    let capacity = u64::from(world.unit(id).unwrap().tuning().capacity);
    assert_eq!(world.ledger().totals().total(), 0);

    let at = world.unit(id).unwrap().position();
    world.queue(Command::SelectAt(at));
    world.queue(Command::GatherAt(TREE));

    let mut engine = engine();
    engine.step(&mut world).unwrap();
    assert_eq!(world.unit(id).unwrap().state(), UnitState::Walking);

    let grid = world.grid().clone();
    let mut gathering_tile = None;
    let mut first_deposit = None;
    engine
        .run_with_hook(&mut world, 200, |snapshot| {
            let unit = &snapshot.units[0];
            if gathering_tile.is_none() && unit.state == UnitState::Gathering {
                gathering_tile = Some(grid.world_to_tile(WorldPoint::new(unit.x, unit.y)));
            }
            let deposited = snapshot
                .events
                .iter()
                .any(|event| matches!(event.kind, UnitEventKind::Deposited { .. }));
            if first_deposit.is_none() && deposited {
                first_deposit = Some((snapshot.tick, snapshot.resources.wood));
            }
        })
        .unwrap();

    assert_eq!(gathering_tile, Some(STAND));
    let (tick, wood) = first_deposit.expect("a load reaches the drop-off");
    assert!(tick > 100);
    assert_eq!(wood, capacity);
    assert_eq!(world.ledger().get(ResourceKind::Wood), capacity);
}

#[test]
fn deposit_event_is_reported_on_its_tick() {
    let mut world = camp();
    let id = world.spawn_unit(STAND).unwrap();
    let at = world.unit(id).unwrap().position();
    world.queue(Command::SelectAt(at));
    world.queue(Command::OrderAt(world.grid().tile_center(TREE)));

    let mut deposits = Vec::new();
    engine()
        .run_with_hook(&mut world, 130, |snapshot| {
            for event in &snapshot.events {
                if let UnitEventKind::Deposited { resource, amount } = event.kind {
                    deposits.push((snapshot.tick, resource, amount));
                }
            }
        })
        .unwrap();

    assert_eq!(deposits.len(), 1);
    let (tick, resource, amount) = deposits[0];
    assert!(tick > 100 && tick <= 130);
    assert_eq!(resource, ResourceKind::Wood);
    assert_eq!(amount, 10);
}

#[test]
fn building_in_the_way_stops_the_walk() {
    let mut world = camp();
    let id = world.spawn_unit(TilePos::new(2, 2)).unwrap();
    let at = world.unit(id).unwrap().position();
    world.queue(Command::SelectAt(at));
    world.queue(Command::MoveTo(world.grid().tile_center(TilePos::new(8, 2))));

    let mut engine = engine();
    engine.step(&mut world).unwrap();
    assert_eq!(world.unit(id).unwrap().state(), UnitState::Walking);

    world
        .grid_mut()
        .place_building(TilePos::new(4, 0), TilePos::new(4, 5));
    engine.run(&mut world, 20).unwrap();

    let unit = world.unit(id).unwrap();
    assert_eq!(unit.state(), UnitState::Idle);
    assert!(unit.tile(world.grid()).x < 4);
}
