use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

pub use crate::config::Scenario;
use crate::{
    config::ScenarioError,
    map::GridMap,
    rng::{self, RngManager},
    unit::DropOff,
    world::{World, WorldSettings},
};

pub struct ScenarioLoader {
    base_dir: PathBuf,
}

impl ScenarioLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scenario> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
        let scenario: Scenario = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        scenario
            .validate()
            .with_context(|| format!("Invalid scenario {}", path.display()))?;
        Ok(scenario)
    }
}

impl Scenario {
    pub fn world_settings(&self, grid: &GridMap) -> WorldSettings {
        WorldSettings {
            dt_ms: self.dt_ms,
            tuning: self.units,
            drop_off: DropOff {
                point: grid.tile_center(self.town_center.drop_off_tile()),
                radius: self.town_center.drop_off_radius,
            },
            selection: self.selection,
            starting_resources: self.resources.starting,
            max_path_expansions: self.pathfinding.max_expansions,
        }
    }

    /// Generates the map and spawns the villagers. The same seed always
    /// yields the same world.
    pub fn build_world(&self) -> Result<World, ScenarioError> {
        let mut rng = RngManager::new(self.seed);
        let mut grid = GridMap::new(self.map.width, self.map.height, self.map.tile_size);
        let center = self.town_center.tile;

        grid.protect_area(center, self.town_center.protect_radius);
        let seeded = grid.place_starting_resources(
            center,
            &self.resources.starting_clusters,
            self.resources.starting_distance,
            &mut rng.stream(rng::STARTING_RESOURCES),
        );
        debug!(cells = seeded, "starting resources placed");

        if self.map.single_trees > 0 {
            let planted =
                grid.place_single_trees(self.map.single_trees, &mut rng.stream(rng::SINGLE_TREES));
            debug!(planted, "single trees placed");
        }

        let placements = grid.randomize_global_resources(
            &self.resources.global,
            self.resources.attempts,
            self.resources.clear_radius,
            &mut rng.stream(rng::GLOBAL_RESOURCES),
        );
        for placement in &placements {
            debug!(
                kind = placement.kind.as_str(),
                requested = placement.requested,
                placed = placement.placed,
                "global clusters"
            );
        }

        let (min, max) = self.town_center.footprint_bounds();
        grid.place_building(min, max);

        let settings = self.world_settings(&grid);
        let mut world = World::new(grid, settings);
        for tile in &self.villagers {
            if world.spawn_unit(*tile).is_none() {
                warn!(x = tile.x, y = tile.y, "villager spawn blocked");
                return Err(ScenarioError::Validation(format!(
                    "villager spawn ({}, {}) is not walkable after generation",
                    tile.x, tile.y
                )));
            }
        }
        for order in &self.orders {
            world.queue(*order);
        }

        info!(
            scenario = %self.name,
            seed = self.seed,
            width = self.map.width,
            height = self.map.height,
            villagers = world.units().len(),
            orders = self.orders.len(),
            "world built"
        );
        Ok(world)
    }
}
