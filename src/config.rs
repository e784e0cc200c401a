//! Scenario schema. Every tunable has a default so a scenario file only
//! needs to name what it changes.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ledger::ResourceTotals;
use crate::map::{
    default_global_clusters, default_starting_clusters, ClusterSpec, GlobalClusterSpec, TilePos,
};
use crate::selection::SelectionSettings;
use crate::unit::UnitTuning;
use crate::world::Command;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("scenario parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("scenario validation error: {0}")]
    Validation(String),
}

fn default_dt_ms() -> f32 {
    50.0
}

fn default_map_size() -> u32 {
    100
}

fn default_tile_size() -> f32 {
    32.0
}

fn default_town_center() -> TilePos {
    TilePos::new(15, 15)
}

fn default_protect_radius() -> i32 {
    3
}

fn default_drop_off_offset() -> TilePos {
    TilePos::new(0, 2)
}

fn default_drop_off_radius() -> f32 {
    40.0
}

fn default_villagers() -> Vec<TilePos> {
    vec![TilePos::new(17, 17), TilePos::new(13, 17)]
}

fn default_starting_totals() -> ResourceTotals {
    ResourceTotals {
        food: 200,
        stone: 150,
        gold: 100,
        wood: 200,
    }
}

fn default_starting_distance() -> f32 {
    6.0
}

fn default_attempts() -> usize {
    500
}

fn default_clear_radius() -> i32 {
    8
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub ticks: Option<u64>,
    /// Simulated milliseconds per tick.
    #[serde(default = "default_dt_ms")]
    pub dt_ms: f32,
    #[serde(default)]
    pub snapshot_interval_ticks: u64,
    #[serde(default)]
    pub map: MapConfig,
    #[serde(default)]
    pub town_center: TownCenterConfig,
    #[serde(default = "default_villagers")]
    pub villagers: Vec<TilePos>,
    /// Commands queued before the first tick.
    #[serde(default)]
    pub orders: Vec<Command>,
    #[serde(default)]
    pub units: UnitTuning,
    #[serde(default)]
    pub selection: SelectionSettings,
    #[serde(default)]
    pub resources: ResourcesConfig,
    #[serde(default)]
    pub pathfinding: PathfindingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapConfig {
    #[serde(default = "default_map_size")]
    pub width: u32,
    #[serde(default = "default_map_size")]
    pub height: u32,
    #[serde(default = "default_tile_size")]
    pub tile_size: f32,
    #[serde(default)]
    pub single_trees: usize,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            width: default_map_size(),
            height: default_map_size(),
            tile_size: default_tile_size(),
            single_trees: 0,
        }
    }
}

/// Building footprint as offsets from the town-center tile, inclusive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FootprintConfig {
    pub min: TilePos,
    pub max: TilePos,
}

impl Default for FootprintConfig {
    fn default() -> Self {
        Self {
            min: TilePos::new(-1, -1),
            max: TilePos::new(1, 0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TownCenterConfig {
    #[serde(default = "default_town_center")]
    pub tile: TilePos,
    #[serde(default = "default_protect_radius")]
    pub protect_radius: i32,
    #[serde(default)]
    pub footprint: FootprintConfig,
    /// Drop-off tile relative to `tile`.
    #[serde(default = "default_drop_off_offset")]
    pub drop_off_offset: TilePos,
    #[serde(default = "default_drop_off_radius")]
    pub drop_off_radius: f32,
}

impl Default for TownCenterConfig {
    fn default() -> Self {
        Self {
            tile: default_town_center(),
            protect_radius: default_protect_radius(),
            footprint: FootprintConfig::default(),
            drop_off_offset: default_drop_off_offset(),
            drop_off_radius: default_drop_off_radius(),
        }
    }
}

impl TownCenterConfig {
    pub fn footprint_bounds(&self) -> (TilePos, TilePos) {
        (
            self.tile.offset(self.footprint.min.x, self.footprint.min.y),
            self.tile.offset(self.footprint.max.x, self.footprint.max.y),
        )
    }

    pub fn drop_off_tile(&self) -> TilePos {
        self.tile
            .offset(self.drop_off_offset.x, self.drop_off_offset.y)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourcesConfig {
    #[serde(default = "default_starting_totals")]
    pub starting: ResourceTotals,
    #[serde(default = "default_starting_clusters")]
    pub starting_clusters: Vec<ClusterSpec>,
    /// Ring radius, in tiles, for the clusters around the town center.
    #[serde(default = "default_starting_distance")]
    pub starting_distance: f32,
    #[serde(default = "default_global_clusters")]
    pub global: Vec<GlobalClusterSpec>,
    #[serde(default = "default_attempts")]
    pub attempts: usize,
    #[serde(default = "default_clear_radius")]
    pub clear_radius: i32,
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            starting: default_starting_totals(),
            starting_clusters: default_starting_clusters(),
            starting_distance: default_starting_distance(),
            global: default_global_clusters(),
            attempts: default_attempts(),
            clear_radius: default_clear_radius(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathfindingConfig {
    #[serde(default)]
    pub max_expansions: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Scenario {
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let text = fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// Parses and validates.
    pub fn from_yaml(text: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = serde_yaml::from_str(text)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn validate(&self) -> Result<(), ScenarioError> {
        if self.name.trim().is_empty() {
            return Err(invalid("scenario name must not be empty"));
        }
        if self.map.width == 0 || self.map.height == 0 {
            return Err(invalid(format!(
                "map must be at least 1x1, got {}x{}",
                self.map.width, self.map.height
            )));
        }
        if self.map.width > MAX_MAP_SIDE || self.map.height > MAX_MAP_SIDE {
            return Err(invalid(format!(
                "map may be at most {MAX_MAP_SIDE}x{MAX_MAP_SIDE}, got {}x{}",
                self.map.width, self.map.height
            )));
        }
        if self.map.tile_size <= 0.0 {
            return Err(invalid("tile_size must be positive"));
        }
        if self.dt_ms <= 0.0 {
            return Err(invalid("dt_ms must be positive"));
        }
        if self.units.speed <= 0.0 {
            return Err(invalid("unit speed must be positive"));
        }
        if self.units.gathering_rate <= 0.0 {
            return Err(invalid("gathering_rate must be positive"));
        }
        if self.units.capacity == 0 {
            return Err(invalid("unit capacity must be at least 1"));
        }
        if !self.contains(self.town_center.tile) {
            let tile = self.town_center.tile;
            return Err(invalid(format!(
                "town center ({}, {}) is outside the map",
                tile.x, tile.y
            )));
        }
        if self.town_center.protect_radius < 0 {
            return Err(invalid("protect_radius must not be negative"));
        }
        if let Some(tile) = self.villagers.iter().find(|tile| !self.contains(**tile)) {
            return Err(invalid(format!(
                "villager spawn ({}, {}) is outside the map",
                tile.x, tile.y
            )));
        }
        Ok(())
    }

    fn contains(&self, tile: TilePos) -> bool {
        tile.x >= 0
            && tile.y >= 0
            && (tile.x as u32) < self.map.width
            && (tile.y as u32) < self.map.height
    }

    pub fn ticks(&self, override_ticks: Option<u64>) -> u64 {
        override_ticks.or(self.ticks).unwrap_or(600)
    }
}

/// Largest map side accepted; tile coordinates are `i32`.
pub const MAX_MAP_SIDE: u32 = 4096;

fn invalid(message: impl Into<String>) -> ScenarioError {
    ScenarioError::Validation(message.into())
}
