pub mod config;
pub mod engine;
pub mod geometry;
pub mod ledger;
pub mod logging;
pub mod map;
pub mod pathfinding;
pub mod presentation;
pub mod rng;
pub mod scenario;
pub mod selection;
pub mod snapshot;
pub mod systems;
pub mod unit;
pub mod web;
pub mod world;

pub use config::{Scenario, ScenarioError};
pub use engine::{Engine, EngineBuilder, EngineSettings};
pub use geometry::{Rect, WorldPoint};
pub use ledger::{ResourceKind, ResourceLedger, ResourceTotals};
pub use map::{GridMap, TileKind, TilePos};
pub use pathfinding::PathFinder;
pub use selection::SelectionController;
pub use unit::{UnitAgent, UnitId, UnitState};
pub use world::{Command, World};
