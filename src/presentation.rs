//! Read-only mapping from simulation state to what a renderer shows:
//! animation clips per `(activity, facing)` and pointer hints.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::geometry::WorldPoint;
use crate::map::{GridMap, TileKind};
use crate::unit::{Facing, UnitAgent, UnitState};

/// What the villager sprite is doing, independent of heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    Idle,
    Walk,
    Chop,
    Mine,
    Forage,
}

impl Activity {
    pub const ALL: [Activity; 5] = [
        Activity::Idle,
        Activity::Walk,
        Activity::Chop,
        Activity::Mine,
        Activity::Forage,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Activity::Idle => "idle",
            Activity::Walk => "walk",
            Activity::Chop => "chop",
            Activity::Mine => "mine",
            Activity::Forage => "food",
        }
    }

    fn for_harvest(kind: TileKind) -> Self {
        match kind {
            TileKind::Forest => Activity::Chop,
            TileKind::Gold | TileKind::Stone => Activity::Mine,
            TileKind::Food => Activity::Forage,
            TileKind::Grass | TileKind::Building => Activity::Idle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct AnimationKey {
    pub activity: Activity,
    pub facing: Facing,
}

impl AnimationKey {
    pub fn for_unit(unit: &UnitAgent) -> Self {
        let activity = match unit.state() {
            UnitState::Idle => Activity::Idle,
            UnitState::Walking | UnitState::Delivering => Activity::Walk,
            UnitState::Gathering => unit
                .gather_target()
                .map_or(Activity::Idle, |target| Activity::for_harvest(target.kind)),
        };
        Self {
            activity,
            facing: unit.facing(),
        }
    }

    /// Asset identifier, e.g. `villager_walk_down_left`.
    pub fn id(&self) -> String {
        format!("villager_{}_{}", self.activity.as_str(), self.facing.as_str())
    }

    pub fn all() -> impl Iterator<Item = AnimationKey> {
        Activity::ALL.into_iter().flat_map(|activity| {
            Facing::ALL
                .into_iter()
                .map(move |facing| AnimationKey { activity, facing })
        })
    }
}

impl fmt::Display for AnimationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnimationClip {
    pub id: String,
    pub frames: u32,
    pub frame_rate: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PresentationError {
    #[error("no animation asset for {0}")]
    MissingAnimation(String),
}

/// Every `(activity, facing)` pair resolved to a clip up front, so lookups
/// during play cannot miss.
#[derive(Debug, Clone)]
pub struct AnimationCatalog {
    clips: HashMap<AnimationKey, AnimationClip>,
}

impl AnimationCatalog {
    /// The villager sheet set: five frames per clip, idle at 6 fps and
    /// everything else at 10 fps.
    pub fn villager() -> Self {
        let clips = AnimationKey::all()
            .map(|key| {
                let frame_rate = if key.activity == Activity::Idle { 6 } else { 10 };
                let clip = AnimationClip {
                    id: key.id(),
                    frames: 5,
                    frame_rate,
                };
                (key, clip)
            })
            .collect();
        Self { clips }
    }

    /// Checks that every clip id is among the loaded assets.
    pub fn validate<'a>(
        self,
        available: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, PresentationError> {
        let available: HashSet<&str> = available.into_iter().collect();
        for key in AnimationKey::all() {
            match self.clips.get(&key) {
                Some(clip) if available.contains(clip.id.as_str()) => {}
                _ => return Err(PresentationError::MissingAnimation(key.id())),
            }
        }
        Ok(self)
    }

    pub fn clip(&self, key: AnimationKey) -> Option<&AnimationClip> {
        self.clips.get(&key)
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorHint {
    Idle,
    Chop,
    Mine,
    Hand,
}

const CURSOR_PROBES: [(f32, f32); 4] = [(0.0, 0.0), (20.0, 0.0), (0.0, 20.0), (20.0, 20.0)];

/// Pointer shown over `point`. Only a live selection turns resources into
/// action cursors.
pub fn cursor_hint(grid: &GridMap, point: WorldPoint, has_selection: bool) -> CursorHint {
    if !has_selection {
        return CursorHint::Idle;
    }
    let resource = CURSOR_PROBES.iter().find_map(|(dx, dy)| {
        grid.kind_at(grid.world_to_tile(point.offset(*dx, *dy)))
            .filter(|kind| kind.is_resource())
    });
    match resource {
        Some(TileKind::Forest) => CursorHint::Chop,
        Some(TileKind::Gold | TileKind::Stone) => CursorHint::Mine,
        Some(TileKind::Food) => CursorHint::Hand,
        _ => CursorHint::Idle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::TilePos;
    use crate::pathfinding::PathFinder;
    use crate::unit::{UnitId, UnitTuning};

    #[test]
    fn catalog_covers_every_pair() {
        let catalog = AnimationCatalog::villager();
        assert_eq!(catalog.len(), 40);
        let idle = catalog
            .clip(AnimationKey {
                activity: Activity::Idle,
                facing: Facing::Down,
            })
            .unwrap();
        assert_eq!(idle.id, "villager_idle_down");
        assert_eq!(idle.frame_rate, 6);
    }

    #[test]
    fn validation_reports_missing_assets() {
        let all: Vec<String> = AnimationKey::all().map(|key| key.id()).collect();
        let ok = AnimationCatalog::villager().validate(all.iter().map(String::as_str));
        assert!(ok.is_ok());

        let partial = all
            .iter()
            .filter(|id| id.as_str() != "villager_mine_up_left")
            .map(String::as_str);
        let err = AnimationCatalog::villager().validate(partial).unwrap_err();
        assert_eq!(
            err,
            PresentationError::MissingAnimation("villager_mine_up_left".into())
        );
    }

    #[test]
    fn gathering_picks_activity_from_resource() {
        let mut grid = GridMap::new(10, 10, 32.0);
        grid.set_kind(TilePos::new(5, 5), TileKind::Stone);
        let mut unit = UnitAgent::new(
            UnitId::new(0),
            grid.tile_center(TilePos::new(4, 5)),
            UnitTuning::default(),
        );
        assert_eq!(AnimationKey::for_unit(&unit).activity, Activity::Idle);

        unit.order_gather(TilePos::new(5, 5), TileKind::Stone, &grid, &PathFinder::new());
        let key = AnimationKey::for_unit(&unit);
        assert_eq!(key.activity, Activity::Mine);
        assert_eq!(key.id(), "villager_mine_right");
    }

    #[test]
    fn cursor_reflects_resource_under_pointer() {
        let mut grid = GridMap::new(10, 10, 32.0);
        grid.set_kind(TilePos::new(3, 3), TileKind::Forest);
        grid.set_kind(TilePos::new(6, 6), TileKind::Food);
        let near_tree = WorldPoint::new(90.0, 90.0);
        assert_eq!(cursor_hint(&grid, near_tree, false), CursorHint::Idle);
        assert_eq!(cursor_hint(&grid, near_tree, true), CursorHint::Chop);
        assert_eq!(
            cursor_hint(&grid, grid.tile_center(TilePos::new(6, 6)), true),
            CursorHint::Hand
        );
        assert_eq!(
            cursor_hint(&grid, WorldPoint::new(260.0, 20.0), true),
            CursorHint::Idle
        );
    }
}
