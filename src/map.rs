//! Tile map: terrain storage, procedural resource clusters and the
//! walkability queries used by pathfinding and movement.

use std::collections::HashSet;
use std::f32::consts::TAU;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::geometry::WorldPoint;
use crate::ledger::ResourceKind;

/// How many of the most recently pushed frontier entries a cluster fill
/// chooses from. Larger windows give rounder blobs, 1 gives a depth-first
/// snake.
pub const CLUSTER_FRONTIER_WINDOW: usize = 4;

/// Signed tile coordinate. Off-map coordinates are representable so that
/// generation and queries can fail closed instead of wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct TilePos {
    pub x: i32,
    pub y: i32,
}

impl TilePos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Chebyshev distance: the number of 8-directional steps between cells.
    pub fn chebyshev(self, other: TilePos) -> i32 {
        (self.x - other.x).abs().max((self.y - other.y).abs())
    }

    pub fn manhattan(self, other: TilePos) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    pub fn euclidean(self, other: TilePos) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dy = (self.y - other.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }

    /// The eight surrounding cells, row by row from the top-left.
    pub fn neighbors8(self) -> [TilePos; 8] {
        [
            self.offset(-1, -1),
            self.offset(0, -1),
            self.offset(1, -1),
            self.offset(-1, 0),
            self.offset(1, 0),
            self.offset(-1, 1),
            self.offset(0, 1),
            self.offset(1, 1),
        ]
    }

    pub fn neighbors4(self) -> [TilePos; 4] {
        [
            self.offset(1, 0),
            self.offset(-1, 0),
            self.offset(0, 1),
            self.offset(0, -1),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileKind {
    Grass,
    Forest,
    Gold,
    Stone,
    Food,
    Building,
}

impl TileKind {
    pub fn is_walkable(self) -> bool {
        matches!(self, TileKind::Grass)
    }

    pub fn is_resource(self) -> bool {
        self.resource_kind().is_some()
    }

    /// Ledger bucket credited when this tile is harvested.
    pub fn resource_kind(self) -> Option<ResourceKind> {
        match self {
            TileKind::Forest => Some(ResourceKind::Wood),
            TileKind::Gold => Some(ResourceKind::Gold),
            TileKind::Stone => Some(ResourceKind::Stone),
            TileKind::Food => Some(ResourceKind::Food),
            TileKind::Grass | TileKind::Building => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TileKind::Grass => "grass",
            TileKind::Forest => "forest",
            TileKind::Gold => "gold",
            TileKind::Stone => "stone",
            TileKind::Food => "food",
            TileKind::Building => "building",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    pub x: i32,
    pub y: i32,
    pub kind: TileKind,
    pub protected: bool,
}

/// A single cluster to seed: which resource and how many cells.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterSpec {
    pub kind: ResourceKind,
    pub size: usize,
}

/// A map-wide cluster pass for one resource.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlobalClusterSpec {
    pub kind: ResourceKind,
    pub count: usize,
    pub size: usize,
}

/// Outcome of one global cluster pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterPlacement {
    pub kind: ResourceKind,
    pub requested: usize,
    pub placed: usize,
}

pub fn default_starting_clusters() -> Vec<ClusterSpec> {
    vec![
        ClusterSpec {
            kind: ResourceKind::Stone,
            size: 4,
        },
        ClusterSpec {
            kind: ResourceKind::Gold,
            size: 4,
        },
        ClusterSpec {
            kind: ResourceKind::Food,
            size: 6,
        },
        ClusterSpec {
            kind: ResourceKind::Wood,
            size: 20,
        },
        ClusterSpec {
            kind: ResourceKind::Wood,
            size: 20,
        },
    ]
}

pub fn default_global_clusters() -> Vec<GlobalClusterSpec> {
    vec![
        GlobalClusterSpec {
            kind: ResourceKind::Gold,
            count: 15,
            size: 5,
        },
        GlobalClusterSpec {
            kind: ResourceKind::Stone,
            count: 12,
            size: 4,
        },
        GlobalClusterSpec {
            kind: ResourceKind::Food,
            count: 20,
            size: 8,
        },
        GlobalClusterSpec {
            kind: ResourceKind::Wood,
            count: 40,
            size: 65,
        },
    ]
}

/// Row-major tile grid with fixed dimensions.
#[derive(Debug, Clone)]
pub struct GridMap {
    width: u32,
    height: u32,
    tile_size: f32,
    tiles: Vec<Tile>,
}

impl GridMap {
    pub fn new(width: u32, height: u32, tile_size: f32) -> Self {
        let mut map = Self {
            width: 0,
            height: 0,
            tile_size,
            tiles: Vec::new(),
        };
        map.generate(width, height);
        map
    }

    /// Resets every cell to unprotected grass.
    pub fn generate(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.tiles.clear();
        self.tiles.reserve(width as usize * height as usize);
        for y in 0..height as i32 {
            for x in 0..width as i32 {
                self.tiles.push(Tile {
                    x,
                    y,
                    kind: TileKind::Grass,
                    protected: false,
                });
            }
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub fn in_bounds(&self, pos: TilePos) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    fn index(&self, pos: TilePos) -> Option<usize> {
        if self.in_bounds(pos) {
            Some(pos.y as usize * self.width as usize + pos.x as usize)
        } else {
            None
        }
    }

    pub fn tile(&self, pos: TilePos) -> Option<&Tile> {
        self.index(pos).and_then(|index| self.tiles.get(index))
    }

    fn tile_mut(&mut self, pos: TilePos) -> Option<&mut Tile> {
        self.index(pos).and_then(|index| self.tiles.get_mut(index))
    }

    pub fn kind_at(&self, pos: TilePos) -> Option<TileKind> {
        self.tile(pos).map(|tile| tile.kind)
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn count_kind(&self, kind: TileKind) -> usize {
        self.tiles.iter().filter(|tile| tile.kind == kind).count()
    }

    pub fn is_walkable(&self, pos: TilePos) -> bool {
        self.kind_at(pos).is_some_and(TileKind::is_walkable)
    }

    pub fn world_to_tile(&self, point: WorldPoint) -> TilePos {
        TilePos::new(
            (point.x / self.tile_size).floor() as i32,
            (point.y / self.tile_size).floor() as i32,
        )
    }

    pub fn tile_center(&self, pos: TilePos) -> WorldPoint {
        WorldPoint::new(
            (pos.x as f32 + 0.5) * self.tile_size,
            (pos.y as f32 + 0.5) * self.tile_size,
        )
    }

    pub fn is_walkable_world(&self, point: WorldPoint) -> bool {
        self.is_walkable(self.world_to_tile(point))
    }

    /// Overwrites a single tile. Returns false when `pos` is off the map.
    pub fn set_kind(&mut self, pos: TilePos, kind: TileKind) -> bool {
        match self.tile_mut(pos) {
            Some(tile) => {
                tile.kind = kind;
                true
            }
            None => false,
        }
    }

    /// Reserves the square of half-width `radius` around `center` as
    /// resource-free grass.
    pub fn protect_area(&mut self, center: TilePos, radius: i32) {
        for y in center.y - radius..=center.y + radius {
            for x in center.x - radius..=center.x + radius {
                if let Some(tile) = self.tile_mut(TilePos::new(x, y)) {
                    tile.protected = true;
                    tile.kind = TileKind::Grass;
                }
            }
        }
    }

    /// Marks the inclusive rectangle `min..=max` as building footprint.
    /// Returns the number of cells claimed.
    pub fn place_building(&mut self, min: TilePos, max: TilePos) -> usize {
        let mut claimed = 0;
        for y in min.y..=max.y {
            for x in min.x..=max.x {
                if self.set_kind(TilePos::new(x, y), TileKind::Building) {
                    claimed += 1;
                }
            }
        }
        claimed
    }

    /// True when every cell in the square is on the map, grass, and
    /// unprotected.
    pub fn is_area_clear(&self, center: TilePos, radius: i32) -> bool {
        for y in center.y - radius..=center.y + radius {
            for x in center.x - radius..=center.x + radius {
                match self.tile(TilePos::new(x, y)) {
                    Some(tile) if tile.kind == TileKind::Grass && !tile.protected => {}
                    _ => return false,
                }
            }
        }
        true
    }

    fn is_cluster_eligible(&self, pos: TilePos) -> bool {
        self.tile(pos)
            .is_some_and(|tile| tile.kind == TileKind::Grass && !tile.protected)
    }

    /// Grows a blob of `kind` from `seed` by randomized flood fill and returns
    /// how many cells were converted (at most `size`).
    pub fn fill_cluster<R: Rng + ?Sized>(
        &mut self,
        seed: TilePos,
        kind: TileKind,
        size: usize,
        rng: &mut R,
    ) -> usize {
        let mut frontier = vec![seed];
        let mut visited = HashSet::new();
        let mut placed = 0;

        while placed < size && !frontier.is_empty() {
            let window = frontier.len().min(CLUSTER_FRONTIER_WINDOW);
            let pick = frontier.len() - 1 - rng.gen_range(0..window);
            let pos = frontier.remove(pick);
            if !visited.insert(pos) {
                continue;
            }
            if !self.is_cluster_eligible(pos) {
                continue;
            }
            self.set_kind(pos, kind);
            placed += 1;
            frontier.extend(pos.neighbors4());
        }
        placed
    }

    /// Seeds one cluster per entry on a ring around the town center, evenly
    /// spaced and rotated by a single random angle.
    pub fn place_starting_resources<R: Rng + ?Sized>(
        &mut self,
        center: TilePos,
        clusters: &[ClusterSpec],
        distance: f32,
        rng: &mut R,
    ) -> usize {
        if clusters.is_empty() {
            return 0;
        }
        let rotation = rng.gen_range(0.0..TAU);
        let mut placed = 0;
        for (index, cluster) in clusters.iter().enumerate() {
            let angle = index as f32 / clusters.len() as f32 * TAU + rotation;
            let seed = TilePos::new(
                (center.x as f32 + angle.cos() * distance).round() as i32,
                (center.y as f32 + angle.sin() * distance).round() as i32,
            );
            let cells = self.fill_cluster(seed, cluster.kind.tile_kind(), cluster.size, rng);
            debug!(
                kind = cluster.kind.as_str(),
                x = seed.x,
                y = seed.y,
                cells,
                "starting cluster seeded"
            );
            placed += cells;
        }
        placed
    }

    /// Scatters clusters across the whole map. Each pass draws up to
    /// `attempts` random seeds and only fills where the surrounding square of
    /// `clear_radius` is untouched grass.
    pub fn randomize_global_resources<R: Rng + ?Sized>(
        &mut self,
        clusters: &[GlobalClusterSpec],
        attempts: usize,
        clear_radius: i32,
        rng: &mut R,
    ) -> Vec<ClusterPlacement> {
        let mut report = Vec::with_capacity(clusters.len());
        for cluster in clusters {
            let placed = self.place_global_clusters(cluster, attempts, clear_radius, rng);
            if placed < cluster.count {
                warn!(
                    kind = cluster.kind.as_str(),
                    requested = cluster.count,
                    placed,
                    "cluster budget exhausted"
                );
            } else {
                debug!(kind = cluster.kind.as_str(), placed, "global clusters placed");
            }
            report.push(ClusterPlacement {
                kind: cluster.kind,
                requested: cluster.count,
                placed,
            });
        }
        report
    }

    fn place_global_clusters<R: Rng + ?Sized>(
        &mut self,
        cluster: &GlobalClusterSpec,
        attempts: usize,
        clear_radius: i32,
        rng: &mut R,
    ) -> usize {
        if self.width == 0 || self.height == 0 {
            return 0;
        }
        let mut placed = 0;
        for _ in 0..attempts {
            if placed >= cluster.count {
                break;
            }
            let seed = TilePos::new(
                rng.gen_range(0..self.width as i32),
                rng.gen_range(0..self.height as i32),
            );
            if self.is_area_clear(seed, clear_radius) {
                self.fill_cluster(seed, cluster.kind.tile_kind(), cluster.size, rng);
                placed += 1;
            }
        }
        placed
    }

    /// Turns up to `count` random eligible cells into lone trees.
    pub fn place_single_trees<R: Rng + ?Sized>(&mut self, count: usize, rng: &mut R) -> usize {
        if self.width == 0 || self.height == 0 {
            return 0;
        }
        let mut planted = 0;
        for _ in 0..count {
            let pos = TilePos::new(
                rng.gen_range(0..self.width as i32),
                rng.gen_range(0..self.height as i32),
            );
            if self.is_cluster_eligible(pos) {
                self.set_kind(pos, TileKind::Forest);
                planted += 1;
            }
        }
        planted
    }

    /// Walkable cells around `target`, nearest to `reference` first. Ties keep
    /// `neighbors8` order.
    pub fn open_sides(&self, target: TilePos, reference: TilePos) -> Vec<TilePos> {
        let mut sides: Vec<TilePos> = target
            .neighbors8()
            .into_iter()
            .filter(|candidate| self.is_walkable(*candidate))
            .collect();
        sides.sort_by(|a, b| a.euclidean(reference).total_cmp(&b.euclidean(reference)));
        sides
    }

    /// The walkable cell around `target` nearest to `reference`, so a unit
    /// stands beside a resource rather than on it.
    pub fn neighbor_of(&self, target: TilePos, reference: TilePos) -> Option<TilePos> {
        self.open_sides(target, reference).into_iter().next()
    }

    /// Closest `kind` cell to `from` that still has an open side. Ties go to
    /// the first cell in row-major order.
    pub fn nearest_of_kind(&self, from: TilePos, kind: TileKind) -> Option<TilePos> {
        let mut best: Option<(TilePos, f32)> = None;
        for tile in self.tiles.iter().filter(|tile| tile.kind == kind) {
            let pos = TilePos::new(tile.x, tile.y);
            let distance = pos.euclidean(from);
            if best.is_some_and(|(_, best_distance)| best_distance <= distance) {
                continue;
            }
            if pos.neighbors8().into_iter().any(|side| self.is_walkable(side)) {
                best = Some((pos, distance));
            }
        }
        best.map(|(pos, _)| pos)
    }
}
