//! Grid A* over the walkable tiles of a [`GridMap`].
//!
//! Movement is 8-directional and every step costs 1, diagonals included, so
//! path lengths are Chebyshev rather than Euclidean. The heuristic is the
//! Manhattan distance. Entries with equal `f` leave the open set in the order
//! they were pushed.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet};

use tracing::debug;

use crate::map::{GridMap, TilePos};

#[derive(Debug, Clone, Copy, Default)]
pub struct PathFinder {
    max_expansions: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenEntry {
    f: i32,
    seq: u64,
    g: i32,
    pos: TilePos,
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.f.cmp(&other.f).then(self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PathFinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps the number of cells a single search may close. `None` searches
    /// until the open set is empty.
    pub fn with_expansion_limit(mut self, limit: Option<usize>) -> Self {
        self.max_expansions = limit;
        self
    }

    pub fn max_expansions(&self) -> Option<usize> {
        self.max_expansions
    }

    /// Cells from `start` (exclusive) to `goal` (inclusive). Empty when the
    /// goal equals the start or cannot be reached.
    pub fn find_path(&self, start: TilePos, goal: TilePos, grid: &GridMap) -> Vec<TilePos> {
        if start == goal || !grid.is_walkable(goal) {
            return Vec::new();
        }

        let mut open = BinaryHeap::new();
        let mut best_g: HashMap<TilePos, i32> = HashMap::new();
        let mut came_from: HashMap<TilePos, TilePos> = HashMap::new();
        let mut closed: HashSet<TilePos> = HashSet::new();
        let mut seq = 0_u64;

        open.push(Reverse(OpenEntry {
            f: start.manhattan(goal),
            seq,
            g: 0,
            pos: start,
        }));
        best_g.insert(start, 0);

        while let Some(Reverse(entry)) = open.pop() {
            if !closed.insert(entry.pos) {
                continue;
            }
            if entry.pos == goal {
                return reconstruct(&came_from, start, goal);
            }
            if let Some(limit) = self.max_expansions {
                if closed.len() > limit {
                    debug!(
                        from_x = start.x,
                        from_y = start.y,
                        to_x = goal.x,
                        to_y = goal.y,
                        limit,
                        "path search hit expansion limit"
                    );
                    return Vec::new();
                }
            }

            let next_g = entry.g + 1;
            for neighbor in entry.pos.neighbors8() {
                if closed.contains(&neighbor) || !grid.is_walkable(neighbor) {
                    continue;
                }
                if best_g.get(&neighbor).is_some_and(|&known| known <= next_g) {
                    continue;
                }
                best_g.insert(neighbor, next_g);
                came_from.insert(neighbor, entry.pos);
                seq += 1;
                open.push(Reverse(OpenEntry {
                    f: next_g + neighbor.manhattan(goal),
                    seq,
                    g: next_g,
                    pos: neighbor,
                }));
            }
        }

        debug!(
            from_x = start.x,
            from_y = start.y,
            to_x = goal.x,
            to_y = goal.y,
            "no route"
        );
        Vec::new()
    }
}

fn reconstruct(
    came_from: &HashMap<TilePos, TilePos>,
    start: TilePos,
    goal: TilePos,
) -> Vec<TilePos> {
    let mut path = vec![goal];
    let mut current = goal;
    while let Some(&previous) = came_from.get(&current) {
        if previous == start {
            break;
        }
        path.push(previous);
        current = previous;
    }
    path.reverse();
    path
}
