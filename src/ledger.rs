//! Stockpile totals credited by villagers returning to the drop-off.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::map::TileKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Food,
    Stone,
    Gold,
    #[serde(alias = "forest")]
    Wood,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Food,
        ResourceKind::Stone,
        ResourceKind::Gold,
        ResourceKind::Wood,
    ];

    /// Terrain that yields this resource.
    pub fn tile_kind(self) -> TileKind {
        match self {
            ResourceKind::Food => TileKind::Food,
            ResourceKind::Stone => TileKind::Stone,
            ResourceKind::Gold => TileKind::Gold,
            ResourceKind::Wood => TileKind::Forest,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Food => "food",
            ResourceKind::Stone => "stone",
            ResourceKind::Gold => "gold",
            ResourceKind::Wood => "wood",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTotals {
    #[serde(default)]
    pub food: u64,
    #[serde(default)]
    pub stone: u64,
    #[serde(default)]
    pub gold: u64,
    #[serde(default)]
    pub wood: u64,
}

impl ResourceTotals {
    pub fn get(&self, kind: ResourceKind) -> u64 {
        match kind {
            ResourceKind::Food => self.food,
            ResourceKind::Stone => self.stone,
            ResourceKind::Gold => self.gold,
            ResourceKind::Wood => self.wood,
        }
    }

    fn slot_mut(&mut self, kind: ResourceKind) -> &mut u64 {
        match kind {
            ResourceKind::Food => &mut self.food,
            ResourceKind::Stone => &mut self.stone,
            ResourceKind::Gold => &mut self.gold,
            ResourceKind::Wood => &mut self.wood,
        }
    }

    pub fn total(&self) -> u64 {
        self.food + self.stone + self.gold + self.wood
    }
}

pub type LedgerObserver = Box<dyn FnMut(&ResourceTotals) + Send>;

/// Running totals per resource. Deposits are the only mutation; every
/// deposit notifies all observers with the full totals.
pub struct ResourceLedger {
    totals: ResourceTotals,
    observers: Vec<LedgerObserver>,
}

impl ResourceLedger {
    pub fn new(starting: ResourceTotals) -> Self {
        Self {
            totals: starting,
            observers: Vec::new(),
        }
    }

    pub fn totals(&self) -> ResourceTotals {
        self.totals
    }

    pub fn get(&self, kind: ResourceKind) -> u64 {
        self.totals.get(kind)
    }

    pub fn subscribe(&mut self, observer: impl FnMut(&ResourceTotals) + Send + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn deposit(&mut self, kind: ResourceKind, amount: u32) {
        let slot = self.totals.slot_mut(kind);
        *slot = slot.saturating_add(u64::from(amount));
        debug!(kind = kind.as_str(), amount, total = *slot, "deposit");
        let snapshot = self.totals;
        for observer in &mut self.observers {
            observer(&snapshot);
        }
    }

    /// Deposits harvest from a tile kind. Non-resource tiles are ignored.
    pub fn deposit_tile(&mut self, kind: TileKind, amount: u32) -> bool {
        match kind.resource_kind() {
            Some(resource) => {
                self.deposit(resource, amount);
                true
            }
            None => false,
        }
    }
}

impl Default for ResourceLedger {
    fn default() -> Self {
        Self::new(ResourceTotals::default())
    }
}

impl fmt::Debug for ResourceLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceLedger")
            .field("totals", &self.totals)
            .field("observers", &self.observers.len())
            .finish()
    }
}
