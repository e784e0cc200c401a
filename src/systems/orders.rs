use anyhow::Result;
use tracing::trace;

use crate::{
    engine::{System, SystemContext},
    world::World,
};

/// Applies player commands queued since the previous tick.
pub struct OrderSystem;

impl OrderSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OrderSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for OrderSystem {
    fn name(&self) -> &str {
        "orders"
    }

    fn run(&mut self, ctx: &SystemContext, world: &mut World) -> Result<()> {
        let applied = world.apply_pending_commands();
        if applied > 0 {
            trace!(tick = ctx.tick, applied, "commands applied");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::WorldPoint;
    use crate::map::{GridMap, TilePos};
    use crate::world::{Command, WorldSettings};

    #[test]
    fn drains_the_queue() {
        let mut world = World::new(GridMap::new(8, 8, 32.0), WorldSettings::default());
        let id = world.spawn_unit(TilePos::new(1, 1)).unwrap();
        world.queue(Command::SelectAt(WorldPoint::new(48.0, 48.0)));
        let ctx = SystemContext {
            tick: 0,
            dt_ms: 50.0,
            scenario_name: "orders",
        };
        OrderSystem::new().run(&ctx, &mut world).unwrap();
        assert_eq!(world.pending_commands(), 0);
        assert!(world.selection().is_selected(id));
    }
}
