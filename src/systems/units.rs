use anyhow::Result;
use tracing::trace;

use crate::{
    engine::{System, SystemContext},
    unit::UnitEventKind,
    world::World,
};

/// Moves, harvests and delivers for every villager.
pub struct UnitSystem;

impl UnitSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for UnitSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl System for UnitSystem {
    fn name(&self) -> &str {
        "units"
    }

    fn run(&mut self, ctx: &SystemContext, world: &mut World) -> Result<()> {
        world.update_units(ctx.dt_ms);
        let deposits = world
            .events()
            .iter()
            .filter(|event| matches!(event.kind, UnitEventKind::Deposited { .. }))
            .count();
        if deposits > 0 {
            trace!(tick = ctx.tick, deposits, "deliveries this tick");
        }
        Ok(())
    }
}
