use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::{
    snapshot::SnapshotWriter,
    world::{World, WorldSnapshot},
};

pub struct EngineSettings {
    pub scenario_name: String,
    pub snapshot_interval_ticks: u64,
    pub snapshot_dir: PathBuf,
}

pub struct EngineBuilder {
    settings: EngineSettings,
    systems: Vec<Box<dyn System>>,
}

impl EngineBuilder {
    pub fn new(settings: EngineSettings) -> Self {
        Self {
            settings,
            systems: Vec::new(),
        }
    }

    pub fn with_system(mut self, system: impl System + 'static) -> Self {
        self.systems.push(Box::new(system));
        self
    }

    pub fn push_system(&mut self, system: impl System + 'static) {
        self.systems.push(Box::new(system));
    }

    /// Orders first, then movement and harvesting.
    pub fn with_default_systems(self) -> Self {
        self.with_system(crate::systems::OrderSystem::new())
            .with_system(crate::systems::UnitSystem::new())
    }

    pub fn build(self) -> Engine {
        Engine {
            systems: self.systems,
            snapshot_writer: SnapshotWriter::new(
                &self.settings.snapshot_dir,
                self.settings.snapshot_interval_ticks,
            ),
            settings: self.settings,
        }
    }
}

pub struct Engine {
    systems: Vec<Box<dyn System>>,
    snapshot_writer: SnapshotWriter,
    settings: EngineSettings,
}

impl Engine {
    pub fn scenario_name(&self) -> &str {
        &self.settings.scenario_name
    }

    pub fn run(&mut self, world: &mut World, ticks: u64) -> Result<()> {
        self.run_with_hook(world, ticks, |_| {})
    }

    /// Runs `ticks` steps, handing the post-tick snapshot to `hook` each time.
    pub fn run_with_hook<F>(&mut self, world: &mut World, ticks: u64, mut hook: F) -> Result<()>
    where
        F: FnMut(WorldSnapshot),
    {
        info!(
            scenario = %self.settings.scenario_name,
            ticks,
            units = world.units().len(),
            "simulation started"
        );
        for _ in 0..ticks {
            self.step(world)?;
            hook(world.snapshot(&self.settings.scenario_name));
        }
        let totals = world.ledger().totals();
        info!(
            scenario = %self.settings.scenario_name,
            tick = world.tick(),
            food = totals.food,
            stone = totals.stone,
            gold = totals.gold,
            wood = totals.wood,
            "simulation finished"
        );
        Ok(())
    }

    /// Runs every system once, advances the clock and writes a snapshot when
    /// one is due. Returns the snapshot path, if any.
    pub fn step(&mut self, world: &mut World) -> Result<Option<PathBuf>> {
        let ctx = SystemContext {
            tick: world.tick(),
            dt_ms: world.dt_ms(),
            scenario_name: &self.settings.scenario_name,
        };
        for system in &mut self.systems {
            system
                .run(&ctx, world)
                .with_context(|| format!("system '{}' failed at tick {}", system.name(), ctx.tick))?;
        }
        world.advance_time();
        let written = self
            .snapshot_writer
            .maybe_write(world, &self.settings.scenario_name)?;
        if let Some(path) = &written {
            debug!(path = %path.display(), "snapshot written");
        }
        Ok(written)
    }
}

pub struct SystemContext<'a> {
    pub tick: u64,
    pub dt_ms: f32,
    pub scenario_name: &'a str,
}

pub trait System: Send {
    fn name(&self) -> &str;
    fn run(&mut self, ctx: &SystemContext, world: &mut World) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    };

    use super::*;
    use crate::map::GridMap;
    use crate::world::WorldSettings;

    struct TickCounter(Arc<AtomicU64>);

    impl System for TickCounter {
        fn name(&self) -> &str {
            "tick_counter"
        }

        fn run(&mut self, _ctx: &SystemContext, _world: &mut World) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn engine_steps_on_a_worker_thread() {
        let counter = Arc::new(AtomicU64::new(0));
        let mut engine = EngineBuilder::new(EngineSettings {
            scenario_name: "worker".into(),
            snapshot_interval_ticks: 0,
            snapshot_dir: PathBuf::from("snapshots_unused"),
        })
        .with_default_systems()
        .with_system(TickCounter(counter.clone()))
        .build();
        let mut world = World::new(GridMap::new(8, 8, 32.0), WorldSettings::default());

        let handle = std::thread::spawn(move || {
            engine.run(&mut world, 4).unwrap();
            world.tick()
        });
        assert_eq!(handle.join().unwrap(), 4);
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }
}
