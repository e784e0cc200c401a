use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use homestead::{
    engine::{EngineBuilder, EngineSettings},
    logging,
    scenario::ScenarioLoader,
    web::{self, WebServerConfig},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Homestead villager simulation runner")]
struct Cli {
    /// Path to the scenario YAML file
    #[arg(long, default_value = "scenarios/homestead.yaml")]
    scenario: PathBuf,

    /// Override tick count (uses scenario default when omitted; with --serve,
    /// omitting it keeps the world running until shutdown)
    #[arg(long)]
    ticks: Option<u64>,

    /// Override snapshot interval in ticks
    #[arg(long)]
    snapshot_interval: Option<u64>,

    /// Directory for snapshots
    #[arg(long)]
    snapshot_dir: Option<PathBuf>,

    /// Serve the browser viewer instead of running headless
    #[arg(long)]
    serve: bool,

    /// Host to bind when serving
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to bind when serving
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let loader = ScenarioLoader::new(".");
    let scenario = loader.load(&cli.scenario)?;
    logging::init(&scenario.logging);

    let snapshot_interval = cli
        .snapshot_interval
        .unwrap_or(scenario.snapshot_interval_ticks);
    let snapshot_dir = cli
        .snapshot_dir
        .unwrap_or_else(|| PathBuf::from("snapshots"));

    if cli.serve {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to start tokio runtime")?;
        return runtime.block_on(web::run(WebServerConfig {
            scenario,
            ticks: cli.ticks,
            snapshot_interval,
            snapshot_dir,
            host: cli.host,
            port: cli.port,
        }));
    }

    let mut world = scenario
        .build_world()
        .with_context(|| format!("failed to build world for '{}'", scenario.name))?;
    let settings = EngineSettings {
        scenario_name: scenario.name.clone(),
        snapshot_interval_ticks: snapshot_interval,
        snapshot_dir,
    };
    let mut engine = EngineBuilder::new(settings).with_default_systems().build();

    let ticks = scenario.ticks(cli.ticks);
    engine.run(&mut world, ticks)?;
    let totals = world.ledger().totals();
    info!(
        scenario = %scenario.name,
        ticks,
        food = totals.food,
        wood = totals.wood,
        stone = totals.stone,
        gold = totals.gold,
        "run complete"
    );
    println!(
        "Scenario '{}' completed for {} ticks. Stockpile: food {}, wood {}, stone {}, gold {}",
        scenario.name, ticks, totals.food, totals.wood, totals.stone, totals.gold
    );
    Ok(())
}
