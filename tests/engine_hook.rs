use homestead::{
    engine::{EngineBuilder, EngineSettings},
    scenario::ScenarioLoader,
};
use tempfile::tempdir;

#[test]
fn engine_runs_hook_each_tick() {
    let loader = ScenarioLoader::new(env!("CARGO_MANIFEST_DIR"));
    let scenario = loader
        .load("scenarios/clearing.yaml")
        .expect("scenario should load");
    let mut world = scenario.build_world().expect("world builds");
    let temp = tempdir().expect("tempdir");
    let settings = EngineSettings {
        scenario_name: scenario.name.clone(),
        snapshot_interval_ticks: 0,
        snapshot_dir: temp.path().to_path_buf(),
    };
    let mut engine = EngineBuilder::new(settings).with_default_systems().build();

    let mut ticks = Vec::new();
    engine
        .run_with_hook(&mut world, 6, |snapshot| ticks.push(snapshot.tick))
        .expect("run succeeds");

    assert_eq!(ticks, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(world.elapsed_ms(), 600.0);
}

#[test]
fn engine_emits_snapshots() {
    let loader = ScenarioLoader::new(env!("CARGO_MANIFEST_DIR"));
    let scenario = loader.load("scenarios/clearing.yaml").unwrap();
    let mut world = scenario.build_world().unwrap();
    let temp_dir = tempdir().unwrap();
    let snapshot_dir = temp_dir.path().join("snaps");
    let settings = EngineSettings {
        scenario_name: scenario.name.clone(),
        snapshot_interval_ticks: 10,
        snapshot_dir: snapshot_dir.clone(),
    };
    let mut engine = EngineBuilder::new(settings).with_default_systems().build();
    engine.run(&mut world, 30).unwrap();

    for tick in [10, 20, 30] {
        let expected = snapshot_dir
            .join("clearing")
            .join(format!("tick_{tick:06}.json"));
        assert!(
            expected.exists(),
            "expected snapshot {} to exist",
            expected.display()
        );
    }
    assert!(!snapshot_dir.join("clearing").join("tick_000005.json").exists());

    let last = std::fs::read_to_string(snapshot_dir.join("clearing").join("tick_000030.json"))
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&last).unwrap();
    assert_eq!(json["tick"], 30);
    assert_eq!(json["units"].as_array().unwrap().len(), 3);
    assert_eq!(json["resources"]["wood"], 200);
}
