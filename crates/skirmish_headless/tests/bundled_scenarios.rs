//! The scenarios shipped with the runner load, validate and play out.

use std::path::PathBuf;

use skirmish_headless::{verify_determinism, RunOptions, Scenario, ScenarioRunner};

fn bundled(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios").join(name)
}

#[test]
fn test_duel_validates() {
    let scenario = Scenario::load(bundled("duel.ron")).unwrap();
    assert_eq!(scenario.validate(), Vec::<String>::new());
    assert!(scenario.unit_catalog().contains("archer"));
    assert!(scenario.nav_grid.is_some());
}

#[test]
fn test_duel_runs_to_a_result() {
    let scenario = Scenario::load(bundled("duel.ron")).unwrap();
    let mut runner = ScenarioRunner::new(&scenario).unwrap();
    let mut output = Vec::new();

    let summary = runner
        .run(RunOptions { max_ticks: 3000, until_idle: true }, &mut output)
        .unwrap();

    assert!(summary.idle, "still busy after {} ticks", summary.ticks);
    assert!(summary.events > 0);
    // Three fighters against two: red keeps someone standing.
    assert!(summary.alive.get(&0).copied().unwrap_or(0) >= 1);

    let text = String::from_utf8(output).unwrap();
    assert!(text.contains(r#""type":"projectile_spawned""#));
    assert!(text.contains(r#""type":"interacted""#));
    assert!(text.lines().last().unwrap().starts_with(r#"{"summary":"#));
}

#[test]
fn test_duel_is_deterministic() {
    let scenario = Scenario::load(bundled("duel.ron")).unwrap();
    let options = RunOptions { max_ticks: 400, until_idle: false };
    assert!(verify_determinism(&scenario, 3, options).unwrap());
}

#[test]
fn test_scenario_written_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tiny.ron");
    std::fs::write(
        &path,
        r#"Scenario(
            name: "tiny",
            config: (settle_ticks: 1),
            units: [UnitDefinition(id: "dummy", name: "Dummy", max_health: 10.0)],
            placements: [
                UnitPlacement(unit: "dummy", label: "d", faction: 3, position: (x: 1.0, y: 0.0, z: 1.0)),
            ],
            commands: [
                ScheduledCommand(tick: 2, unit: "d", command: Move((x: 2.0, y: 0.0, z: 1.0))),
                ScheduledCommand(tick: 40, unit: "d", command: Stop),
            ],
        )"#,
    )
    .unwrap();

    let scenario = Scenario::load(&path).unwrap();
    assert_eq!(scenario.config.settle_ticks, 1);

    let mut runner = ScenarioRunner::new(&scenario).unwrap();
    let summary = runner
        .run(RunOptions { max_ticks: 100, until_idle: true }, &mut std::io::sink())
        .unwrap();
    assert_eq!(summary.ticks, 41);
    assert_eq!(summary.alive.get(&3), Some(&1));
    // Move, then stop.
    assert_eq!(summary.events, 2);
}
