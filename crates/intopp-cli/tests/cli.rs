//! CLI pipeline integration tests. Each test works against its own database
//! in a temp directory.

use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const TOY_DATASET: &str = r#"{
    "points": [
        {"id": 1, "values": {"origins": 100, "destinations": 600}},
        {"id": 2, "values": {"origins": 50, "destinations": 400}}
    ],
    "distances": [
        {"start": 1, "end": 1, "distance": 0},
        {"start": 1, "end": 2, "distance": 10},
        {"start": 2, "end": 1, "distance": 10},
        {"start": 2, "end": 2, "distance": 0}
    ]
}"#;

fn intopp(dir: &TempDir) -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("intopp").unwrap();
    cmd.arg("--db").arg(dir.path().join("model.sqlite"));
    cmd
}

fn write_dataset(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("dataset.json");
    std::fs::write(&path, TOY_DATASET).unwrap();
    path
}

fn load_toy(dir: &TempDir) -> PathBuf {
    let dataset = write_dataset(dir);
    intopp(dir).arg("load").arg(&dataset).assert().success();
    dataset
}

#[test]
fn stats_fresh_db() {
    let dir = TempDir::new().unwrap();
    intopp(&dir)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("points:     0"))
        .stdout(predicate::str::contains("max dist:   n/a"));
}

#[test]
fn load_then_stats() {
    let dir = TempDir::new().unwrap();
    load_toy(&dir);
    intopp(&dir)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("points:     2"))
        .stdout(predicate::str::contains("distances:  4"))
        .stdout(predicate::str::contains("max dist:   10"));
}

#[test]
fn export_round_trips_through_fresh_db() {
    let dir = TempDir::new().unwrap();
    load_toy(&dir);

    let exported = dir.path().join("exported.json");
    intopp(&dir)
        .arg("export")
        .arg(&exported)
        .assert()
        .success()
        .stdout(predicate::str::contains("exported 2 points"));

    let other = TempDir::new().unwrap();
    intopp(&other).arg("load").arg(&exported).assert().success();
    intopp(&other)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("points:     2"))
        .stdout(predicate::str::contains("distances:  4"))
        .stdout(predicate::str::contains("max dist:   10"));
}

#[test]
fn calibrate_reports_selectivity() {
    let dir = TempDir::new().unwrap();
    load_toy(&dir);
    // -ln(0.5) / 1000
    intopp(&dir)
        .args(["calibrate", "--efs", "0.5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0.000693147"));
}

#[test]
fn full_pipeline() {
    let dir = TempDir::new().unwrap();
    load_toy(&dir);

    intopp(&dir)
        .args(["rings", "uniform", "-n", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rings: 4 memberships"));
    intopp(&dir)
        .args(["calibrate", "--efs", "0.5"])
        .assert()
        .success();
    intopp(&dir).arg("totals").assert().success();
    intopp(&dir)
        .arg("exchange")
        .assert()
        .success()
        .stdout(predicate::str::contains("motion exchange complete"));
    intopp(&dir).arg("normalize").assert().success();
    intopp(&dir)
        .args(["shift", "general"])
        .assert()
        .success();

    intopp(&dir)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("exchanges:  4"));
}

#[test]
fn layout_rings_with_shared_sizes() {
    let dir = TempDir::new().unwrap();
    load_toy(&dir);
    intopp(&dir)
        .args(["rings", "layout", "--sizes", "1,1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rings: 4 memberships"));
}

#[test]
fn layout_rings_missing_layout_fails() {
    let dir = TempDir::new().unwrap();
    load_toy(&dir);
    intopp(&dir)
        .args(["rings", "layout"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("validation failed"));
}

#[test]
fn save_param_unknown_field_fails() {
    let dir = TempDir::new().unwrap();
    load_toy(&dir);
    intopp(&dir)
        .args(["save-param", "--parameter", "bogus", "--name", "x"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown model parameter"));
}

#[test]
fn save_and_save_param() {
    let dir = TempDir::new().unwrap();
    load_toy(&dir);
    intopp(&dir)
        .args(["calibrate", "--efs", "0.5"])
        .assert()
        .success();
    intopp(&dir)
        .args(["save", "--suffix", "_0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("suffix '_0'"));
    intopp(&dir)
        .args(["save-param", "--parameter", "selectivity", "--name", "sel_0"])
        .assert()
        .success();
}

#[test]
fn config_file_overrides_field_names() {
    let dir = TempDir::new().unwrap();
    let dataset = dir.path().join("dataset.json");
    std::fs::write(
        &dataset,
        r#"{
            "points": [{"id": 1, "values": {"pop": 100, "jobs": 500}}],
            "distances": [{"start": 1, "end": 1, "distance": 0}]
        }"#,
    )
    .unwrap();
    let config = dir.path().join("model.toml");
    std::fs::write(
        &config,
        "origins_name = \"pop\"\ndestinations_name = \"jobs\"\n",
    )
    .unwrap();

    intopp(&dir)
        .arg("--config")
        .arg(&config)
        .arg("load")
        .arg(&dataset)
        .assert()
        .success();

    // destinations total is 500, so -ln(0.5)/500
    intopp(&dir)
        .args(["calibrate", "--efs", "0.5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0.001386294"));
}
