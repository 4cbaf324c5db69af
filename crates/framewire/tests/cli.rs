#![cfg(feature = "cli")]

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};

fn framewire() -> Command {
    Command::cargo_bin("framewire").unwrap()
}

/// 3 x 2 grid of dark discs, 30 px apart.
fn write_grid_png(path: &std::path::Path) {
    let img = image::GrayImage::from_fn(140, 110, |x, y| {
        let near = (0..2).any(|r| {
            (0..3).any(|c| {
                let dx = x as f32 - (40.0 + 30.0 * c as f32);
                let dy = y as f32 - (40.0 + 30.0 * r as f32);
                dx * dx + dy * dy <= 49.0
            })
        });
        image::Luma([if near { 20 } else { 230 }])
    });
    img.save(path).unwrap();
}

#[test]
fn list_describes_builtin_components() {
    let out = framewire().arg("list").assert().success().get_output().stdout.clone();
    let listing: Value = serde_json::from_slice(&out).unwrap();
    let types: Vec<&str> = listing
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["type"].as_str().unwrap())
        .collect();
    assert_eq!(types, vec!["CvFindCirclesGrid", "ImageWriter", "TimeTrigger"]);

    let writer = &listing[1];
    assert!(writer["streams"]
        .as_array()
        .unwrap()
        .iter()
        .any(|s| s["name"] == "in_save_trigger"));
    assert!(writer["properties"]
        .as_array()
        .unwrap()
        .iter()
        .any(|p| p["name"] == "count" && p["constant"] == true));
}

#[test]
fn find_grid_writes_a_report() {
    let dir = tempfile::tempdir().unwrap();
    let png = dir.path().join("grid.png");
    let report = dir.path().join("report.json");
    write_grid_png(&png);

    framewire()
        .args(["find-grid", png.to_str().unwrap(), "--width", "3", "--height", "2"])
        .arg("--output")
        .arg(&report)
        .assert()
        .success();

    let report: Value = serde_json::from_str(&fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(report["image_width"], 140);
    assert!(report["error"].is_null());
    let points = report["detection"]["board"]["image_points"].as_array().unwrap();
    assert_eq!(points.len(), 6);
}

#[test]
fn find_grid_reports_failures_in_json() {
    let dir = tempfile::tempdir().unwrap();
    let png = dir.path().join("grid.png");
    write_grid_png(&png);

    framewire()
        .args(["find-grid", png.to_str().unwrap(), "--width", "4", "--height", "4"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"detection\": null"))
        .stdout(predicate::str::contains("need 16"));
}

#[test]
fn run_executes_a_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = dir.path().join("pipeline.json");
    let pipeline = json!({
        "components": [
            { "name": "tick", "type": "TimeTrigger", "properties": { "time": 0 } },
            { "name": "writer", "type": "ImageWriter",
              "properties": { "directory": dir.path().to_str().unwrap() } }
        ],
        "connections": [ { "from": "tick.out_trigger", "to": "writer.in_save_trigger" } ]
    });
    fs::write(&cfg, serde_json::to_string_pretty(&pipeline).unwrap()).unwrap();

    framewire()
        .args(["--log-level", "debug", "run"])
        .arg(&cfg)
        .args(["--steps", "3", "--interval-ms", "1"])
        .assert()
        .success()
        .stderr(predicate::str::contains("3 steps"));
}

#[test]
fn invalid_log_level_is_a_usage_error() {
    framewire()
        .args(["--log-level", "loud", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("`loud` is not one of"));
}

#[test]
fn log_level_reaches_the_logger() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = dir.path().join("pipeline.json");
    fs::write(&cfg, r#"{ "components": [], "connections": [] }"#).unwrap();

    framewire()
        .args(["--log-level", "warn", "run"])
        .arg(&cfg)
        .assert()
        .success()
        .stderr(predicate::str::contains("steps").not());
}

#[test]
fn run_rejects_unknown_component_types() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = dir.path().join("pipeline.json");
    fs::write(
        &cfg,
        r#"{ "components": [ { "name": "cam", "type": "Camera" } ], "connections": [] }"#,
    )
    .unwrap();

    framewire()
        .arg("run")
        .arg(&cfg)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Camera"));
}
