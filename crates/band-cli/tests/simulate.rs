use assert_cmd::Command;
use band_sim::read_manifest;
use serde_json::Value;
use std::fs;
use tempfile::tempdir;

const SPEC: &str = r#"
name = "demo-ward"
seed = 7

[[patients]]
name = "John Doe"
age = 45
triage = "green"
bpm = 72.0

[[patients]]
name = "Jane Smith"
age = 52
triage = "red"
bpm = 110.0
temp_c = 38.2
"#;

#[test]
fn simulate_writes_cohort_bundle() {
    let temp = tempdir().unwrap();
    let spec_path = temp.path().join("cohort.toml");
    let out = temp.path().join("ward");
    fs::write(&spec_path, SPEC).unwrap();

    Command::cargo_bin("band")
        .unwrap()
        .args([
            "simulate",
            "--spec",
            spec_path.to_str().unwrap(),
            "--out",
            out.to_str().unwrap(),
            "--duration",
            "10",
            "--fs",
            "50",
        ])
        .assert()
        .success();

    let manifest = read_manifest(&out.join("cohort.json")).unwrap();
    assert_eq!(manifest.name, "demo-ward");
    assert_eq!(manifest.patients.len(), 2);
    assert!(out.join("john-doe.csv").exists());
    assert!(out.join("jane-smith.csv").exists());
}

#[test]
fn simulated_patient_analyzes_back_to_its_rate() {
    let temp = tempdir().unwrap();
    let spec_path = temp.path().join("cohort.toml");
    let out = temp.path().join("ward");
    fs::write(&spec_path, SPEC).unwrap();

    Command::cargo_bin("band")
        .unwrap()
        .args([
            "simulate",
            "--spec",
            spec_path.to_str().unwrap(),
            "--out",
            out.to_str().unwrap(),
            "--duration",
            "20",
            "--fs",
            "50",
        ])
        .assert()
        .success();

    let output = Command::cargo_bin("band")
        .unwrap()
        .args([
            "analyze",
            "--input",
            out.join("john-doe.csv").to_str().unwrap(),
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["status"], "ready");
    let bpm = json["bpm"].as_f64().unwrap();
    assert!((bpm - 72.0).abs() < 8.0, "expected ~72 BPM, got {bpm}");
    let temp_c = json["mean_temp_c"].as_f64().unwrap();
    assert!((temp_c - 36.6).abs() < 0.5, "unexpected mean temp {temp_c}");
}
