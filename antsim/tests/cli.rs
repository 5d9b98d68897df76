// The cargo_bin! macro requires build script setup that's overkill for simple tests.
#![allow(deprecated)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command as AssertCommand;
use predicates::prelude::*;
use std::path::PathBuf;
use std::process::Command;

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/skirmish.json")
}

#[test]
fn test_help_flag() {
    let mut cmd = Command::new(cargo_bin("antsim"));
    let output = cmd.arg("--help").output().expect("failed to execute");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"));
    assert!(stdout.contains("--scenario"));
    assert!(stdout.contains("--frame-ticks"));
}

#[test]
fn test_missing_scenario_fails() {
    let output = Command::new(cargo_bin("antsim"))
        .arg("--scenario")
        .arg("/nonexistent/skirmish.json")
        .output()
        .expect("failed to execute process");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("nonexistent"),
        "error should name the missing file. Stderr: {}",
        stderr
    );
}

#[test]
fn test_short_run_reports_final_tick() {
    AssertCommand::cargo_bin("antsim")
        .unwrap()
        .arg("--scenario")
        .arg(fixture())
        .arg("--ticks")
        .arg("10")
        .arg("--log-level")
        .arg("warn")
        .assert()
        .success()
        .stdout(predicate::str::contains("Finished at tick 10"))
        .stdout(predicate::str::contains("red:"))
        .stdout(predicate::str::contains("blue:"));
}

#[test]
fn test_runs_are_reproducible() {
    let run = |frame_ticks: Option<&str>| {
        let mut cmd = Command::new(cargo_bin("antsim"));
        cmd.arg("--scenario")
            .arg(fixture())
            .arg("--ticks")
            .arg("240")
            .arg("--log-level")
            .arg("error");
        if let Some(n) = frame_ticks {
            cmd.arg("--frame-ticks").arg(n);
        }
        let output = cmd.output().expect("failed to execute");
        assert!(output.status.success());
        String::from_utf8_lossy(&output.stdout).into_owned()
    };

    let first = run(None);
    assert_eq!(first, run(None));
    // frames within the catch-up cap change nothing
    assert_eq!(first, run(Some("4")));
}

#[test]
fn test_events_written_as_json_lines() {
    let dir = std::env::temp_dir().join(format!("antsim-cli-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let events = dir.join("events.jsonl");

    AssertCommand::cargo_bin("antsim")
        .unwrap()
        .arg("--scenario")
        .arg(fixture())
        .arg("--ticks")
        .arg("120")
        .arg("--events")
        .arg(&events)
        .assert()
        .success();

    let text = std::fs::read_to_string(&events).unwrap();
    for line in text.lines() {
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        assert!(value.get("type").is_some(), "untagged event: {}", line);
        assert!(value.get("tick").is_some(), "event without tick: {}", line);
    }
    std::fs::remove_dir_all(&dir).ok();
}
