use assert_cmd::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[cover]
name = "Test shutter"
supports_stop = false

[calibration]
time_to_open = 0.4
time_to_close = 0.3
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn json_line(stdout: &[u8], key: &str) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(stdout);
    let line = stdout
        .lines()
        .find(|l| l.contains(&format!("\"{key}\"")))
        .unwrap_or_else(|| panic!("no JSON line with {key} found; stdout was: {stdout}"));
    serde_json::from_str(line).expect("valid JSON")
}

/// Validate the JSON line for a completed movement.
#[rstest]
#[case("open", &[], 100, "opening")]
#[case("move", &["--position", "25"], 25, "opening")]
fn json_motion_schema(
    #[case] command: &str,
    #[case] extra: &[&str],
    #[case] position: u64,
    #[case] direction: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("shutter_cli").unwrap();
    cmd.arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(&cfg)
        .arg(command)
        .args(extra);

    let out = cmd.assert().success().get_output().stdout.clone();
    let v = json_line(&out, "position");

    assert_eq!(v["command"], command);
    assert_eq!(v["position"].as_u64(), Some(position));
    assert_eq!(v["direction"], direction);
    assert!(v["elapsed_ms"].as_u64().is_some());
    assert_eq!(v["settled"], true);
    assert_eq!(v["interrupted"], false);
}

/// Nothing to do: direction is null.
#[rstest]
fn json_noop_has_null_direction() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let out = Command::cargo_bin("shutter_cli")
        .unwrap()
        .args(["--json", "--log-level", "error", "--config"])
        .arg(&cfg)
        .arg("close")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v = json_line(&out, "position");
    assert_eq!(v["position"].as_u64(), Some(0));
    assert!(v["direction"].is_null());
}

/// Errors in JSON mode carry a stable reason and a message.
#[rstest]
fn json_error_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let assert = Command::cargo_bin("shutter_cli")
        .unwrap()
        .args(["--json", "--log-level", "error", "--config"])
        .arg(&cfg)
        .args(["move", "--position", "101"])
        .assert()
        .code(3);
    let err = String::from_utf8_lossy(&assert.get_output().stderr).to_string();
    let line = err
        .lines()
        .find(|l| l.contains("\"reason\""))
        .unwrap_or_else(|| panic!("no JSON error line; stderr was: {err}"));
    let v: serde_json::Value = serde_json::from_str(line).expect("valid JSON");
    assert_eq!(v["reason"], "InvalidTarget");
    assert!(v["message"].as_str().unwrap().contains("101"));
}

#[rstest]
fn json_status_without_state_file() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let out = Command::cargo_bin("shutter_cli")
        .unwrap()
        .args(["--json", "--config"])
        .arg(&cfg)
        .arg("status")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v = json_line(&out, "name");
    assert_eq!(v["name"], "Test shutter");
    assert!(v["position"].is_null());
}
