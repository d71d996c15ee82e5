use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::tempdir;

// A device that refuses every command must surface as a typed failure with
// its own exit code, and must not corrupt the saved position.
#[test]
fn rejected_command_bubbles_up() {
    let dir = tempdir().unwrap();
    let state = dir.path().join("state.json");
    let cfg_path = dir.path().join("cfg.toml");
    fs::write(
        &cfg_path,
        format!(
            "[calibration]\ntime_to_open = 0.4\ntime_to_close = 0.4\n\n[state]\npath = '{}'\n",
            state.display()
        ),
    )
    .unwrap();
    fs::write(&state, r#"{"position":40,"updated_unix_ms":1}"#).unwrap();

    let mut cmd = Command::cargo_bin("shutter_cli").unwrap();
    cmd.arg("--config")
        .arg(&cfg_path)
        .arg("open")
        .env("SHUTTER_TEST_SIM_FAIL", "1");

    cmd.assert()
        .code(5)
        .stderr(predicate::str::contains("did not accept a command"));

    let saved: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&state).unwrap()).unwrap();
    assert_eq!(saved["position"], 40);
}
