//! CLI smoke tests: verify basic binary behavior.

use std::io::Write;
use std::process::{Command, Stdio};

fn cli_bin() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_focustuin"));
    cmd.arg("--config")
        .arg("/tmp/nonexistent_focustuin_config_12345.toml")
        .env_remove("FOCUSTUIN_PRESET")
        .env_remove("FOCUSTUIN_LIVES")
        .env_remove("FOCUSTUIN_CALIBRATION_CACHE")
        .env("RUST_LOG", "warn");
    cmd
}

/// Center of the default 1920x1080 viewport, `dx` px to the right.
fn gaze_lines(dx: f64, count: usize, delay_ms: u64) -> String {
    (0..count)
        .map(|_| {
            format!(
                "{{\"x\": {}, \"y\": 540, \"delay_ms\": {}}}\n",
                960.0 + dx,
                delay_ms
            )
        })
        .collect()
}

#[test]
fn test_help_flag() {
    let output = cli_bin().arg("--help").output().expect("failed to run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("Usage"),
        "Expected usage info in --help output"
    );
    assert!(stdout.contains("--script"));
}

#[test]
fn test_version_flag() {
    let output = cli_bin().arg("--version").output().expect("failed to run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("focustuin"),
        "Expected crate name in --version output"
    );
}

#[test]
fn test_unknown_preset_fails() {
    let output = cli_bin()
        .args(["--preset", "gentle", "--duration", "1"])
        .output()
        .expect("failed to run");
    assert!(!output.status.success());
}

#[test]
fn test_scripted_focus_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("focus.jsonl");
    std::fs::write(&path, gaze_lines(0.0, 12, 50)).unwrap();

    let output = cli_bin()
        .arg("--script")
        .arg(&path)
        .args(["--seed", "1", "--duration", "10"])
        .output()
        .expect("failed to run");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"event\":\"focus_entered\""), "{}", stdout);
    assert!(stdout.contains("\"event\":\"session_stopped\""));
    // Position updates only with --positions
    assert!(!stdout.contains("position_updated"));
}

#[test]
fn test_stdin_script_until_death() {
    let mut script = gaze_lines(0.0, 10, 50);
    script.push_str("not a gaze sample\n");
    script.push_str(&gaze_lines(300.0, 10, 50));
    script.push_str(&gaze_lines(0.0, 10, 50));

    let mut child = cli_bin()
        .args(["--script", "-", "--lives", "1", "--seed", "2", "--duration", "10"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to run");
    child
        .stdin
        .take()
        .unwrap()
        .write_all(script.as_bytes())
        .unwrap();
    let output = child.wait_with_output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let events: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    let names: Vec<&str> = events
        .iter()
        .filter_map(|e| e["event"].as_str())
        .collect();
    assert_eq!(names.iter().filter(|n| **n == "focus_entered").count(), 1);
    assert!(names.contains(&"life_lost"));
    assert!(names.contains(&"user_dead"));
    assert_eq!(names.last(), Some(&"session_stopped"));
}

#[test]
fn test_calibrate_writes_cache() {
    let dir = tempfile::tempdir().unwrap();
    let cache = dir.path().join("calibration.json");
    let script = dir.path().join("empty.jsonl");
    std::fs::write(&script, "").unwrap();

    let output = cli_bin()
        .env("FOCUSTUIN_CALIBRATION_CACHE", &cache)
        .args(["--calibrate", "5", "-5", "--calibration-accuracy", "12.5"])
        .arg("--script")
        .arg(&script)
        .args(["--duration", "1"])
        .output()
        .expect("failed to run");
    assert!(output.status.success());

    let stored: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&cache).unwrap()).unwrap();
    assert_eq!(stored["offset_x"], 5.0);
    assert_eq!(stored["offset_y"], -5.0);
    assert_eq!(stored["accuracy_px"], 12.5);
    assert_eq!(stored["screen_width"], 1920.0);
}

#[test]
fn test_calibrate_without_cache_path_fails() {
    let output = cli_bin()
        .args(["--calibrate", "5", "5", "--duration", "1"])
        .output()
        .expect("failed to run");
    assert!(!output.status.success());
}
