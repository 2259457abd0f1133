//! Basic CLI E2E tests.
//!
//! Tests invoke the built binary with HOME pointed at a scratch directory
//! and verify outputs.

use std::process::Command;

use serde_json::Value;
use tempfile::TempDir;

/// Run a CLI command and return (exit code, stdout, stderr).
fn run_cli(home: &TempDir, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_focusroom"))
        .args(args)
        .env("HOME", home.path())
        .env_remove("FOCUSROOM_ENV")
        .env_remove("FOCUSROOM_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

/// Event lines printed before the final pretty-printed snapshot.
fn event_types(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter(|line| line.starts_with('{') && line.ends_with('}'))
        .filter_map(|line| serde_json::from_str::<Value>(line).ok())
        .filter_map(|event| event["type"].as_str().map(str::to_string))
        .collect()
}

fn final_snapshot(stdout: &str) -> Value {
    let start = stdout.rfind("\n{\n").map_or(0, |i| i + 1);
    serde_json::from_str(&stdout[start..]).expect("snapshot JSON")
}

#[test]
fn test_config_get_default() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(&home, &["config", "get", "modes.pomodoro.focus_minutes"]);
    assert_eq!(code, 0, "config get failed");
    assert_eq!(stdout.trim(), "25");
}

#[test]
fn test_config_set_then_get() {
    let home = TempDir::new().unwrap();
    let (code, _, _) = run_cli(&home, &["config", "set", "modes.custom.break_minutes", "3"]);
    assert_eq!(code, 0, "config set failed");

    let (code, stdout, _) = run_cli(&home, &["config", "get", "modes.custom.break_minutes"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "3");
    assert!(home.path().join(".config/focusroom/config.toml").exists());
}

#[test]
fn test_config_unknown_key_fails() {
    let home = TempDir::new().unwrap();
    let (code, _, stderr) = run_cli(&home, &["config", "get", "modes.nope"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("unknown key"));
}

#[test]
fn test_config_list_json() {
    let home = TempDir::new().unwrap();
    let (code, stdout, _) = run_cli(&home, &["config", "list"]);
    assert_eq!(code, 0);
    let parsed: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(parsed["modes"]["deep_work"]["focus_minutes"], 90);
    assert_eq!(parsed["modes"]["flow"]["break_minutes"], 0);
    assert!(parsed.get("clock").is_none());
}

#[test]
fn test_config_rejects_tick_interval() {
    let home = TempDir::new().unwrap();
    let (code, _, stderr) = run_cli(&home, &["config", "set", "clock.tick_interval_ms", "250"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("error:"));
}

#[test]
fn test_simulate_completes_short_session() {
    let home = TempDir::new().unwrap();
    let (code, stdout, stderr) = run_cli(
        &home,
        &[
            "session", "simulate", "--mode", "custom", "--focus-min", "1", "--break-min", "0",
        ],
    );
    assert_eq!(code, 0, "simulate failed: {stderr}");

    let types = event_types(&stdout);
    assert_eq!(types.first().map(String::as_str), Some("session_started"));
    assert!(types.iter().any(|t| t == "phase_completed"));
    assert!(types.iter().any(|t| t == "session_recorded"));
    assert_eq!(types.last().map(String::as_str), Some("session_reset"));
    assert!(!types.iter().any(|t| t == "ticked"));
    assert!(stderr.contains("recorded custom session: 1 min, completed=true"));

    let snapshot = final_snapshot(&stdout);
    assert_eq!(snapshot["state"], "idle");
    assert_eq!(snapshot["sessions_completed"], 1);
}

#[test]
fn test_simulate_cancel_midway() {
    let home = TempDir::new().unwrap();
    let (code, stdout, stderr) = run_cli(
        &home,
        &["session", "simulate", "--mode", "pomodoro", "--cancel-at", "90"],
    );
    assert_eq!(code, 0, "simulate failed: {stderr}");

    let types = event_types(&stdout);
    assert!(types.iter().any(|t| t == "session_canceled"));
    assert!(!types.iter().any(|t| t == "phase_completed"));
    assert!(stderr.contains("recorded pomodoro session: 1 min, completed=false"));

    let snapshot = final_snapshot(&stdout);
    assert_eq!(snapshot["state"], "canceled");
    assert_eq!(snapshot["sessions_completed"], 0);
}

#[test]
fn test_simulate_flow_finish_early() {
    let home = TempDir::new().unwrap();
    let (code, stdout, stderr) = run_cli(
        &home,
        &["session", "simulate", "--mode", "flow", "--finish-at", "125", "--no-blocking"],
    );
    assert_eq!(code, 0, "simulate failed: {stderr}");
    assert!(event_types(&stdout).iter().any(|t| t == "session_recorded"));
    assert!(stderr.contains("recorded flow session: 2 min, completed=true"));
}

#[test]
fn test_simulate_rejects_blank_task() {
    let home = TempDir::new().unwrap();
    let (code, _, _) = run_cli(&home, &["session", "simulate", "--task", "  "]);
    assert_ne!(code, 0);
}

#[test]
fn test_simulate_rejects_oversized_minutes() {
    let home = TempDir::new().unwrap();
    for flag in ["--focus-min", "--break-min"] {
        let (code, _, stderr) = run_cli(
            &home,
            &["session", "simulate", "--mode", "custom", flag, "307445734561825861"],
        );
        assert_eq!(code, 1, "{flag} should fail cleanly: {stderr}");
        assert!(stderr.contains("error:"), "{stderr}");
        assert!(stderr.contains("out of range"), "{stderr}");
        assert!(!stderr.contains("panicked"), "{stderr}");
    }
}

#[test]
fn test_simulate_rejects_pause_past_end_of_time() {
    let home = TempDir::new().unwrap();
    let (code, _, stderr) = run_cli(
        &home,
        &[
            "session",
            "simulate",
            "--pause-at",
            "18446744073709551615",
            "--pause-for",
            "1",
        ],
    );
    assert_eq!(code, 1, "{stderr}");
    assert!(stderr.contains("error:"), "{stderr}");
    assert!(!stderr.contains("panicked"), "{stderr}");
}
