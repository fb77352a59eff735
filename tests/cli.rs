//! Binary invocation tests
//!
//! Exercise argument handling, exit codes and stdout formats without any
//! network access.

use std::process::{Command, Output};

fn todoscan(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_todoscan"))
        .args(args)
        .env("NO_COLOR", "1")
        .output()
        .expect("failed to run todoscan")
}

#[test]
fn test_help_lists_options() {
    let output = todoscan(&["--help"]);
    assert!(output.status.success());

    let help = String::from_utf8_lossy(&output.stdout);
    for option in ["--repos-dir", "--no-pull", "--format", "--list", "--config-file"] {
        assert!(help.contains(option), "missing {} in help", option);
    }
}

#[test]
fn test_missing_repository_is_usage_error() {
    let output = todoscan(&[]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_missing_config_file_exits_with_two() {
    let dir = tempfile::TempDir::new().unwrap();
    let missing = dir.path().join("absent.toml");
    let output = todoscan(&["--config-file", missing.to_str().unwrap(), "project"]);

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("absent.toml"));
}

#[test]
fn test_list_empty_store() {
    let dir = tempfile::TempDir::new().unwrap();
    let output = todoscan(&[
        "--repos-dir",
        dir.path().to_str().unwrap(),
        "--list",
        "--format",
        "text",
        "--no-color",
    ]);

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("No local repositories."));
}

#[test]
fn test_unknown_name_emits_single_error_line() {
    let dir = tempfile::TempDir::new().unwrap();
    let output = todoscan(&[
        "--repos-dir",
        dir.path().to_str().unwrap(),
        "--log-level",
        "off",
        "never-cloned",
    ]);

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines = stdout.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 1);

    let event: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(event["type"], "error");
    assert_eq!(event["code"], "NotFound");
}
