//! Smoke tests for the esa-guard CLI.
//!
//! These tests verify basic CLI functionality:
//! - `esa-guard --version` outputs version info
//! - `esa-guard --help` lists every command
//! - unknown commands and missing arguments fail

use assert_cmd::Command;
use predicates::prelude::*;

/// Get a Command for the esa-guard binary.
fn guard() -> Command {
    Command::new(env!("CARGO_BIN_EXE_esa-guard"))
}

#[test]
fn test_version_flag() {
    guard()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("esa-guard"))
        .stdout(predicate::str::contains("0.1.0"));
}

#[test]
fn test_help_flag() {
    guard()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("validate"))
        .stdout(predicate::str::contains("preview"))
        .stdout(predicate::str::contains("diff"))
        .stdout(predicate::str::contains("fetch"))
        .stdout(predicate::str::contains("execute"));
}

#[test]
fn test_no_args_fails() {
    guard()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_unknown_command_fails() {
    guard().arg("delete").assert().failure();
}

#[test]
fn test_validate_requires_input() {
    guard().arg("validate").assert().failure();
}
