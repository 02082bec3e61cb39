//! Integration tests for `esa-guard validate` and config handling.
//!
//! These tests verify that:
//! - valid documents pass silently
//! - every class of rule violation exits 1 with a single JSON error line
//! - a broken or missing config file fails every command
//! - network commands fail without credentials, before any request

mod common;

use common::{TestEnv, VALID_CREATE, edit_document};
use predicates::prelude::*;
use serde_json::json;

fn error_line(output: &[u8]) -> serde_json::Value {
    let text = String::from_utf8_lossy(output);
    assert_eq!(text.lines().count(), 1, "expected one stderr line: {}", text);
    serde_json::from_str(text.trim()).unwrap()
}

// === Valid input ===

#[test]
fn test_validate_valid_input_prints_nothing() {
    let env = TestEnv::new();
    let input = env.write_input(VALID_CREATE);

    env.guard()
        .args(["validate", input.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_validate_update_input() {
    let env = TestEnv::new();
    let doc = edit_document(VALID_CREATE, |v| {
        v["create_new"] = json!(false);
        v["post_number"] = json!(42);
    });
    let input = env.write_input(&doc);

    env.guard()
        .args(["validate", input.to_str().unwrap()])
        .assert()
        .success();
}

#[test]
fn test_validate_trims_whitespace() {
    let env = TestEnv::new();
    let doc = edit_document(VALID_CREATE, |v| {
        v["category"] = json!("  LLM/Tasks/2026/01/31  ");
        v["name"] = json!("\tWeekly plan\n");
    });
    let input = env.write_input(&doc);

    env.guard()
        .args(["validate", input.to_str().unwrap()])
        .assert()
        .success();
}

// === Rule violations ===

#[test]
fn test_validate_category_outside_allow_list() {
    let env = TestEnv::new();
    let doc = edit_document(VALID_CREATE, |v| {
        v["category"] = json!("LLM/TasksX/2026/01/31");
    });
    let input = env.write_input(&doc);

    let output = env
        .guard()
        .args(["validate", input.to_str().unwrap()])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));
    let err = error_line(&output.stderr);
    assert!(err["error"].as_str().unwrap().contains("category not allowed"));
}

#[test]
fn test_validate_category_without_date_suffix() {
    let env = TestEnv::new();
    let doc = edit_document(VALID_CREATE, |v| {
        v["category"] = json!("LLM/Tasks/notes");
    });
    let input = env.write_input(&doc);

    env.guard()
        .args(["validate", input.to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("yyyy/mm/dd"));
}

#[test]
fn test_validate_traversal_category() {
    let env = TestEnv::new();
    let doc = edit_document(VALID_CREATE, |v| {
        v["category"] = json!("LLM/Tasks/../Secrets/2026/01/31");
    });
    let input = env.write_input(&doc);

    env.guard()
        .args(["validate", input.to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid category path"));
}

#[test]
fn test_validate_circular_dependency() {
    let env = TestEnv::new();
    let doc = edit_document(VALID_CREATE, |v| {
        v["body"]["tasks"][0]["depends_on"] = json!(["t2"]);
    });
    let input = env.write_input(&doc);

    env.guard()
        .args(["validate", input.to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("circular dependency"));
}

#[test]
fn test_validate_both_selectors() {
    let env = TestEnv::new();
    let doc = edit_document(VALID_CREATE, |v| {
        v["post_number"] = json!(7);
    });
    let input = env.write_input(&doc);

    env.guard()
        .args(["validate", input.to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("mutually exclusive"));
}

#[test]
fn test_validate_unknown_field_rejected() {
    let env = TestEnv::new();
    let doc = edit_document(VALID_CREATE, |v| {
        v["tags"] = json!(["x"]);
    });
    let input = env.write_input(&doc);

    env.guard()
        .args(["validate", input.to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid value"));
}

#[test]
fn test_validate_reserved_heading_in_description() {
    let env = TestEnv::new();
    let doc = edit_document(VALID_CREATE, |v| {
        v["body"]["tasks"][1]["description"] = json!("intro\n## Tasks\nmore");
    });
    let input = env.write_input(&doc);

    env.guard()
        .args(["validate", input.to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid format"));
}

#[test]
fn test_validate_invalid_json() {
    let env = TestEnv::new();
    let input = env.write_input("{ not json");

    env.guard()
        .args(["validate", input.to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid JSON"));
}

#[test]
fn test_validate_missing_file() {
    let env = TestEnv::new();

    env.guard()
        .args(["validate", "does-not-exist.json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("\"error\""));
}

#[test]
fn test_validate_directory_rejected() {
    let env = TestEnv::new();
    std::fs::create_dir(env.path().join("docs")).unwrap();

    env.guard()
        .args(["validate", "docs"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not a regular file"));
}

#[test]
fn test_validate_oversized_file() {
    let env = TestEnv::new();
    let big = " ".repeat(2 * 1024 * 1024 + 1);
    let input = env.write_input(&big);

    env.guard()
        .args(["validate", input.to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("file size exceeded"));
}

#[test]
fn test_validate_human_error_format() {
    let env = TestEnv::new();
    let input = env.write_input("[]");

    env.guard()
        .args(["-H", "validate", input.to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::starts_with("Error: "));
}

// === Config ===

#[test]
fn test_missing_config_fails() {
    let env = TestEnv::new();
    let input = env.write_input(VALID_CREATE);

    env.guard()
        .env("ESA_GUARD_CONFIG", env.path().join("missing.toml"))
        .args(["validate", input.to_str().unwrap()])
        .assert()
        .code(1);
}

#[test]
fn test_empty_allow_list_fails() {
    let env = TestEnv::with_config("team = \"acme\"\nallowed_categories = []\n");
    let input = env.write_input(VALID_CREATE);

    env.guard()
        .args(["validate", input.to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("allowed_categories"));
}

#[test]
fn test_unknown_config_key_fails() {
    let env = TestEnv::with_config(
        "team = \"acme\"\nallowed_categories = [\"LLM/Tasks\"]\nallow_all = true\n",
    );
    let input = env.write_input(VALID_CREATE);

    env.guard()
        .args(["validate", input.to_str().unwrap()])
        .assert()
        .code(1);
}

#[test]
fn test_config_flag_overrides_env() {
    let env = TestEnv::new();
    let other = TestEnv::with_config("team = \"acme\"\nallowed_categories = [\"Other\"]\n");
    let input = env.write_input(VALID_CREATE);

    env.guard()
        .args(["--config", other.config_path().to_str().unwrap()])
        .args(["validate", input.to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("category not allowed"));
}

#[cfg(unix)]
#[test]
fn test_world_writable_config_fails() {
    use std::os::unix::fs::PermissionsExt;

    let env = TestEnv::new();
    std::fs::set_permissions(env.config_path(), std::fs::Permissions::from_mode(0o666)).unwrap();
    let input = env.write_input(VALID_CREATE);

    env.guard()
        .args(["validate", input.to_str().unwrap()])
        .assert()
        .code(1);
}

// === Credentials ===

#[test]
fn test_execute_without_token_fails_before_network() {
    let env = TestEnv::new();
    let input = env.write_input(VALID_CREATE);

    env.guard()
        .args(["execute", input.to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("ESA_ACCESS_TOKEN"));

    let after = std::fs::read_to_string(&input).unwrap();
    assert_eq!(after, VALID_CREATE);
}

#[test]
fn test_fetch_without_team_fails() {
    let env = TestEnv::with_config("allowed_categories = [\"LLM/Tasks\"]\n");

    env.guard()
        .env("ESA_ACCESS_TOKEN", "token")
        .args(["fetch", "1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("team"));
}
