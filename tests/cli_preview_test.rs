//! Integration tests for `esa-guard preview`.
//!
//! Preview runs the whole local pipeline and prints the exact body that
//! `execute` would send: the embedded JSON block followed by the rendered
//! Markdown. It never needs credentials.

mod common;

use common::{TestEnv, VALID_CREATE, edit_document};
use esa_guard::embed;
use predicates::prelude::*;
use serde_json::json;

fn preview(env: &TestEnv, doc: &str) -> String {
    let input = env.write_input(doc);
    let output = env
        .guard()
        .args(["preview", input.to_str().unwrap()])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "preview failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).unwrap()
}

#[test]
fn test_preview_starts_with_embedded_block() {
    let env = TestEnv::new();
    let body = preview(&env, VALID_CREATE);

    assert!(body.starts_with("<!-- esa-guard-json\n{"));
    assert!(body.contains("\n-->\n\n## Summary\n\n"));
    assert!(body.ends_with('\n'));
    assert!(!body.ends_with("\n\n"));
}

#[test]
fn test_preview_renders_tasks_and_diagram() {
    let env = TestEnv::new();
    let body = preview(&env, VALID_CREATE);

    assert!(body.contains("- [ ] タスク1\n"));
    assert!(body.contains("- [x] Second\n"));
    assert!(body.contains("### Dependencies\n\n```mermaid\ngraph TD\n"));
    assert!(body.contains("t1 --> t2"));
    assert!(body.contains("t2 --> done"));
    assert!(body.contains(
        "## Background\n\n- https://example.com/issue/1\n\nWhy this work exists.\n"
    ));
    assert!(body.contains("## Tasks\n\n### タスク1\n"));
    assert!(body.contains("- Depends on: タスク1\n"));
}

#[test]
fn test_preview_round_trips_through_extract() {
    let env = TestEnv::new();
    let body = preview(&env, VALID_CREATE);

    let extracted = embed::extract(&body).unwrap();
    assert!(extracted.create_new);
    assert_eq!(extracted.post_number, None);
    assert_eq!(extracted.name, "Weekly plan");
    assert_eq!(extracted.category, "LLM/Tasks/2026/01/31");
    assert_eq!(extracted.body.tasks.len(), 2);
    assert_eq!(extracted.body.tasks[1].depends_on, vec!["t1".to_string()]);
}

#[test]
fn test_preview_without_dependencies_has_no_diagram() {
    let env = TestEnv::new();
    let doc = edit_document(VALID_CREATE, |v| {
        v["body"]["tasks"][1]["depends_on"] = json!([]);
    });
    let body = preview(&env, &doc);

    assert!(!body.contains("mermaid"));
    assert!(!body.contains("Depends on"));
}

#[test]
fn test_preview_is_stable() {
    let env = TestEnv::new();
    assert_eq!(preview(&env, VALID_CREATE), preview(&env, VALID_CREATE));
}

#[test]
fn test_preview_rejects_invalid_input() {
    let env = TestEnv::new();
    let doc = edit_document(VALID_CREATE, |v| {
        v["body"]["tasks"][1]["depends_on"] = json!(["missing"]);
    });
    let input = env.write_input(&doc);

    env.guard()
        .args(["preview", input.to_str().unwrap()])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("non-existent"));
}

#[test]
fn test_preview_does_not_modify_input() {
    let env = TestEnv::new();
    let input = env.write_input(VALID_CREATE);

    env.guard()
        .args(["preview", input.to_str().unwrap()])
        .assert()
        .success();

    assert_eq!(std::fs::read_to_string(&input).unwrap(), VALID_CREATE);
}
