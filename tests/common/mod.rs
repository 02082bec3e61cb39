//! Common test utilities for esa-guard integration tests.
//!
//! Provides `TestEnv` for isolated test environments that never read the
//! user's `~/.config/esa-guard/config.toml` or their access token.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
pub use tempfile::TempDir;

/// Default config used by `TestEnv::new`.
pub const DEFAULT_CONFIG: &str = r#"
team = "acme"
allowed_categories = ["LLM/Tasks"]
"#;

/// A minimal valid document creating a new post.
pub const VALID_CREATE: &str = r#"{
  "create_new": true,
  "name": "Weekly plan",
  "category": "LLM/Tasks/2026/01/31",
  "body": {
    "background": "Why this work exists.",
    "related_links": ["https://example.com/issue/1"],
    "tasks": [
      {
        "id": "t1",
        "title": "タスク1",
        "status": "not_started",
        "summary": ["First step"],
        "description": "Do the first thing.",
        "depends_on": []
      },
      {
        "id": "t2",
        "title": "Second",
        "status": "completed",
        "summary": ["Second step"],
        "description": "Do the second thing.",
        "depends_on": ["t1"]
      }
    ]
  }
}"#;

/// A test environment with an isolated config file and working directory.
///
/// The `guard()` method returns a `Command` that points `ESA_GUARD_CONFIG`
/// at the environment's config, clears any real access token and pins the
/// repository tag, making tests parallel-safe.
pub struct TestEnv {
    pub dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with the default config.
    pub fn new() -> Self {
        Self::with_config(DEFAULT_CONFIG)
    }

    /// Create a new test environment with the given config.toml contents.
    pub fn with_config(config: &str) -> Self {
        let env = Self {
            dir: TempDir::new().unwrap(),
        };
        env.write_file("config.toml", config);
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(
                env.config_path(),
                std::fs::Permissions::from_mode(0o600),
            )
            .unwrap();
        }
        env
    }

    /// Get a Command for the esa-guard binary bound to this environment.
    pub fn guard(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_esa-guard"));
        cmd.current_dir(self.dir.path());
        cmd.env("ESA_GUARD_CONFIG", self.config_path());
        cmd.env("ESA_GUARD_REPO_TAG", "esa-guard");
        cmd.env_remove("ESA_ACCESS_TOKEN");
        cmd.env_remove("ESA_GUARD_TEAM");
        cmd.env_remove("ESA_GUARD_LOG");
        cmd
    }

    /// Write a file relative to the environment directory.
    pub fn write_file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    /// Write an input document and return its path.
    pub fn write_input(&self, contents: &str) -> PathBuf {
        self.write_file("input.json", contents)
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("config.toml")
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a document, apply `edit`, and serialize it back.
pub fn edit_document(doc: &str, edit: impl FnOnce(&mut serde_json::Value)) -> String {
    let mut value: serde_json::Value = serde_json::from_str(doc).unwrap();
    edit(&mut value);
    serde_json::to_string_pretty(&value).unwrap()
}
