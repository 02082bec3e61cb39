//! Data models for esa-guard documents.
//!
//! This module defines the core data structures:
//! - `PostInput` - One document: create/update selector, name, category, body
//! - `Body` - Background, related links and tasks
//! - `Task` - Work items with status, summary and dependencies
//!
//! The JSON shape of `PostInput` is the on-disk input format and also the
//! payload of the embedded state block, so field names are stable.

pub mod graph;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Task status in the workflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    NotStarted,
    InProgress,
    InReview,
    Completed,
}

impl TaskStatus {
    /// All statuses in workflow order.
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::NotStarted,
        TaskStatus::InProgress,
        TaskStatus::InReview,
        TaskStatus::Completed,
    ];

    /// Wire name, as used in JSON and in rendered status codes.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "not_started",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::InReview => "in_review",
            TaskStatus::Completed => "completed",
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, TaskStatus::Completed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A work item inside a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Identifier, unique within the document
    pub id: String,

    /// Task title (used as the task's heading)
    pub title: String,

    /// Current status
    pub status: TaskStatus,

    /// One to three short lines
    pub summary: Vec<String>,

    /// Free-form Markdown description
    pub description: String,

    /// Task IDs this task depends on
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Related GitHub issue/PR URLs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_urls: Option<Vec<String>>,
}

/// The structured body of a document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Body {
    /// Free-form Markdown background section
    pub background: String,

    /// Links listed at the top of the background section
    #[serde(default)]
    pub related_links: Vec<String>,

    /// Tasks in display order
    pub tasks: Vec<Task>,
}

/// A single document as read from the input file or an embedded block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostInput {
    /// Create a new post instead of updating `post_number`
    #[serde(default)]
    pub create_new: bool,

    /// Existing post to update
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_number: Option<u64>,

    /// Post title
    pub name: String,

    /// Category path (e.g. `Team/Area/2026/01/31`)
    pub category: String,

    pub body: Body,
}

impl PostInput {
    /// Whether this input targets an existing post.
    pub fn is_update(&self) -> bool {
        !self.create_new && self.post_number.is_some()
    }

    /// Mark this input as created with the given post number.
    pub fn mark_created(&mut self, number: u64) {
        self.create_new = false;
        self.post_number = Some(number);
    }
}

fn trim_in_place(s: &mut String) {
    let trimmed = s.trim();
    if trimmed.len() != s.len() {
        *s = trimmed.to_string();
    }
}

/// Trim every string leaf of a raw JSON value.
///
/// Used before schema validation so that the schema sees the same values the
/// typed model will hold.
pub fn trim_json_strings(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::String(s) => trim_in_place(s),
        serde_json::Value::Array(items) => items.iter_mut().for_each(trim_json_strings),
        serde_json::Value::Object(map) => map.values_mut().for_each(trim_json_strings),
        _ => {}
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn task(id: &str, deps: &[&str]) -> Task {
        Task {
            id: id.to_string(),
            title: format!("Task {}", id),
            status: TaskStatus::NotStarted,
            summary: vec![format!("Summary of {}", id)],
            description: format!("Description of {}", id),
            depends_on: deps.iter().map(|d| d.to_string()).collect(),
            github_urls: None,
        }
    }

    pub fn post(tasks: Vec<Task>) -> PostInput {
        PostInput {
            create_new: true,
            post_number: None,
            name: "Weekly plan".to_string(),
            category: "LLM/Tasks/2026/01/31".to_string(),
            body: Body {
                background: "Why this work exists.".to_string(),
                related_links: vec![],
                tasks,
            },
        }
    }
}
