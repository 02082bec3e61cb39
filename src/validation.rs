//! Input validation: JSON schema shape checks and semantic rules.
//!
//! Validation happens in two stages:
//!
//! 1. **Schema**: the raw (trimmed) JSON value is checked against the compiled
//!    [`InputSchema`]. This only covers shapes: types, required properties,
//!    enum values and unknown keys.
//! 2. **Semantic**: [`validate_input`] applies the field-level rules, the
//!    category policy and the task graph checks to a typed [`PostInput`].
//!
//! Both stages fail closed on the first problem found.

use std::collections::HashSet;

use jsonschema::error::ValidationErrorKind;
use jsonschema::{Draft, JSONSchema};
use serde_json::Value;

use crate::errors::{ErrorKind, ValidationError};
use crate::models::graph;
use crate::models::{PostInput, Task};
use crate::policy::CategoryPolicy;
use crate::{Error, Result};

/// Maximum length of a post name, in bytes.
pub const MAX_NAME_BYTES: usize = 255;

/// Maximum length of a task title, in bytes.
pub const MAX_TITLE_BYTES: usize = 255;

/// Maximum length of a task id, in bytes.
pub const MAX_TASK_ID_BYTES: usize = 64;

/// Maximum number of summary lines per task.
pub const MAX_SUMMARY_LINES: usize = 3;

/// Maximum length of one summary line, in characters.
pub const MAX_SUMMARY_LINE_CHARS: usize = 140;

/// Characters esa interprets inside post names.
const FORBIDDEN_NAME_CHARS: [char; 4] = ['/', '（', '）', '：'];

/// Compiled JSON schema for the input document.
///
/// Construct once at startup and pass by reference to [`InputSchema::validate`].
pub struct InputSchema {
    compiled: JSONSchema,
}

impl std::fmt::Debug for InputSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputSchema").finish_non_exhaustive()
    }
}

impl InputSchema {
    /// Compile the embedded input schema.
    pub fn new() -> Result<Self> {
        let schema = Self::schema();
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&schema)
            .map_err(|e| Error::Other(format!("Failed to compile input schema: {}", e)))?;
        Ok(Self { compiled })
    }

    /// Check the shape of a raw input document.
    ///
    /// Reports the first violation: a missing property as `MissingRequired`,
    /// anything else as `InvalidValue`. The field is the JSON pointer of the
    /// offending value.
    pub fn validate(&self, instance: &Value) -> std::result::Result<(), ValidationError> {
        let Err(mut errors) = self.compiled.validate(instance) else {
            return Ok(());
        };
        let Some(first) = errors.next() else {
            return Ok(());
        };

        let pointer = first.instance_path.to_string();
        let field = if pointer.is_empty() {
            "/".to_string()
        } else {
            pointer
        };

        let err = match &first.kind {
            ValidationErrorKind::Required { property } => {
                let name = property
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| property.to_string());
                let field = if field == "/" {
                    name
                } else {
                    format!("{}/{}", field, name)
                };
                ValidationError::new(ErrorKind::MissingRequired).field(field)
            }
            _ => ValidationError::new(ErrorKind::InvalidValue)
                .field(field)
                .detail(first.to_string()),
        };
        Err(err)
    }

    fn schema() -> Value {
        serde_json::json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "title": "esa-guard input document",
            "type": "object",
            "additionalProperties": false,
            "required": ["name", "category", "body"],
            "properties": {
                "create_new": { "type": "boolean" },
                "post_number": { "type": "integer" },
                "name": { "type": "string" },
                "category": { "type": "string" },
                "body": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["background", "tasks"],
                    "properties": {
                        "background": { "type": "string" },
                        "related_links": {
                            "type": "array",
                            "items": { "type": "string" }
                        },
                        "tasks": {
                            "type": "array",
                            "items": { "$ref": "#/definitions/task" }
                        }
                    }
                }
            },
            "definitions": {
                "task": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["id", "title", "status", "summary", "description"],
                    "properties": {
                        "id": { "type": "string" },
                        "title": { "type": "string" },
                        "status": {
                            "enum": ["not_started", "in_progress", "in_review", "completed"]
                        },
                        "summary": {
                            "type": "array",
                            "items": { "type": "string" }
                        },
                        "description": { "type": "string" },
                        "depends_on": {
                            "type": "array",
                            "items": { "type": "string" },
                            "uniqueItems": true
                        },
                        "github_urls": {
                            "type": "array",
                            "items": { "type": "string" }
                        }
                    }
                }
            }
        })
    }
}

/// Apply every semantic rule to a parsed document.
pub fn validate_input(
    input: &PostInput,
    policy: &CategoryPolicy,
) -> std::result::Result<(), ValidationError> {
    validate_target(input)?;
    validate_name(&input.name)?;
    policy.check_write(&input.category)?;

    if input.body.background.is_empty() {
        return Err(ValidationError::new(ErrorKind::FieldEmpty).field("body.background"));
    }
    check_no_reserved_headings(&input.body.background, "body.background", None)?;

    for (index, link) in input.body.related_links.iter().enumerate() {
        if !is_http_url(link) {
            return Err(ValidationError::new(ErrorKind::FieldInvalidFormat)
                .field("body.related_links")
                .index(index)
                .detail("expected an http(s) URL"));
        }
    }

    if input.body.tasks.is_empty() {
        return Err(ValidationError::new(ErrorKind::FieldEmpty).field("body.tasks"));
    }

    let mut seen = HashSet::new();
    for (index, task) in input.body.tasks.iter().enumerate() {
        validate_task(task, index)?;
        if !seen.insert(task.id.as_str()) {
            return Err(ValidationError::new(ErrorKind::DuplicateId)
                .field("body.tasks.id")
                .index(index)
                .detail(format!("\"{}\"", task.id)));
        }
    }

    graph::validate_dependencies(&input.body.tasks)
}

/// Exactly one of `create_new` and a positive `post_number`.
fn validate_target(input: &PostInput) -> std::result::Result<(), ValidationError> {
    match (input.create_new, input.post_number) {
        (true, Some(_)) => Err(ValidationError::new(ErrorKind::MutuallyExclusive)
            .field("create_new")
            .detail("create_new and post_number cannot both be set")),
        (false, None) => Err(ValidationError::new(ErrorKind::MissingRequired)
            .field("post_number")
            .detail("set either create_new or post_number")),
        (false, Some(0)) => Err(ValidationError::new(ErrorKind::InvalidValue)
            .field("post_number")
            .detail("post_number must be positive")),
        _ => Ok(()),
    }
}

fn validate_name(name: &str) -> std::result::Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::new(ErrorKind::FieldEmpty).field("name"));
    }
    if name.len() > MAX_NAME_BYTES {
        return Err(ValidationError::new(ErrorKind::FieldTooLong)
            .field("name")
            .detail(format!("{} bytes, max {}", name.len(), MAX_NAME_BYTES)));
    }
    if name
        .chars()
        .any(|c| c.is_control() || FORBIDDEN_NAME_CHARS.contains(&c))
    {
        return Err(ValidationError::new(ErrorKind::FieldInvalidChars).field("name"));
    }
    Ok(())
}

fn validate_task(task: &Task, index: usize) -> std::result::Result<(), ValidationError> {
    if task.id.is_empty() {
        return Err(ValidationError::new(ErrorKind::FieldEmpty)
            .field("body.tasks.id")
            .index(index));
    }
    if task.id.len() > MAX_TASK_ID_BYTES {
        return Err(ValidationError::new(ErrorKind::FieldTooLong)
            .field("body.tasks.id")
            .index(index));
    }
    if !task
        .id
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
        return Err(ValidationError::new(ErrorKind::FieldInvalidFormat)
            .field("body.tasks.id")
            .index(index)
            .detail("use only ASCII letters, digits, '-' and '_'"));
    }

    if task.title.is_empty() {
        return Err(ValidationError::new(ErrorKind::FieldEmpty)
            .field("body.tasks.title")
            .index(index));
    }
    if task.title.len() > MAX_TITLE_BYTES {
        return Err(ValidationError::new(ErrorKind::FieldTooLong)
            .field("body.tasks.title")
            .index(index));
    }
    if task.title.chars().any(char::is_control) {
        return Err(ValidationError::new(ErrorKind::FieldInvalidChars)
            .field("body.tasks.title")
            .index(index));
    }

    if task.summary.is_empty() {
        return Err(ValidationError::new(ErrorKind::FieldEmpty)
            .field("body.tasks.summary")
            .index(index));
    }
    if task.summary.len() > MAX_SUMMARY_LINES {
        return Err(ValidationError::new(ErrorKind::FieldTooLong)
            .field("body.tasks.summary")
            .index(index)
            .detail(format!("{} lines, max {}", task.summary.len(), MAX_SUMMARY_LINES)));
    }
    for line in &task.summary {
        if line.is_empty() {
            return Err(ValidationError::new(ErrorKind::FieldEmpty)
                .field("body.tasks.summary")
                .index(index));
        }
        if line.chars().count() > MAX_SUMMARY_LINE_CHARS {
            return Err(ValidationError::new(ErrorKind::FieldTooLong)
                .field("body.tasks.summary")
                .index(index)
                .detail(format!("line exceeds {} characters", MAX_SUMMARY_LINE_CHARS)));
        }
        if line.chars().any(char::is_control) {
            return Err(ValidationError::new(ErrorKind::FieldInvalidChars)
                .field("body.tasks.summary")
                .index(index));
        }
    }

    if task.description.is_empty() {
        return Err(ValidationError::new(ErrorKind::FieldEmpty)
            .field("body.tasks.description")
            .index(index));
    }
    check_no_reserved_headings(&task.description, "body.tasks.description", Some(index))?;

    if let Some(urls) = &task.github_urls {
        for url in urls {
            if !url.starts_with("https://github.com/") || url.len() == "https://github.com/".len() {
                return Err(ValidationError::new(ErrorKind::FieldInvalidFormat)
                    .field("body.tasks.github_urls")
                    .index(index)
                    .detail(format!("\"{}\" is not a GitHub URL", url)));
            }
        }
    }

    Ok(())
}

/// Reject Markdown headings of level 1-3 (`#`, `##`, `###` at line start).
///
/// Those levels are used by the generated document structure; `####` and
/// `#####` are allowed. Lines end at `\r\n`, `\n` or a lone `\r`, and a
/// heading may be indented by up to three spaces.
pub fn check_no_reserved_headings(
    text: &str,
    field: &str,
    index: Option<usize>,
) -> std::result::Result<(), ValidationError> {
    let normalized = text.replace("\r\n", "\n");
    for (line_no, line) in normalized.split(['\n', '\r']).enumerate() {
        let indent = line.bytes().take_while(|b| *b == b' ').count();
        if indent > 3 {
            continue;
        }
        let line = &line[indent..];
        let level = line.bytes().take_while(|b| *b == b'#').count();
        if !(1..=3).contains(&level) {
            continue;
        }
        let rest = &line[level..];
        if rest.is_empty() || rest.starts_with(' ') || rest.starts_with('\t') {
            let mut err = ValidationError::new(ErrorKind::FieldInvalidFormat)
                .field(field)
                .detail(format!(
                    "line {}: heading levels 1-3 are reserved, use #### or #####",
                    line_no + 1
                ));
            if let Some(index) = index {
                err = err.index(index);
            }
            return Err(err);
        }
    }
    Ok(())
}

fn is_http_url(s: &str) -> bool {
    let rest = s
        .strip_prefix("https://")
        .or_else(|| s.strip_prefix("http://"));
    matches!(rest, Some(r) if !r.is_empty() && !r.chars().any(char::is_whitespace))
}
