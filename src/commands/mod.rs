//! Command implementations for the esa-guard CLI.
//!
//! Each command runs the same front half of the pipeline: load and parse the
//! input file, check its schema, then apply the semantic rules (category
//! policy, field rules, task graph). Only then does anything touch the
//! network:
//!
//! - `validate` - stop after validation
//! - `preview` - render the post body that would be written
//! - `diff` - compare the would-be body with the remote post
//! - `fetch` - read a post back and decode its embedded state
//! - `execute` - create or update the post

use std::path::Path;

use serde::Serialize;

use crate::embed;
use crate::errors::{ErrorKind, ValidationError};
use crate::esa::{self, MAX_REMOTE_BODY_BYTES, PostPayload, WikiClient, WikiError};
use crate::input::{self, LoadedInput};
use crate::models::PostInput;
use crate::policy::CategoryPolicy;
use crate::validation::{self, InputSchema};
use crate::{Error, Result};

/// Revision message recorded on every write.
const REVISION_MESSAGE: &str = "Updated by esa-guard";

/// Command results that can be serialized to JSON or formatted for humans.
pub trait CommandResult {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

/// What `execute` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecuteAction {
    Created,
    Updated,
}

/// Result of `execute`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecuteResult {
    pub action: ExecuteAction,
    pub number: u64,
    pub url: String,
}

impl CommandResult for ExecuteResult {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    fn to_human(&self) -> String {
        let verb = match self.action {
            ExecuteAction::Created => "Created",
            ExecuteAction::Updated => "Updated",
        };
        format!("{} post #{}: {}", verb, self.number, self.url)
    }
}

/// Validation context shared by every command.
#[derive(Debug, Clone, Copy)]
pub struct Guard<'a> {
    pub policy: &'a CategoryPolicy,
    pub schema: &'a InputSchema,
    pub wip: bool,
}

impl<'a> Guard<'a> {
    pub fn new(policy: &'a CategoryPolicy, schema: &'a InputSchema, wip: bool) -> Self {
        Self {
            policy,
            schema,
            wip,
        }
    }

    fn payload(&self, input: &PostInput, body_md: String, tags: Vec<String>) -> PostPayload {
        PostPayload {
            name: input.name.clone(),
            body_md,
            tags,
            category: input.category.clone(),
            wip: self.wip,
            message: REVISION_MESSAGE.to_string(),
        }
    }

    /// Fetch the post an update targets and check the category rules.
    fn fetch_for_update<C: WikiClient + ?Sized>(
        &self,
        client: &C,
        input: &PostInput,
        number: u64,
    ) -> Result<esa::RemotePost> {
        let existing = client.get_post(number)?;
        self.policy
            .validate_update(existing.category(), &input.category)?;
        Ok(existing)
    }
}

/// Load, parse and fully validate an input file.
pub fn validate(guard: &Guard<'_>, path: &Path) -> Result<LoadedInput> {
    let loaded = input::load_input(path, guard.schema)?;
    validation::validate_input(&loaded.input, guard.policy)?;
    tracing::debug!(
        tasks = loaded.input.body.tasks.len(),
        category = %loaded.input.category,
        "Input validated"
    );
    Ok(loaded)
}

/// Render the post body (embedded block + Markdown) without any network call.
pub fn preview(guard: &Guard<'_>, path: &Path) -> Result<String> {
    let loaded = validate(guard, path)?;
    Ok(embed::embed(&loaded.input)?)
}

/// Unified diff between the remote post body and the body that would be written.
///
/// Only valid for inputs that target an existing post. Returns an empty
/// string when the bodies are identical.
pub fn diff<C: WikiClient + ?Sized>(guard: &Guard<'_>, client: &C, path: &Path) -> Result<String> {
    let loaded = validate(guard, path)?;
    let input = &loaded.input;
    let number = match input.post_number {
        Some(number) if input.is_update() => number,
        _ => {
            return Err(ValidationError::new(ErrorKind::InvalidValue)
                .field("post_number")
                .detail("diff requires an existing post_number")
                .into());
        }
    };

    let new_body = embed::embed(input)?;
    let existing = guard.fetch_for_update(client, input, number)?;

    Ok(unified_diff(&existing.body_md, &new_body, number))
}

/// Render a unified diff with three lines of context.
pub fn unified_diff(old: &str, new: &str, number: u64) -> String {
    if old == new {
        return String::new();
    }
    similar::TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(3)
        .header(&format!("remote/{}", number), &format!("local/{}", number))
        .to_string()
}

/// Fetch a post and return its embedded state as pretty-printed JSON.
pub fn fetch<C: WikiClient + ?Sized>(client: &C, number: u64) -> Result<String> {
    let post = client.get_post(number)?;

    if post.body_md.is_empty() {
        return Err(WikiError::EmptyBody(number).into());
    }
    if post.body_md.len() > MAX_REMOTE_BODY_BYTES {
        return Err(WikiError::BodyTooLarge {
            number,
            size: post.body_md.len(),
            max: MAX_REMOTE_BODY_BYTES,
        }
        .into());
    }

    let embedded = embed::extract(&post.body_md)?;
    match embedded.post_number {
        Some(n) if n == number => {}
        Some(n) => {
            return Err(ValidationError::new(ErrorKind::InvalidValue)
                .field("post_number")
                .detail(format!(
                    "embedded post_number {} does not match requested post #{}",
                    n, number
                ))
                .into());
        }
        None => {
            return Err(ValidationError::new(ErrorKind::MissingRequired)
                .field("post_number")
                .detail(format!("post #{} has no embedded post_number", number))
                .into());
        }
    }

    Ok(serde_json::to_string_pretty(&embedded)?)
}

/// Create or update the post described by an input file.
///
/// On update the remote post's category must be allowed and unchanged, and
/// `repo_tag` is merged into its tags. On create the post is tagged with
/// `repo_tag` only, and the input file is rewritten with the new post number
/// once the create has succeeded.
pub fn execute<C: WikiClient + ?Sized>(
    guard: &Guard<'_>,
    client: &C,
    path: &Path,
    repo_tag: Option<&str>,
) -> Result<ExecuteResult> {
    let loaded = validate(guard, path)?;
    let input = &loaded.input;
    let body_md = embed::embed(input)?;

    if let Some(number) = input.post_number.filter(|_| input.is_update()) {
        let existing = guard.fetch_for_update(client, input, number)?;
        let tags = esa::merge_tags(&existing.tags, repo_tag.unwrap_or(""));
        let payload = guard.payload(input, body_md, tags);

        let updated = client.update_post(number, &payload)?;
        tracing::info!(number = updated.number, url = %updated.url, "Updated post");
        return Ok(ExecuteResult {
            action: ExecuteAction::Updated,
            number: updated.number,
            url: updated.url,
        });
    }

    let tags: Vec<String> = repo_tag
        .filter(|t| !t.is_empty())
        .map(|t| vec![t.to_string()])
        .unwrap_or_default();
    let payload = guard.payload(input, body_md, tags);

    let created = client.create_post(&payload)?;
    tracing::info!(number = created.number, url = %created.url, "Created post");

    input::write_back_created(&loaded.path, input, created.number).map_err(|e| {
        Error::Other(format!(
            "post #{} was created ({}) but the input file could not be updated: {}",
            created.number, created.url, e
        ))
    })?;

    Ok(ExecuteResult {
        action: ExecuteAction::Created,
        number: created.number,
        url: created.url,
    })
}
