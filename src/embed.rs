//! Embedded state block: machine-readable JSON carried inside a post.
//!
//! Every written post starts with
//!
//! ```text
//! <!-- esa-guard-json
//! {"create_new":false,"post_number":12,...}
//! -->
//!
//! ## Summary
//! ...
//! ```
//!
//! The block is an HTML comment so it is invisible when the post is viewed,
//! and survives edits made through the esa UI. The format is fixed and
//! versionless: sentinel, compact single-line JSON, closing tag, exactly two
//! newlines, rendered Markdown.

use thiserror::Error;

use crate::models::PostInput;
use crate::render;

/// Opening sentinel; a post must start with exactly these bytes.
pub const SENTINEL: &str = "<!-- esa-guard-json\n";

/// Closing tag; the first occurrence after the sentinel ends the block.
pub const CLOSING_TAG: &str = "\n-->";

/// Largest JSON block accepted by [`extract`], in bytes.
pub const MAX_JSON_BLOCK_BYTES: usize = 2 * 1024 * 1024;

/// Errors from embedding or extracting the state block.
#[derive(Debug, Error)]
pub enum EmbedError {
    /// The input could not be serialized; nothing is written
    #[error("failed to serialize embedded state: {0}")]
    SerializationFailed(#[source] serde_json::Error),

    /// The document does not start with the sentinel
    #[error("embedded state sentinel not found at start of document")]
    SentinelNotFound,

    /// No closing tag after the sentinel
    #[error("embedded state closing tag not found")]
    ClosingTagNotFound,

    /// The JSON block exceeds the size limit
    #[error("embedded JSON block too large: {size} bytes (max {max})")]
    JsonBlockTooLarge { size: usize, max: usize },

    /// The JSON block does not decode into a document
    #[error("embedded JSON block is invalid: {0}")]
    InvalidJson(#[source] serde_json::Error),
}

/// Render `input` and prepend its embedded state block.
pub fn embed(input: &PostInput) -> Result<String, EmbedError> {
    let json = serde_json::to_string(input).map_err(EmbedError::SerializationFailed)?;
    let markdown = render::generate_markdown(&input.body);

    let mut out =
        String::with_capacity(SENTINEL.len() + json.len() + CLOSING_TAG.len() + 2 + markdown.len());
    out.push_str(SENTINEL);
    out.push_str(&json);
    out.push_str(CLOSING_TAG);
    out.push_str("\n\n");
    out.push_str(markdown.trim_start());
    Ok(out)
}

/// Locate the embedded JSON block without decoding it.
pub fn extract_json_block(markdown: &str) -> Result<&str, EmbedError> {
    let rest = markdown
        .strip_prefix(SENTINEL)
        .ok_or(EmbedError::SentinelNotFound)?;
    let end = rest.find(CLOSING_TAG).ok_or(EmbedError::ClosingTagNotFound)?;
    if end > MAX_JSON_BLOCK_BYTES {
        return Err(EmbedError::JsonBlockTooLarge {
            size: end,
            max: MAX_JSON_BLOCK_BYTES,
        });
    }
    Ok(&rest[..end])
}

/// Decode the embedded state block of a fetched post.
///
/// Parse only: the result has not been validated.
pub fn extract(markdown: &str) -> Result<PostInput, EmbedError> {
    let block = extract_json_block(markdown)?;
    serde_json::from_str(block).map_err(EmbedError::InvalidJson)
}
