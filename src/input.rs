//! Loading and rewriting the input document file.
//!
//! The path is canonicalised first so symlinks are resolved, then every
//! check is made against the *open handle* (`File::metadata` is an fstat), so
//! the file that was checked is the file that is read.

use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::Result;
use crate::errors::{ErrorKind, ValidationError};
use crate::models::{PostInput, trim_json_strings};
use crate::validation::InputSchema;

/// Largest accepted input file, in bytes.
pub const MAX_INPUT_BYTES: u64 = 2 * 1024 * 1024;

/// An input file read from disk.
#[derive(Debug)]
pub struct LoadedInput {
    /// Canonical path the content was read from
    pub path: PathBuf,
    pub input: PostInput,
}

/// Read the raw contents of an input file.
pub fn read_input_file(path: &Path) -> Result<(PathBuf, String)> {
    let resolved = fs::canonicalize(path)?;
    let file = File::open(&resolved)?;
    let meta = file.metadata()?;

    if !meta.is_file() {
        return Err(ValidationError::new(ErrorKind::NotRegularFile)
            .detail(resolved.display().to_string())
            .into());
    }
    if meta.len() > MAX_INPUT_BYTES {
        return Err(size_exceeded(meta.len()).into());
    }

    // The file may grow between fstat and read.
    let mut raw = Vec::new();
    file.take(MAX_INPUT_BYTES + 1).read_to_end(&mut raw)?;
    if raw.len() as u64 > MAX_INPUT_BYTES {
        return Err(size_exceeded(raw.len() as u64).into());
    }

    let text = String::from_utf8(raw).map_err(|e| {
        ValidationError::new(ErrorKind::InvalidJson)
            .detail("input is not valid UTF-8")
            .cause(e)
    })?;
    Ok((resolved, text))
}

fn size_exceeded(size: u64) -> ValidationError {
    ValidationError::new(ErrorKind::FileSizeExceeded)
        .detail(format!("{} bytes, max {}", size, MAX_INPUT_BYTES))
}

/// Parse raw input text: decode, trim strings, check the schema, build the model.
pub fn parse_input(raw: &str, schema: &InputSchema) -> Result<PostInput> {
    let mut value: Value = serde_json::from_str(raw)
        .map_err(|e| ValidationError::new(ErrorKind::InvalidJson).cause(e))?;
    trim_json_strings(&mut value);
    schema.validate(&value)?;
    let input: PostInput = serde_json::from_value(value)
        .map_err(|e| ValidationError::new(ErrorKind::InvalidValue).cause(e))?;
    Ok(input)
}

/// Read and parse an input file.
pub fn load_input(path: &Path, schema: &InputSchema) -> Result<LoadedInput> {
    let (resolved, raw) = read_input_file(path)?;
    let input = parse_input(&raw, schema)?;
    tracing::debug!(path = %resolved.display(), "Loaded input document");
    Ok(LoadedInput {
        path: resolved,
        input,
    })
}

/// Rewrite the input file after a successful create.
///
/// Clears `create_new` and records the assigned post number. The new content
/// is written to a temporary file in the same directory and renamed over the
/// original, so a failure leaves the original untouched.
pub fn write_back_created(path: &Path, input: &PostInput, number: u64) -> Result<()> {
    let mut updated = input.clone();
    updated.mark_created(number);

    let mut json = serde_json::to_string_pretty(&updated)?;
    json.push('\n');

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(json.as_bytes())?;
    tmp.as_file().sync_all()?;
    if let Ok(meta) = fs::metadata(path) {
        fs::set_permissions(tmp.path(), meta.permissions())?;
    }
    tmp.persist(path).map_err(|e| e.error)?;

    tracing::info!(
        path = %path.display(),
        post_number = number,
        "Updated input file with post number"
    );
    Ok(())
}
