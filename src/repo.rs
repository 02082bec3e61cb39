//! Repository identity for tagging posts.
//!
//! Posts are tagged with the name of the repository the agent is working in,
//! taken from the `origin` remote. Resolution never fails: when no name can
//! be determined the post is simply not tagged.

use std::path::Path;
use std::process::Command;

/// Environment variable that overrides repository tag resolution.
pub const REPO_TAG_ENV: &str = "ESA_GUARD_REPO_TAG";

/// Resolve the repository tag for `dir`.
///
/// Priority: `ESA_GUARD_REPO_TAG` env var > `git remote get-url origin`.
pub fn repository_tag(dir: &Path) -> Option<String> {
    if let Ok(tag) = std::env::var(REPO_TAG_ENV) {
        let tag = tag.trim();
        return (!tag.is_empty()).then(|| tag.to_string());
    }

    let output = match Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(["remote", "get-url", "origin"])
        .output()
    {
        Ok(output) => output,
        Err(e) => {
            tracing::warn!(error = %e, "Could not run git; posting without a repository tag");
            return None;
        }
    };

    if !output.status.success() {
        tracing::warn!("No origin remote found; posting without a repository tag");
        return None;
    }

    let url = String::from_utf8(output.stdout).ok()?;
    let tag = repo_name_from_url(url.trim());
    if tag.is_none() {
        tracing::warn!(url = url.trim(), "Could not parse repository name from origin URL");
    }
    tag
}

/// Extract the repository name from a git remote URL.
///
/// Handles `https://host/owner/repo(.git)`, `git@host:owner/repo(.git)` and
/// plain paths.
pub fn repo_name_from_url(url: &str) -> Option<String> {
    let trimmed = url.trim_end_matches('/');
    let last = trimmed.rsplit(['/', ':']).next()?;
    let name = last.strip_suffix(".git").unwrap_or(last);
    if name.is_empty() || name.contains(char::is_whitespace) {
        None
    } else {
        Some(name.to_string())
    }
}
