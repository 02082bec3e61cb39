//! esa.io API client.
//!
//! This module provides:
//! - `WikiClient`: the three operations the guard needs (create, update, get)
//! - `EsaClient`: the blocking HTTP implementation over `ureq`
//! - `RetryPolicy` / `with_retry`: capped exponential backoff used for every call
//! - `merge_tags`: order-preserving tag union

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default esa API base URL
pub const DEFAULT_API_BASE: &str = "https://api.esa.io";

/// User-Agent header sent with every request
const USER_AGENT: &str = concat!("esa-guard/", env!("CARGO_PKG_VERSION"));

/// Largest post body accepted from the API, in bytes.
pub const MAX_REMOTE_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Errors that can occur while talking to esa.
#[derive(Debug, Error)]
pub enum WikiError {
    /// Non-2xx response
    #[error("esa returned HTTP {code}: {body}")]
    Status { code: u16, body: String },

    /// Network, TLS or timeout failure
    #[error("HTTP request failed: {0}")]
    Transport(String),

    /// Response body could not be decoded
    #[error("Failed to parse esa response: {0}")]
    Decode(String),

    /// Every attempt failed
    #[error("esa request '{operation}' failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        operation: String,
        attempts: u32,
        #[source]
        last: Box<WikiError>,
    },

    /// Fetched post body is empty
    #[error("post #{0} has an empty body")]
    EmptyBody(u64),

    /// Fetched post body exceeds the size limit
    #[error("post #{number} body is too large: {size} bytes (max {max})")]
    BodyTooLarge { number: u64, size: usize, max: usize },
}

/// A post as returned by the esa API (only fields we care about).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemotePost {
    pub number: u64,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub body_md: String,
    pub url: String,
}

impl RemotePost {
    /// Category as a plain string; uncategorised posts have an empty one.
    pub fn category(&self) -> &str {
        self.category.as_deref().unwrap_or("")
    }
}

/// Fields sent when creating or updating a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostPayload {
    pub name: String,
    pub body_md: String,
    pub tags: Vec<String>,
    pub category: String,
    pub wip: bool,
    pub message: String,
}

#[derive(Serialize)]
struct PostEnvelope<'a> {
    post: &'a PostPayload,
}

/// The wiki operations used by the guard.
///
/// Implementations may fail for any reason; callers treat every failure as
/// retry-worthy and never look at transport details.
pub trait WikiClient {
    fn create_post(&self, post: &PostPayload) -> Result<RemotePost, WikiError>;
    fn update_post(&self, number: u64, post: &PostPayload) -> Result<RemotePost, WikiError>;
    fn get_post(&self, number: u64) -> Result<RemotePost, WikiError>;
}

/// Exponential backoff without jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after failed attempt `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

/// Run `op` until it succeeds or the policy's attempts are used up.
///
/// Every error is retried the same way. The last error is returned wrapped in
/// `RetriesExhausted`.
pub fn with_retry<T>(
    policy: &RetryPolicy,
    operation: &str,
    mut op: impl FnMut() -> Result<T, WikiError>,
) -> Result<T, WikiError> {
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= attempts => {
                return Err(WikiError::RetriesExhausted {
                    operation: operation.to_string(),
                    attempts,
                    last: Box::new(err),
                });
            }
            Err(err) => {
                let delay = policy.delay_after(attempt);
                tracing::warn!(
                    operation,
                    attempt,
                    max_attempts = attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "esa request failed, retrying"
                );
                std::thread::sleep(delay);
                attempt += 1;
            }
        }
    }
}

/// Blocking esa API client.
pub struct EsaClient {
    agent: ureq::Agent,
    api_base: String,
    team: String,
    token: String,
    retry: RetryPolicy,
}

impl std::fmt::Debug for EsaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EsaClient")
            .field("api_base", &self.api_base)
            .field("team", &self.team)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl EsaClient {
    pub fn new(
        api_base: &str,
        team: &str,
        token: &str,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            api_base: api_base.trim_end_matches('/').to_string(),
            team: team.to_string(),
            token: token.to_string(),
            retry,
        }
    }

    fn posts_url(&self) -> String {
        format!("{}/v1/teams/{}/posts", self.api_base, self.team)
    }

    fn post_url(&self, number: u64) -> String {
        format!("{}/{}", self.posts_url(), number)
    }

    fn request(&self, method: &str, url: &str) -> ureq::Request {
        self.agent
            .request(method, url)
            .set("Authorization", &format!("Bearer {}", self.token))
            .set("Accept", "application/json")
            .set("User-Agent", USER_AGENT)
    }

    fn send(
        &self,
        method: &str,
        url: &str,
        payload: Option<&PostPayload>,
    ) -> Result<RemotePost, WikiError> {
        let request = self.request(method, url);
        let response = match payload {
            Some(post) => request.send_json(PostEnvelope { post }),
            None => request.call(),
        };

        match response {
            Ok(resp) => resp
                .into_json::<RemotePost>()
                .map_err(|e| WikiError::Decode(e.to_string())),
            Err(ureq::Error::Status(code, resp)) => {
                let body = resp.into_string().unwrap_or_default();
                Err(WikiError::Status { code, body })
            }
            Err(e) => Err(WikiError::Transport(e.to_string())),
        }
    }
}

impl WikiClient for EsaClient {
    fn create_post(&self, post: &PostPayload) -> Result<RemotePost, WikiError> {
        let url = self.posts_url();
        with_retry(&self.retry, "create_post", || self.send("POST", &url, Some(post)))
    }

    fn update_post(&self, number: u64, post: &PostPayload) -> Result<RemotePost, WikiError> {
        let url = self.post_url(number);
        with_retry(&self.retry, "update_post", || self.send("PATCH", &url, Some(post)))
    }

    fn get_post(&self, number: u64) -> Result<RemotePost, WikiError> {
        let url = self.post_url(number);
        with_retry(&self.retry, "get_post", || self.send("GET", &url, None))
    }
}

/// Add `tag` to `existing` unless already present.
///
/// Order is preserved; an empty tag leaves the set unchanged.
pub fn merge_tags(existing: &[String], tag: &str) -> Vec<String> {
    let mut merged = existing.to_vec();
    if !tag.is_empty() && !merged.iter().any(|t| t == tag) {
        merged.push(tag.to_string());
    }
    merged
}
