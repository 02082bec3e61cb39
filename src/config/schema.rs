//! TOML schema for `config.toml`.
//!
//! ```toml
//! team = "example"
//! allowed_categories = ["LLM/Tasks"]
//! wip = false
//! # access_token = "..."   # prefer the ESA_ACCESS_TOKEN env var
//!
//! [http]
//! api_base = "https://api.esa.io"
//! timeout_secs = 30
//! max_attempts = 3
//! base_delay_ms = 1000
//! ```

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::esa::DEFAULT_API_BASE;
use crate::{Error, Result};

/// Largest accepted config file, in bytes.
pub const MAX_CONFIG_BYTES: u64 = 64 * 1024;

/// Required file mode when the config stores an access token.
#[cfg(unix)]
pub const SECRET_FILE_MODE: u32 = 0o600;

/// HTTP settings for the esa client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    pub api_base: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            timeout_secs: 30,
            max_attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

/// Contents of `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GuardConfig {
    /// esa team (subdomain)
    pub team: Option<String>,

    /// Allow-list of category prefix roots
    #[serde(default)]
    pub allowed_categories: Vec<String>,

    /// Post as work-in-progress
    #[serde(default)]
    pub wip: bool,

    /// esa access token (the env var takes precedence)
    pub access_token: Option<String>,

    #[serde(default)]
    pub http: HttpConfig,
}

impl GuardConfig {
    /// Parse config from TOML text.
    pub fn parse(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| Error::Config(format!("invalid config.toml: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.http.timeout_secs == 0 {
            return Err(Error::Config("http.timeout_secs must be positive".into()));
        }
        if self.http.max_attempts == 0 || self.http.max_attempts > 10 {
            return Err(Error::Config(format!(
                "http.max_attempts must be 1-10, got {}",
                self.http.max_attempts
            )));
        }
        if !self.http.api_base.starts_with("https://") && !self.http.api_base.starts_with("http://")
        {
            return Err(Error::Config("http.api_base must be an http(s) URL".into()));
        }
        Ok(())
    }

    /// Load config from a file after checking ownership and permissions.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .map_err(|e| Error::Config(format!("cannot open {}: {}", path.display(), e)))?;
        let meta = file.metadata()?;
        if !meta.is_file() {
            return Err(Error::Config(format!("{} is not a regular file", path.display())));
        }
        if meta.len() > MAX_CONFIG_BYTES {
            return Err(Error::Config(format!("{} is too large", path.display())));
        }

        let mut text = String::new();
        file.take(MAX_CONFIG_BYTES).read_to_string(&mut text)?;
        let config = Self::parse(&text)?;

        #[cfg(unix)]
        check_permissions(path, &meta, config.access_token.is_some())?;

        Ok(config)
    }
}

/// Reject config files another user could have written, or could read
/// when they hold a token.
#[cfg(unix)]
pub fn check_permissions(path: &Path, meta: &std::fs::Metadata, has_secret: bool) -> Result<()> {
    use std::os::unix::fs::MetadataExt;

    let uid = nix::unistd::getuid().as_raw();
    if meta.uid() != uid {
        return Err(Error::Config(format!(
            "{} is owned by uid {}, expected {}",
            path.display(),
            meta.uid(),
            uid
        )));
    }

    let mode = meta.mode() & 0o777;
    if mode & 0o022 != 0 {
        return Err(Error::Config(format!(
            "{} is group/world writable (mode {:o})",
            path.display(),
            mode
        )));
    }
    if has_secret && mode & 0o077 != 0 {
        return Err(Error::Config(format!(
            "{} contains access_token but has mode {:o}; run chmod {:o}",
            path.display(),
            mode,
            SECRET_FILE_MODE
        )));
    }
    Ok(())
}
