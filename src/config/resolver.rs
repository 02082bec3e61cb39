//! Precedence resolution for configuration values.
//!
//! ## Config file location (highest to lowest)
//!
//! 1. `--config` CLI flag
//! 2. `ESA_GUARD_CONFIG` environment variable
//! 3. `<config_dir>/esa-guard/config.toml`
//!
//! ## Values with environment overrides
//!
//! - access token: `ESA_ACCESS_TOKEN` > `access_token` in config.toml
//! - team: `ESA_GUARD_TEAM` > `team` in config.toml

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::schema::{GuardConfig, HttpConfig};
use crate::esa::RetryPolicy;
use crate::policy::CategoryPolicy;
use crate::{Error, Result};

/// Environment variable holding the config file path.
pub const CONFIG_PATH_ENV: &str = "ESA_GUARD_CONFIG";

/// Environment variable holding the esa access token.
pub const ACCESS_TOKEN_ENV: &str = "ESA_ACCESS_TOKEN";

/// Environment variable overriding the esa team.
pub const TEAM_ENV: &str = "ESA_GUARD_TEAM";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from environment variable
    EnvVar(String),
    /// Value from the config file
    ConfigFile,
    /// Value from CLI flag
    CliFlag,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::ConfigFile => write!(f, "config"),
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    pub value: T,
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    /// Config file the settings were read from
    pub config_path: Resolved<PathBuf>,
    pub team: Option<Resolved<String>>,
    pub access_token: Option<Resolved<String>>,
    pub policy: CategoryPolicy,
    pub wip: bool,
    pub http: HttpConfig,
}

impl ResolvedSettings {
    /// The esa team, required for network commands.
    pub fn team(&self) -> Result<&str> {
        self.team
            .as_ref()
            .map(|r| r.value.as_str())
            .ok_or_else(|| {
                Error::Config(format!(
                    "esa team is not configured (set `team` in config.toml or {})",
                    TEAM_ENV
                ))
            })
    }

    /// The access token, required for network commands.
    pub fn access_token(&self) -> Result<&str> {
        self.access_token
            .as_ref()
            .map(|r| r.value.as_str())
            .ok_or_else(|| {
                Error::Config(format!(
                    "esa access token is not configured (set {})",
                    ACCESS_TOKEN_ENV
                ))
            })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.http.max_attempts,
            base_delay: Duration::from_millis(self.http.base_delay_ms),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }
}

/// Determine which config file to read.
pub fn resolve_config_path(cli_path: Option<&Path>) -> Result<Resolved<PathBuf>> {
    if let Some(path) = cli_path {
        return Ok(Resolved::new(path.to_path_buf(), ValueSource::CliFlag));
    }
    if let Some(path) = non_empty_env(CONFIG_PATH_ENV) {
        return Ok(Resolved::new(
            PathBuf::from(path),
            ValueSource::EnvVar(CONFIG_PATH_ENV.to_string()),
        ));
    }
    let dir = dirs::config_dir()
        .ok_or_else(|| Error::Config("cannot determine the user config directory".into()))?;
    Ok(Resolved::new(
        dir.join("esa-guard").join("config.toml"),
        ValueSource::Default,
    ))
}

/// Load the config file and apply environment overrides.
pub fn resolve_settings(cli_path: Option<&Path>) -> Result<ResolvedSettings> {
    let config_path = resolve_config_path(cli_path)?;
    let config = GuardConfig::load(&config_path.value)?;
    settings_from_config(config_path, config)
}

/// Combine a parsed config with environment overrides.
pub fn settings_from_config(
    config_path: Resolved<PathBuf>,
    config: GuardConfig,
) -> Result<ResolvedSettings> {
    let policy = CategoryPolicy::new(config.allowed_categories)
        .map_err(|e| Error::Config(format!("allowed_categories: {}", e)))?;

    let team = match non_empty_env(TEAM_ENV) {
        Some(team) => Some(Resolved::new(team, ValueSource::EnvVar(TEAM_ENV.to_string()))),
        None => config
            .team
            .filter(|t| !t.trim().is_empty())
            .map(|t| Resolved::new(t, ValueSource::ConfigFile)),
    };

    let access_token = match non_empty_env(ACCESS_TOKEN_ENV) {
        Some(token) => Some(Resolved::new(
            token,
            ValueSource::EnvVar(ACCESS_TOKEN_ENV.to_string()),
        )),
        None => config
            .access_token
            .filter(|t| !t.trim().is_empty())
            .map(|t| Resolved::new(t, ValueSource::ConfigFile)),
    };

    Ok(ResolvedSettings {
        config_path,
        team,
        access_token,
        policy,
        wip: config.wip,
        http: config.http,
    })
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn config(team: Option<&str>, token: Option<&str>) -> GuardConfig {
        GuardConfig {
            team: team.map(str::to_string),
            allowed_categories: vec!["LLM/Tasks".into()],
            access_token: token.map(str::to_string),
            ..GuardConfig::default()
        }
    }

    fn path() -> Resolved<PathBuf> {
        Resolved::new(PathBuf::from("config.toml"), ValueSource::CliFlag)
    }

    fn clear_env() {
        // SAFETY: tests touching the environment are #[serial].
        unsafe {
            std::env::remove_var(TEAM_ENV);
            std::env::remove_var(ACCESS_TOKEN_ENV);
            std::env::remove_var(CONFIG_PATH_ENV);
        }
    }

    #[test]
    #[serial]
    fn test_values_from_config_file() {
        clear_env();
        let settings = settings_from_config(path(), config(Some("acme"), Some("tok"))).unwrap();
        assert_eq!(settings.team().unwrap(), "acme");
        assert_eq!(settings.access_token().unwrap(), "tok");
        assert_eq!(settings.access_token.unwrap().source, ValueSource::ConfigFile);
        assert_eq!(settings.config_path.source, ValueSource::CliFlag);
        assert_eq!(settings.policy.roots(), ["LLM/Tasks".to_string()]);
    }

    #[test]
    #[serial]
    fn test_env_overrides_config() {
        clear_env();
        // SAFETY: serial test
        unsafe {
            std::env::set_var(ACCESS_TOKEN_ENV, "env-token");
            std::env::set_var(TEAM_ENV, "env-team");
        }
        let settings = settings_from_config(path(), config(Some("acme"), Some("tok"))).unwrap();
        assert_eq!(settings.access_token().unwrap(), "env-token");
        assert_eq!(settings.team().unwrap(), "env-team");
        assert_eq!(
            settings.team.unwrap().source,
            ValueSource::EnvVar(TEAM_ENV.to_string())
        );
        clear_env();
    }

    #[test]
    #[serial]
    fn test_missing_token_is_config_error() {
        clear_env();
        let settings = settings_from_config(path(), config(Some("acme"), None)).unwrap();
        assert!(matches!(settings.access_token(), Err(Error::Config(_))));
    }

    #[test]
    #[serial]
    fn test_invalid_allow_list_fails() {
        clear_env();
        let mut cfg = config(Some("acme"), None);
        cfg.allowed_categories = vec!["LLM/../x".into()];
        assert!(settings_from_config(path(), cfg).is_err());

        let mut cfg = config(Some("acme"), None);
        cfg.allowed_categories = vec![];
        assert!(settings_from_config(path(), cfg).is_err());
    }

    #[test]
    #[serial]
    fn test_config_path_precedence() {
        clear_env();
        let cli = resolve_config_path(Some(Path::new("/tmp/cli.toml"))).unwrap();
        assert_eq!(cli.source, ValueSource::CliFlag);

        // SAFETY: serial test
        unsafe {
            std::env::set_var(CONFIG_PATH_ENV, "/tmp/env.toml");
        }
        let env = resolve_config_path(None).unwrap();
        assert_eq!(env.value, PathBuf::from("/tmp/env.toml"));
        assert_eq!(env.source, ValueSource::EnvVar(CONFIG_PATH_ENV.to_string()));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_retry_policy_from_http() {
        clear_env();
        let mut cfg = config(Some("acme"), None);
        cfg.http.max_attempts = 4;
        cfg.http.base_delay_ms = 250;
        let settings = settings_from_config(path(), cfg).unwrap();
        let policy = settings.retry_policy();
        assert_eq!(policy.max_attempts, 4);
        assert_eq!(policy.base_delay, Duration::from_millis(250));
    }
}
