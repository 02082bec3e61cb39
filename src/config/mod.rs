//! Configuration for esa-guard.
//!
//! A single TOML file holds the esa team, the category allow-list and HTTP
//! settings. See [`schema`] for the format and [`resolver`] for how the file
//! is located and how environment variables override it.
//!
//! ## Security
//!
//! The config file decides which categories an agent may write to, so it is
//! only trusted when owned by the current user and not group/world writable.
//! If it stores an `access_token` it must also be `0600`. Prefer the
//! `ESA_ACCESS_TOKEN` environment variable for the token.

pub mod resolver;
pub mod schema;

pub use resolver::{
    ACCESS_TOKEN_ENV, CONFIG_PATH_ENV, Resolved, ResolvedSettings, TEAM_ENV, ValueSource,
    resolve_config_path, resolve_settings, settings_from_config,
};
pub use schema::{GuardConfig, HttpConfig};
