//! esa-guard - scoped writes of agent task documents to esa.
//!
//! This library provides the core functionality for the `esa-guard` CLI:
//! a category policy that confines writes to an allow-list, a task
//! dependency graph processor, a Markdown renderer, and an embedded JSON
//! state block that makes every post round-trippable.

pub mod cli;
pub mod commands;
pub mod config;
pub mod embed;
pub mod errors;
pub mod esa;
pub mod input;
pub mod models;
pub mod policy;
pub mod render;
pub mod repo;
pub mod validation;

use errors::{ErrorKind, ValidationError};

/// Library-level error type for esa-guard operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Embed(#[from] embed::EmbedError),

    #[error("{0}")]
    Wiki(#[from] esa::WikiError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// The validation kind, if this is a validation failure.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Validation(e) => Some(e.kind()),
            _ => None,
        }
    }

    /// Whether this is a validation failure of the given kind.
    pub fn is_kind(&self, kind: ErrorKind) -> bool {
        self.kind() == Some(kind)
    }
}

/// Result type alias for esa-guard operations.
pub type Result<T> = std::result::Result<T, Error>;
