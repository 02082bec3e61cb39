//! CLI argument definitions for esa-guard.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Long version string with build metadata.
pub const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (commit ",
    env!("ESA_GUARD_GIT_COMMIT"),
    ", built ",
    env!("ESA_GUARD_BUILD_TIMESTAMP"),
    ")"
);

/// esa-guard - scoped writes of agent task documents to esa.
///
/// Start with `esa-guard validate <file>`, check the result with `preview`
/// or `diff`, then publish with `execute`.
#[derive(Parser, Debug)]
#[command(name = "esa-guard")]
#[command(
    author,
    version,
    long_version = LONG_VERSION,
    about = "Category-confined esa writes for AI agents",
    long_about = None
)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Path to config.toml.
    /// Can also be set via ESA_GUARD_CONFIG environment variable.
    #[arg(short = 'c', long = "config", global = true, env = "ESA_GUARD_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse and validate an input file (prints nothing on success)
    Validate {
        /// Input JSON file
        input: PathBuf,
    },

    /// Print the post body that would be written, without touching esa
    Preview {
        /// Input JSON file
        input: PathBuf,
    },

    /// Show a unified diff between the existing post and the new body
    Diff {
        /// Input JSON file (must have post_number)
        input: PathBuf,
    },

    /// Fetch a post and print its embedded JSON state
    Fetch {
        /// Post number
        #[arg(value_parser = clap::value_parser!(u64).range(1..))]
        number: u64,
    },

    /// Create or update the post described by an input file
    Execute {
        /// Input JSON file
        input: PathBuf,
    },
}

impl Commands {
    /// Command name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Validate { .. } => "validate",
            Commands::Preview { .. } => "preview",
            Commands::Diff { .. } => "diff",
            Commands::Fetch { .. } => "fetch",
            Commands::Execute { .. } => "execute",
        }
    }
}
