//! esa-guard CLI - category-confined esa writes for AI agents.

use std::env;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use esa_guard::cli::{Cli, Commands};
use esa_guard::commands::{self, CommandResult, Guard};
use esa_guard::config::{self, ResolvedSettings};
use esa_guard::esa::EsaClient;
use esa_guard::repo;
use esa_guard::validation::InputSchema;
use tracing_subscriber::EnvFilter;

/// Environment variable controlling log verbosity.
const LOG_ENV: &str = "ESA_GUARD_LOG";

fn main() {
    let cli = Cli::parse();
    let human = cli.human_readable;

    init_logging();

    if let Err(e) = run(cli) {
        // One line on stderr, whatever the error.
        let message = e.to_string().replace('\n', " ");
        if human {
            eprintln!("Error: {}", message);
        } else {
            eprintln!("{}", serde_json::json!({ "error": message }));
        }
        process::exit(1);
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<(), esa_guard::Error> {
    let settings = config::resolve_settings(cli.config.as_deref())?;
    tracing::debug!(
        path = %settings.config_path.value.display(),
        source = %settings.config_path.source,
        roots = ?settings.policy.roots(),
        "Loaded config"
    );
    let schema = InputSchema::new()?;
    let guard = Guard::new(&settings.policy, &schema, settings.wip);

    tracing::debug!(command = cli.command.name(), "Running command");

    match cli.command {
        Commands::Validate { input } => {
            commands::validate(&guard, &input)?;
        }
        Commands::Preview { input } => {
            let body = commands::preview(&guard, &input)?;
            print!("{}", body);
        }
        Commands::Diff { input } => {
            let client = esa_client(&settings)?;
            let diff = commands::diff(&guard, &client, &input)?;
            print!("{}", diff);
        }
        Commands::Fetch { number } => {
            let client = esa_client(&settings)?;
            let json = commands::fetch(&client, number)?;
            println!("{}", json);
        }
        Commands::Execute { input } => {
            let client = esa_client(&settings)?;
            let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            let tag = repo::repository_tag(&cwd);
            let result = commands::execute(&guard, &client, &input, tag.as_deref())?;
            if cli.human_readable {
                println!("{}", result.to_human());
            } else {
                println!("{}", result.to_json());
            }
        }
    }

    Ok(())
}

fn esa_client(settings: &ResolvedSettings) -> Result<EsaClient, esa_guard::Error> {
    Ok(EsaClient::new(
        &settings.http.api_base,
        settings.team()?,
        settings.access_token()?,
        settings.timeout(),
        settings.retry_policy(),
    ))
}
