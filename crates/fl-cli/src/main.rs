use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use fl_cli::commands::{costs, import, policy, sessions, status, summary};
use fl_cli::{Cli, Commands, Config};

/// Load config, ensuring the database directory exists.
fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Logs go to stderr so JSON output on stdout stays parseable.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = load_config(cli.config.as_deref())?;
    let mut stdout = io::stdout().lock();

    match command {
        Commands::Import => {
            let inserted = import::run(&config)?;
            eprintln!("Imported {inserted} new events");
        }
        Commands::Status => status::run(&mut stdout, &config)?,
        Commands::Sessions { filter, json } => sessions::run(&mut stdout, &config, filter, *json)?,
        Commands::Costs {
            filter,
            policy: overrides,
            json,
        } => costs::run(&mut stdout, &config, filter, overrides, *json)?,
        Commands::Summary {
            policy: overrides,
            json,
        } => summary::run(&mut stdout, &config, overrides, *json)?,
        Commands::Policy {
            policy: overrides,
            json,
        } => policy::run(&mut stdout, &config, overrides, *json)?,
    }

    Ok(())
}
