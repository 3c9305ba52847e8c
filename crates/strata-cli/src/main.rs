//! Strata CLI
//!
//! Reads and writes layered configuration in a configured backend.

mod cli;
mod commands;
mod error;
mod logging;
mod settings;

use clap::Parser;
use colored::Colorize;
use strata_core::ConfigManager;

use cli::{Cli, Commands};
use error::{CliError, Result};
use settings::Settings;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    logging::init(cli.verbose)
        .map_err(|e| CliError::user(format!("Failed to initialise logging: {e}")))?;
    tracing::debug!("Verbose mode enabled");

    let (backend, options) = Settings::resolve(cli.config.as_deref(), cli.store.as_deref())?;
    let mut manager = ConfigManager::open(&backend, options)?;

    let result = execute_command(&mut manager, cli.command);
    manager.close()?;
    result
}

fn execute_command(manager: &mut ConfigManager, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Get { path, exact, json } => commands::run_get(manager, &path, exact, json),
        Commands::GetOne { path, source, json } => {
            if source {
                commands::run_source(manager, &path)
            } else {
                commands::run_get(manager, &path, true, json)
            }
        }
        Commands::Set {
            path,
            value,
            file,
            user,
        } => commands::run_set(
            manager,
            &path,
            value.as_deref(),
            file.as_deref(),
            user.as_deref(),
        ),
        Commands::Delete { pattern } => commands::run_delete(manager, &pattern),
        Commands::Keys { pattern } => commands::run_keys(manager, &pattern),
        Commands::Tree { pattern } => commands::run_tree(manager, &pattern),
        Commands::Import {
            dir,
            root,
            file_as_path,
            ext,
            exclude,
        } => commands::run_import(manager, &dir, root, file_as_path, ext, exclude),
    }
}
