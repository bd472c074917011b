//! todosync CLI - keep a personal to-do list in Firestore with an offline
//! `SQLite` copy.

mod cli;
mod commands;
mod config_profiles;
mod error;
mod session_store;
#[cfg(test)]
mod tests;

use std::env;
use std::path::PathBuf;

use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::add::run_add;
use crate::commands::auth_cmd::{run_login, run_logout, run_status};
use crate::commands::delete::run_delete;
use crate::commands::list::run_list;
use crate::commands::sync::run_sync;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                "todosync=info"
                    .parse()
                    .map_err(|error| CliError::Config(format!("{error}")))?,
            ),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);
    let profile = cli.profile.as_deref();

    match cli.command {
        Commands::Login {
            email,
            password,
            sign_up,
        } => run_login(&email, &password, sign_up, profile).await?,
        Commands::Logout => run_logout(profile)?,
        Commands::Status => run_status(profile).await?,
        Commands::Sync => run_sync(profile, &db_path).await?,
        Commands::List { offline, json } => run_list(offline, json, profile, &db_path).await?,
        Commands::Add { title } => run_add(&title, profile, &db_path).await?,
        Commands::Delete { id } => run_delete(&id, profile, &db_path).await?,
    }

    Ok(())
}

fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("TODOSYNC_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("todosync")
        .join("todos.db")
}
