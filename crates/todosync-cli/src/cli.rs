use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "todosync")]
#[command(about = "Offline-first to-do list mirrored from Firestore")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local cache database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Profile name for Firebase configuration and session
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in with Firebase email/password and store the session in the keychain
    Login {
        /// Account email
        #[arg(long, value_name = "EMAIL")]
        email: String,
        /// Account password
        #[arg(long, value_name = "PASSWORD")]
        password: String,
        /// Create the account instead of signing in
        #[arg(long)]
        sign_up: bool,
    },
    /// Clear the stored session for the profile
    Logout,
    /// Show sign-in status for the profile
    Status,
    /// Mirror the remote task list into the local cache
    Sync,
    /// List tasks, newest first
    List {
        /// Read the local cache without contacting the remote store
        #[arg(long)]
        offline: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a task
    #[command(alias = "new")]
    Add {
        /// Task title
        #[arg(required = true)]
        title: Vec<String>,
    },
    /// Delete a task by id
    #[command(alias = "rm")]
    Delete {
        /// Task ID
        id: String,
    },
}
