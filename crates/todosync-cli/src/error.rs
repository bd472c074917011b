use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] todosync_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Task ID cannot be empty")]
    EmptyTaskId,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error("Profile '{0}' is not signed in. Run `todosync login` first.")]
    NotSignedIn(String),
}

impl From<todosync_core::auth::AuthError> for CliError {
    fn from(error: todosync_core::auth::AuthError) -> Self {
        Self::Auth(error.to_string())
    }
}
