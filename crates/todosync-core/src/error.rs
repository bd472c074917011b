//! Error types for todosync-core

use thiserror::Error;

use crate::auth::AuthError;
use crate::models::TaskId;

/// Result type alias using todosync-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in todosync-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Input rejected before any store was touched
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Remote store could not be read (network, auth, or server failure)
    #[error("Remote store unavailable: {0}")]
    RemoteUnavailable(String),

    /// Remote store rejected or failed a write
    #[error("Remote write failed: {0}")]
    RemoteWrite(String),

    /// Local cache (`SQLite`) failure
    #[error("Local store error: {0}")]
    LocalStore(#[from] rusqlite::Error),

    /// The remote store committed a change that the local cache did not
    #[error("Task {task_id} was written remotely but not locally: {source}")]
    Diverged {
        task_id: TaskId,
        #[source]
        source: Box<Error>,
    },

    /// Authentication error
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether the error originated in the local cache.
    pub const fn is_local(&self) -> bool {
        matches!(self, Self::LocalStore(_))
    }

    /// Whether the error originated in the remote store.
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::RemoteUnavailable(_) | Self::RemoteWrite(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diverged_reports_task_and_cause() {
        let error = Error::Diverged {
            task_id: TaskId::from("abc"),
            source: Box::new(Error::Validation("boom".to_string())),
        };
        let message = error.to_string();
        assert!(message.contains("abc"));
        assert!(message.contains("boom"));
    }

    #[test]
    fn classifies_tiers() {
        assert!(Error::RemoteWrite("x".into()).is_remote());
        assert!(Error::RemoteUnavailable("x".into()).is_remote());
        assert!(!Error::Validation("x".into()).is_remote());
        assert!(Error::LocalStore(rusqlite::Error::InvalidQuery).is_local());
    }
}
