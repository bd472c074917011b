//! Task model

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Identifier of a task, assigned by the remote store.
///
/// Opaque: the local cache reuses it verbatim as its primary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identity of the signed-in user every task is scoped to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Build a user id, rejecting blank values.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into().trim().to_string();
        if value.is_empty() {
            return Err(Error::Validation("User id cannot be empty".to_string()));
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A task record as held by every tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Remote-assigned identifier
    pub id: TaskId,
    /// Non-empty title
    pub title: String,
    /// Completion flag; nothing currently sets it
    #[serde(default)]
    pub completed: bool,
    /// Creation time, the sole sort key (newest first)
    pub created_at: DateTime<Utc>,
    /// Owning user
    pub user_id: UserId,
}

impl Task {
    /// Build the record for a task the remote store just accepted.
    ///
    /// The timestamp is truncated to the millisecond precision the local
    /// cache stores.
    #[must_use]
    pub fn created(id: TaskId, title: impl Into<String>, user_id: UserId) -> Self {
        Self {
            id,
            title: title.into(),
            completed: false,
            created_at: Utc::now().trunc_subsecs(3),
            user_id,
        }
    }
}

/// Payload sent to the remote store on creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub completed: bool,
}

impl NewTask {
    /// Validate and trim a title into a creation payload.
    pub fn new(title: &str) -> Result<Self> {
        Ok(Self {
            title: normalize_title(title)?,
            completed: false,
        })
    }
}

/// Trim a title, rejecting empty and whitespace-only input.
pub fn normalize_title(title: &str) -> Result<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("Task title cannot be empty".to_string()));
    }
    Ok(trimmed.to_string())
}

/// Sort tasks newest first.
pub(crate) fn sort_newest_first(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
