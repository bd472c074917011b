//! Divergence markers for changes the remote store accepted but the local
//! cache did not.

use serde::Serialize;

use crate::models::{Task, TaskId, UserId};

/// A remote-committed change missing from the local cache.
///
/// Resolved by the next successful bootstrap for the same user, which
/// rebuilds the cache from the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PendingChange {
    Created(Task),
    Deleted { user_id: UserId, id: TaskId },
}

impl PendingChange {
    pub const fn user_id(&self) -> &UserId {
        match self {
            Self::Created(task) => &task.user_id,
            Self::Deleted { user_id, .. } => user_id,
        }
    }

    pub const fn task_id(&self) -> &TaskId {
        match self {
            Self::Created(task) => &task.id,
            Self::Deleted { id, .. } => id,
        }
    }
}
