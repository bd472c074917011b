//! Remote document store abstractions.
//!
//! The remote store is authoritative: bootstrap always rebuilds the local
//! cache from what it returns.

mod firestore;
mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{NewTask, Task, TaskId, UserId};

pub use firestore::{FirestoreConfig, FirestoreStore, DEFAULT_FIRESTORE_URL};
pub use memory::{MemoryRemoteStore, RemoteCalls, RemoteOp};

/// Operations against the user-scoped remote task collection.
///
/// Every call round-trips to the backing service; implementations hold no
/// cache of their own.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch all of a user's tasks, newest first.
    async fn fetch_all(&self, user_id: &UserId) -> Result<Vec<Task>>;

    /// Create a task and return the id the store assigned to it.
    async fn create(&self, user_id: &UserId, task: &NewTask) -> Result<TaskId>;

    /// Delete a task. Deleting an unknown id is not an error.
    async fn delete(&self, user_id: &UserId, id: &TaskId) -> Result<()>;
}
