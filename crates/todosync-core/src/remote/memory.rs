//! In-process remote store used by tests and offline demos.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use uuid::Uuid;

use super::RemoteStore;
use crate::error::{Error, Result};
use crate::models::{sort_newest_first, NewTask, Task, TaskId, UserId};

/// Remote operations that can be counted or made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOp {
    FetchAll,
    Create,
    Delete,
}

/// Number of calls received per operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoteCalls {
    pub fetch_all: usize,
    pub create: usize,
    pub delete: usize,
}

impl RemoteCalls {
    pub const fn total(&self) -> usize {
        self.fetch_all + self.create + self.delete
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    tasks: HashMap<UserId, Vec<Task>>,
    failing: HashSet<RemoteOp>,
    calls: RemoteCalls,
    last_created_at: Option<DateTime<Utc>>,
}

/// Remote store kept entirely in memory. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryRemoteStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace a user's remote tasks.
    ///
    /// Creation times are kept to the millisecond, like Firestore reads.
    pub fn seed(&self, user_id: &UserId, tasks: Vec<Task>) {
        let tasks = tasks
            .into_iter()
            .map(|task| Task {
                created_at: task.created_at.trunc_subsecs(3),
                ..task
            })
            .collect();
        let mut state = self.lock();
        state.tasks.insert(user_id.clone(), tasks);
    }

    /// Snapshot of a user's remote tasks, newest first.
    pub fn tasks(&self, user_id: &UserId) -> Vec<Task> {
        let state = self.lock();
        let mut tasks = state.tasks.get(user_id).cloned().unwrap_or_default();
        sort_newest_first(&mut tasks);
        tasks
    }

    /// Make every subsequent call of `op` fail until [`Self::recover`].
    pub fn fail(&self, op: RemoteOp) {
        self.lock().failing.insert(op);
    }

    /// Stop failing `op`.
    pub fn recover(&self, op: RemoteOp) {
        self.lock().failing.remove(&op);
    }

    pub fn calls(&self) -> RemoteCalls {
        self.lock().calls
    }

    /// Strictly increasing millisecond creation times.
    fn next_created_at(state: &mut MemoryState) -> DateTime<Utc> {
        let now = Utc::now().trunc_subsecs(3);
        let created_at = match state.last_created_at {
            Some(last) if now <= last => last + Duration::milliseconds(1),
            _ => now,
        };
        state.last_created_at = Some(created_at);
        created_at
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn fetch_all(&self, user_id: &UserId) -> Result<Vec<Task>> {
        {
            let mut state = self.lock();
            state.calls.fetch_all += 1;
            if state.failing.contains(&RemoteOp::FetchAll) {
                return Err(Error::RemoteUnavailable(
                    "memory remote: fetch disabled".to_string(),
                ));
            }
        }
        Ok(self.tasks(user_id))
    }

    async fn create(&self, user_id: &UserId, task: &NewTask) -> Result<TaskId> {
        let mut state = self.lock();
        state.calls.create += 1;
        if state.failing.contains(&RemoteOp::Create) {
            return Err(Error::RemoteWrite(
                "memory remote: create disabled".to_string(),
            ));
        }

        let id = TaskId::from(Uuid::now_v7().to_string());
        let created_at = Self::next_created_at(&mut state);
        state.tasks.entry(user_id.clone()).or_default().push(Task {
            id: id.clone(),
            title: task.title.clone(),
            completed: task.completed,
            created_at,
            user_id: user_id.clone(),
        });
        Ok(id)
    }

    async fn delete(&self, user_id: &UserId, id: &TaskId) -> Result<()> {
        let mut state = self.lock();
        state.calls.delete += 1;
        if state.failing.contains(&RemoteOp::Delete) {
            return Err(Error::RemoteWrite(
                "memory remote: delete disabled".to_string(),
            ));
        }

        if let Some(tasks) = state.tasks.get_mut(user_id) {
            tasks.retain(|task| &task.id != id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserId {
        UserId::new("u1").unwrap()
    }

    #[tokio::test]
    async fn create_assigns_ids_and_orders_newest_first() {
        let remote = MemoryRemoteStore::new();
        let first = remote
            .create(&user(), &NewTask::new("first").unwrap())
            .await
            .unwrap();
        let second = remote
            .create(&user(), &NewTask::new("second").unwrap())
            .await
            .unwrap();
        assert_ne!(first, second);

        let tasks = remote.fetch_all(&user()).await.unwrap();
        assert_eq!(tasks[0].id, second);
        assert_eq!(tasks[1].id, first);
        assert!(tasks[0].created_at > tasks[1].created_at);
    }

    #[tokio::test]
    async fn delete_unknown_id_succeeds() {
        let remote = MemoryRemoteStore::new();
        remote
            .delete(&user(), &TaskId::from("missing"))
            .await
            .unwrap();
        assert_eq!(remote.calls().delete, 1);
    }

    #[tokio::test]
    async fn injected_failures_map_to_remote_errors() {
        let remote = MemoryRemoteStore::new();
        remote.fail(RemoteOp::FetchAll);
        remote.fail(RemoteOp::Create);

        assert!(matches!(
            remote.fetch_all(&user()).await,
            Err(Error::RemoteUnavailable(_))
        ));
        assert!(matches!(
            remote.create(&user(), &NewTask::new("x").unwrap()).await,
            Err(Error::RemoteWrite(_))
        ));

        remote.recover(RemoteOp::FetchAll);
        assert!(remote.fetch_all(&user()).await.unwrap().is_empty());
        assert_eq!(remote.calls().total(), 3);
    }
}
