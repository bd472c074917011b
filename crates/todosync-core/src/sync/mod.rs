//! Sync coordination between the remote store, the local cache, and the
//! in-memory store.
//!
//! Remote is the source of truth. Mutations are applied remote first, then
//! locally, then in memory, and stop at the first failing tier. Calls on one
//! coordinator never interleave: each holds the operation guard until done.

mod pending;

use tokio::sync::{watch, Mutex, OnceCell};

use crate::db::{CacheLocation, LocalCache};
use crate::error::{Error, Result};
use crate::models::{NewTask, Task, TaskId, UserId};
use crate::remote::RemoteStore;
use crate::state::SyncState;
use crate::store::TodosStore;

pub use pending::PendingChange;

/// Orchestrates bootstrap and mutations for one session.
pub struct SyncCoordinator<R: RemoteStore> {
    remote: R,
    store: TodosStore,
    cache_location: CacheLocation,
    cache: OnceCell<LocalCache>,
    state: watch::Sender<SyncState>,
    operation: Mutex<()>,
    pending: Mutex<Vec<PendingChange>>,
}

impl<R: RemoteStore> SyncCoordinator<R> {
    /// Create a coordinator whose local cache is opened on first use.
    pub fn new(remote: R, store: TodosStore, cache_location: CacheLocation) -> Self {
        let (state, _receiver) = watch::channel(SyncState::Idle);
        Self {
            remote,
            store,
            cache_location,
            cache: OnceCell::new(),
            state,
            operation: Mutex::new(()),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Create a coordinator around an already opened cache.
    pub fn with_cache(remote: R, store: TodosStore, cache: LocalCache) -> Self {
        let mut coordinator = Self::new(remote, store, cache.location().clone());
        coordinator.cache = OnceCell::new_with(Some(cache));
        coordinator
    }

    pub const fn remote(&self) -> &R {
        &self.remote
    }

    pub const fn store(&self) -> &TodosStore {
        &self.store
    }

    pub fn state(&self) -> SyncState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SyncState> {
        self.state.subscribe()
    }

    /// Whether the local cache has been opened.
    pub fn is_initialized(&self) -> bool {
        self.cache.initialized()
    }

    /// Open the local cache, or return the handle opened earlier.
    pub async fn init(&self) -> Result<LocalCache> {
        self.cache
            .get_or_try_init(|| async { LocalCache::open(&self.cache_location) })
            .await
            .cloned()
    }

    /// Rebuild the local cache from the remote store and publish it.
    pub async fn bootstrap(&self, user_id: &UserId) -> Result<()> {
        let _operation = self.operation.lock().await;

        match self.run_bootstrap(user_id).await {
            Ok(count) => {
                self.set_state(SyncState::Ready);
                tracing::info!("Bootstrap complete for {}: {} tasks", user_id, count);
                Ok(())
            }
            Err(error) => {
                self.set_state(SyncState::Idle);
                tracing::error!("Bootstrap failed for {}: {}", user_id, error);
                Err(error)
            }
        }
    }

    async fn run_bootstrap(&self, user_id: &UserId) -> Result<usize> {
        self.set_state(SyncState::Initializing);
        let cache = self.init().await?;

        self.set_state(SyncState::Syncing);
        let remote_tasks = self.remote.fetch_all(user_id).await?;
        tracing::debug!("Replacing local cache with {} remote tasks", remote_tasks.len());
        cache.replace_all(user_id, &remote_tasks).await?;
        self.store.load_todos(&cache, user_id).await?;

        let mut pending = self.pending.lock().await;
        let before = pending.len();
        pending.retain(|change| change.user_id() != user_id);
        if pending.len() < before {
            tracing::info!("Resolved {} pending changes for {}", before - pending.len(), user_id);
        }

        Ok(remote_tasks.len())
    }

    /// Create a task in every tier and return it.
    ///
    /// Blank titles are rejected before any store is touched.
    pub async fn create_task(&self, user_id: &UserId, title: &str) -> Result<Task> {
        let new_task = NewTask::new(title)?;
        let _operation = self.operation.lock().await;

        let id = self
            .remote
            .create(user_id, &new_task)
            .await
            .inspect_err(|error| tracing::error!("Remote create failed for {}: {}", user_id, error))?;
        tracing::debug!("Remote created task {}", id);

        let task = Task::created(id, new_task.title, user_id.clone());
        if let Err(error) = self.upsert_local(&task).await {
            return Err(self
                .record_divergence(PendingChange::Created(task), error)
                .await);
        }

        self.store.add_todo(task.clone());
        Ok(task)
    }

    /// Delete a task from every tier.
    pub async fn delete_task(&self, user_id: &UserId, id: &TaskId) -> Result<()> {
        let _operation = self.operation.lock().await;

        self.remote
            .delete(user_id, id)
            .await
            .inspect_err(|error| tracing::error!("Remote delete of {} failed: {}", id, error))?;
        tracing::debug!("Remote deleted task {}", id);

        if let Err(error) = self.delete_local(id).await {
            let change = PendingChange::Deleted {
                user_id: user_id.clone(),
                id: id.clone(),
            };
            return Err(self.record_divergence(change, error).await);
        }

        self.store.remove_todo(id);
        Ok(())
    }

    /// Changes committed remotely but missing locally, oldest first.
    pub async fn pending_changes(&self) -> Vec<PendingChange> {
        self.pending.lock().await.clone()
    }

    async fn upsert_local(&self, task: &Task) -> Result<()> {
        self.init().await?.upsert(task).await
    }

    async fn delete_local(&self, id: &TaskId) -> Result<()> {
        self.init().await?.delete(id).await
    }

    async fn record_divergence(&self, change: PendingChange, error: Error) -> Error {
        let task_id = change.task_id().clone();
        tracing::warn!(
            "Task {} committed remotely but not locally: {}; will resolve on next bootstrap",
            task_id,
            error
        );
        self.pending.lock().await.push(change);
        Error::Diverged {
            task_id,
            source: Box::new(error),
        }
    }

    fn set_state(&self, state: SyncState) {
        self.state.send_replace(state);
    }
}
