//! In-memory observable task store read by the UI layer.
//!
//! One `TodosStore` is created per session at the application root and
//! handed to whoever needs to read or mutate it; there is no global instance.
//! Subscribers receive a fresh [`TodosState`] on every change.

use std::sync::Arc;

use tokio::sync::watch;

use crate::db::LocalCache;
use crate::error::Result;
use crate::models::{Task, TaskId, UserId};

/// Snapshot of the store contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodosState {
    /// Tasks, newest first
    pub todos: Vec<Task>,
    /// True while `load_todos` is reading the local cache
    pub loading: bool,
    /// Message of the last failed load, cleared when a new load starts
    pub error: Option<String>,
}

/// Observable container for the current user's tasks. Clones share state.
#[derive(Debug, Clone)]
pub struct TodosStore {
    sender: Arc<watch::Sender<TodosState>>,
}

impl Default for TodosStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TodosStore {
    pub fn new() -> Self {
        let (sender, _receiver) = watch::channel(TodosState::default());
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Receive every subsequent state change.
    pub fn subscribe(&self) -> watch::Receiver<TodosState> {
        self.sender.subscribe()
    }

    pub fn snapshot(&self) -> TodosState {
        self.sender.borrow().clone()
    }

    pub fn todos(&self) -> Vec<Task> {
        self.sender.borrow().todos.clone()
    }

    /// Replace the tasks with the local cache's contents for `user_id`.
    ///
    /// On failure the previous tasks are kept and the error message recorded.
    pub async fn load_todos(&self, cache: &LocalCache, user_id: &UserId) -> Result<()> {
        self.sender.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });

        match cache.fetch_all(user_id).await {
            Ok(todos) => {
                tracing::debug!("Loaded {} tasks into the store", todos.len());
                self.sender.send_modify(|state| {
                    state.todos = todos;
                    state.loading = false;
                });
                Ok(())
            }
            Err(error) => {
                let message = error.to_string();
                self.sender.send_modify(|state| {
                    state.error = Some(message);
                    state.loading = false;
                });
                Err(error)
            }
        }
    }

    /// Prepend a freshly created task.
    pub fn add_todo(&self, task: Task) {
        self.sender.send_modify(|state| state.todos.insert(0, task));
    }

    pub fn remove_todo(&self, id: &TaskId) {
        self.sender
            .send_modify(|state| state.todos.retain(|task| &task.id != id));
    }

    pub fn set_todos(&self, todos: Vec<Task>) {
        self.sender.send_modify(|state| state.todos = todos);
    }

    /// Drop everything, e.g. on sign-out.
    pub fn clear(&self) {
        self.sender.send_replace(TodosState::default());
    }
}
