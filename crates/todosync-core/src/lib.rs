//! todosync-core - Core library for todosync
//!
//! This crate contains the task model, the local `SQLite` cache, the remote
//! document store client, the in-memory observable store, and the coordinator
//! that keeps the three of them in step.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod remote;
pub mod state;
pub mod store;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{NewTask, Task, TaskId, UserId};
pub use state::SyncState;
pub use store::{TodosState, TodosStore};
pub use sync::{PendingChange, SyncCoordinator};
