//! Local cache layer for todosync

mod connection;
mod repository;
mod schema;

pub use connection::{CacheLocation, LocalCache};
pub use repository::{SqliteTaskRepository, TaskRepository};
