//! Data models for todosync

mod task;

pub use task::{normalize_title, NewTask, Task, TaskId, UserId};
pub(crate) use task::sort_newest_first;
