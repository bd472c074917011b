//! Local cache connection management

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rusqlite::Connection;
use tokio::sync::Mutex;

use super::repository::{SqliteTaskRepository, TaskRepository};
use super::schema;
use crate::error::Result;
use crate::models::{Task, TaskId, UserId};

/// Where the local cache lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLocation {
    /// Private in-memory database (tests, ephemeral sessions)
    Memory,
    /// Database file on disk, created if missing
    File(PathBuf),
}

impl CacheLocation {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }
}

/// Thread-safe handle to the local task cache.
///
/// Clones share the same connection.
#[derive(Clone)]
pub struct LocalCache {
    conn: Arc<Mutex<Connection>>,
    location: CacheLocation,
}

impl fmt::Debug for LocalCache {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("LocalCache")
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

impl LocalCache {
    /// Open the cache at `location` and make sure the schema exists.
    pub fn open(location: &CacheLocation) -> Result<Self> {
        let conn = match location {
            CacheLocation::Memory => Connection::open_in_memory()?,
            CacheLocation::File(path) => Self::open_file(path)?,
        };
        Self::configure(&conn)?;
        schema::ensure(&conn)?;

        tracing::debug!("Opened local cache at {:?}", location);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            location: location.clone(),
        })
    }

    /// Open a private in-memory cache (useful for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::open(&CacheLocation::Memory)
    }

    fn open_file(path: &Path) -> Result<Connection> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(Connection::open(path)?)
    }

    fn configure(conn: &Connection) -> Result<()> {
        // In-memory databases stay in "memory" journal mode
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))
            .ok();
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(())
    }

    pub const fn location(&self) -> &CacheLocation {
        &self.location
    }

    /// Run `f` against the underlying connection while holding the lock.
    pub async fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.conn.lock().await;
        f(&conn)
    }

    /// List a user's tasks newest first.
    pub async fn fetch_all(&self, user_id: &UserId) -> Result<Vec<Task>> {
        self.with_connection(|conn| SqliteTaskRepository::new(conn).fetch_all(user_id))
            .await
    }

    /// Insert or replace a task.
    pub async fn upsert(&self, task: &Task) -> Result<()> {
        self.with_connection(|conn| SqliteTaskRepository::new(conn).upsert(task))
            .await
    }

    /// Delete a task by id.
    pub async fn delete(&self, id: &TaskId) -> Result<()> {
        self.with_connection(|conn| SqliteTaskRepository::new(conn).delete(id))
            .await
    }

    /// Replace the user's cached tasks with `tasks`.
    pub async fn replace_all(&self, user_id: &UserId, tasks: &[Task]) -> Result<()> {
        self.with_connection(|conn| SqliteTaskRepository::new(conn).replace_all(user_id, tasks))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;

    fn sample(id: &str) -> Task {
        Task {
            id: TaskId::from(id),
            title: format!("task {id}"),
            completed: false,
            created_at: Utc::now(),
            user_id: UserId::new("u1").unwrap(),
        }
    }

    #[tokio::test]
    async fn test_open_in_memory() {
        let cache = LocalCache::open_in_memory().unwrap();
        assert_eq!(cache.location(), &CacheLocation::Memory);
        assert!(cache
            .fetch_all(&UserId::new("u1").unwrap())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_reopen_file_keeps_rows() {
        let tmp = tempdir().unwrap();
        let location = CacheLocation::file(tmp.path().join("nested").join("todos.db"));

        {
            let cache = LocalCache::open(&location).unwrap();
            cache.upsert(&sample("a")).await.unwrap();
        }

        let reopened = LocalCache::open(&location).unwrap();
        let tasks = reopened
            .fetch_all(&UserId::new("u1").unwrap())
            .await
            .unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id.as_str(), "a");
    }

    #[tokio::test]
    async fn test_clones_share_connection() {
        let cache = LocalCache::open_in_memory().unwrap();
        let clone = cache.clone();

        clone.upsert(&sample("a")).await.unwrap();
        cache.delete(&TaskId::from("a")).await.unwrap();

        assert!(clone
            .fetch_all(&UserId::new("u1").unwrap())
            .await
            .unwrap()
            .is_empty());
    }
}
