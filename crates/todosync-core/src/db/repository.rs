//! Task repository implementation

use rusqlite::{params, Connection};

use crate::error::Result;
use crate::models::{Task, TaskId, UserId};
use crate::util::{format_timestamp, parse_timestamp};

/// Trait for local task storage operations
pub trait TaskRepository {
    /// List a user's tasks, newest first
    fn fetch_all(&self, user_id: &UserId) -> Result<Vec<Task>>;

    /// Insert or replace a task keyed by its id
    fn upsert(&self, task: &Task) -> Result<()>;

    /// Delete a task by id; absent ids are a no-op
    fn delete(&self, id: &TaskId) -> Result<()>;

    /// Replace everything stored for a user with `tasks`
    fn replace_all(&self, user_id: &UserId, tasks: &[Task]) -> Result<()>;
}

/// `SQLite` implementation of `TaskRepository`
pub struct SqliteTaskRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteTaskRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn insert(&self, task: &Task) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO todos (id, title, completed, createdAt, userId) VALUES (?, ?, ?, ?, ?)",
            params![
                task.id.as_str(),
                task.title,
                i32::from(task.completed),
                format_timestamp(&task.created_at),
                task.user_id.as_str()
            ],
        )?;
        Ok(())
    }

    /// Parse a task from a database row.
    ///
    /// Rows without a readable `createdAt` or `userId` yield `None`.
    fn parse_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<Option<Task>> {
        let id: String = row.get(0)?;
        let created_at: Option<String> = row.get(3)?;
        let user_id: Option<String> = row.get(4)?;

        let Some(created_at) = created_at.as_deref().and_then(parse_timestamp) else {
            tracing::warn!("Skipping cached task {} with invalid createdAt", id);
            return Ok(None);
        };
        let Some(user_id) = user_id.and_then(|value| UserId::new(value).ok()) else {
            tracing::warn!("Skipping cached task {} without a user", id);
            return Ok(None);
        };

        Ok(Some(Task {
            id: TaskId::from(id),
            title: row.get(1)?,
            completed: row.get::<_, Option<i64>>(2)?.unwrap_or(0) == 1,
            created_at,
            user_id,
        }))
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn fetch_all(&self, user_id: &UserId) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, completed, createdAt, userId
             FROM todos
             WHERE userId = ?
             ORDER BY createdAt DESC",
        )?;

        let tasks = stmt
            .query_map(params![user_id.as_str()], Self::parse_task)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(tasks.into_iter().flatten().collect())
    }

    fn upsert(&self, task: &Task) -> Result<()> {
        self.insert(task)
    }

    fn delete(&self, id: &TaskId) -> Result<()> {
        self.conn
            .execute("DELETE FROM todos WHERE id = ?", params![id.as_str()])?;
        Ok(())
    }

    fn replace_all(&self, user_id: &UserId, tasks: &[Task]) -> Result<()> {
        // Rolls back on drop if any statement fails
        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            "DELETE FROM todos WHERE userId = ?",
            params![user_id.as_str()],
        )?;

        for task in tasks {
            let scoped = Task {
                user_id: user_id.clone(),
                ..task.clone()
            };
            self.upsert(&scoped)?;
        }

        tx.commit()?;
        Ok(())
    }
}
