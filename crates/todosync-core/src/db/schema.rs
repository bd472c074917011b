//! Local cache schema

use rusqlite::Connection;

use crate::error::Result;

/// Create the cache schema if it does not exist yet.
///
/// There is no versioning: the table layout is created once and assumed stable.
pub fn ensure(conn: &Connection) -> Result<()> {
    // Rolls back on drop if either statement fails
    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS todos (
             id TEXT PRIMARY KEY,
             title TEXT NOT NULL,
             completed INTEGER DEFAULT 0,
             createdAt TEXT,
             userId TEXT
         );
         CREATE INDEX IF NOT EXISTS idx_todos_user_created ON todos(userId, createdAt DESC);",
    )?;
    tx.commit()?;

    tracing::debug!("Local cache schema ready");
    Ok(())
}
