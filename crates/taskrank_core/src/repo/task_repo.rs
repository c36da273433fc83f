//! Task repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Read single tasks; whole scopes are read through `scope_resolver`.
//! - Write fields that are independent of ordering (`name`, `deadline`,
//!   `done`).
//!
//! # Invariants
//! - No statement in this module reads or writes `tasks.position` except
//!   through the read model; ordering writes belong to `position_store`.

use crate::db::migrations::ensure_schema_ready;
use crate::model::task::{Task, TaskId};
use crate::repo::{bool_to_int, parse_task_row, RepoError, RepoResult, TASK_SELECT_SQL};
use rusqlite::{params, Connection};

/// Repository interface for ordering-independent task access.
pub trait TaskRepository {
    /// Loads one task by id.
    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>>;
    /// Updates name and/or deadline; `deadline: Some(None)` clears it.
    fn update_fields(
        &self,
        id: TaskId,
        name: Option<&str>,
        deadline: Option<Option<i64>>,
    ) -> RepoResult<()>;
    /// Sets completion state.
    fn set_done(&self, id: TaskId, done: bool) -> RepoResult<()>;
}

/// SQLite-backed task repository.
pub struct SqliteTaskRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTaskRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn)?;
        Ok(Self { conn })
    }
}

impl TaskRepository for SqliteTaskRepository<'_> {
    fn get_task(&self, id: TaskId) -> RepoResult<Option<Task>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TASK_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_task_row(row)?));
        }
        Ok(None)
    }

    fn update_fields(
        &self,
        id: TaskId,
        name: Option<&str>,
        deadline: Option<Option<i64>>,
    ) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE tasks
             SET name = COALESCE(?2, name),
                 deadline = CASE WHEN ?3 = 1 THEN ?4 ELSE deadline END,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                id.to_string(),
                name,
                bool_to_int(deadline.is_some()),
                deadline.flatten(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::TaskNotFound(id));
        }
        Ok(())
    }

    fn set_done(&self, id: TaskId, done: bool) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE tasks
             SET done = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![id.to_string(), bool_to_int(done)],
        )?;
        if changed == 0 {
            return Err(RepoError::TaskNotFound(id));
        }
        Ok(())
    }
}
