//! Durable position records for task scopes.
//!
//! # Responsibility
//! - Execute position writes inside one caller-owned transaction.
//! - Re-check scope density before the caller commits.
//!
//! # Invariants
//! - `(project_id, position)` is unique in storage; shifts never violate
//!   it, not even transiently between rows.
//! - A detached task (`position IS NULL`) exists only inside an open
//!   transaction; `assert_dense` rejects it.

use crate::model::project::ProjectId;
use crate::model::task::TaskId;
use crate::position::{PositionShift, PositionWriter};
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection};

/// Position writer bound to one open transaction.
///
/// Construct it from a `rusqlite::Transaction`; dropping the transaction
/// without commit discards every write made through the store.
pub struct PositionStore<'tx> {
    conn: &'tx Connection,
}

impl<'tx> PositionStore<'tx> {
    pub fn new(conn: &'tx Connection) -> Self {
        Self { conn }
    }

    /// Inserts a new task row with no position.
    pub fn insert_detached(
        &self,
        task_id: TaskId,
        project_id: ProjectId,
        name: &str,
        deadline: Option<i64>,
    ) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO tasks (id, project_id, name, deadline, done, position)
             VALUES (?1, ?2, ?3, ?4, 0, NULL);",
            params![task_id.to_string(), project_id.to_string(), name, deadline],
        )?;
        Ok(())
    }

    /// Deletes a task row; the task must be detached already.
    pub fn delete_detached(&self, task_id: TaskId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM tasks WHERE id = ?1 AND position IS NULL;",
            [task_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::TaskNotFound(task_id));
        }
        Ok(())
    }

    /// Fails with `ScopeNotDense` unless positions are exactly `1..=N`.
    pub fn assert_dense(&self, project_id: ProjectId) -> RepoResult<()> {
        let mut stmt = self.conn.prepare(
            "SELECT position
             FROM tasks
             WHERE project_id = ?1
             ORDER BY position ASC;",
        )?;
        let mut rows = stmt.query([project_id.to_string()])?;
        let mut expected = 1;
        while let Some(row) = rows.next()? {
            let found: Option<i64> = row.get(0)?;
            if found != Some(expected) {
                return Err(RepoError::ScopeNotDense {
                    project_id,
                    expected,
                    found,
                });
            }
            expected += 1;
        }
        Ok(())
    }
}

impl PositionWriter for PositionStore<'_> {
    type Error = RepoError;

    fn detach(&self, task_id: TaskId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE tasks
             SET position = NULL,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            [task_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::TaskNotFound(task_id));
        }
        Ok(())
    }

    fn shift(&self, project_id: ProjectId, shift: PositionShift) -> RepoResult<usize> {
        // Two phases: park shifted rows at negated targets, then flip them
        // back. Positive slots are never claimed twice mid-statement.
        let parked = self.conn.execute(
            "UPDATE tasks
             SET position = -(position + ?4),
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE project_id = ?1
               AND position BETWEEN ?2 AND ?3;",
            params![project_id.to_string(), shift.from, shift.to, shift.delta],
        )?;
        let restored = self.conn.execute(
            "UPDATE tasks
             SET position = -position
             WHERE project_id = ?1
               AND position < 0;",
            [project_id.to_string()],
        )?;
        if parked != restored {
            return Err(RepoError::InvalidData(format!(
                "shift of project {project_id} parked {parked} rows but restored {restored}"
            )));
        }
        Ok(parked)
    }

    fn assign(&self, task_id: TaskId, position: i64) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE tasks
             SET position = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1
               AND position IS NULL;",
            params![task_id.to_string(), position],
        )?;
        if changed == 0 {
            return Err(RepoError::TaskNotFound(task_id));
        }
        Ok(())
    }
}
