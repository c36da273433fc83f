//! Ordered sibling lookup for one project scope.
//!
//! # Invariants
//! - Results are ascending by `position`, then `id` for determinism.
//! - Every call reads storage; nothing is cached between operations.
//! - Called inside a write transaction, results reflect that transaction.

use crate::model::project::ProjectId;
use crate::model::task::Task;
use crate::position::ScopeEntry;
use crate::repo::{parse_task_row, RepoError, RepoResult, TASK_SELECT_SQL};
use rusqlite::Connection;

/// Returns all tasks of `project_id` ordered by position.
///
/// Does not check that the project exists; an unknown project yields an
/// empty list. Use `ensure_project_exists` first when that matters.
pub fn siblings(conn: &Connection, project_id: ProjectId) -> RepoResult<Vec<Task>> {
    let mut stmt = conn.prepare(&format!(
        "{TASK_SELECT_SQL}
         WHERE project_id = ?1
         ORDER BY position ASC, id ASC;"
    ))?;
    let mut rows = stmt.query([project_id.to_string()])?;
    let mut tasks = Vec::new();
    while let Some(row) = rows.next()? {
        tasks.push(parse_task_row(row)?);
    }
    Ok(tasks)
}

/// Returns the position snapshot of `project_id` for planning.
pub fn scope_entries(conn: &Connection, project_id: ProjectId) -> RepoResult<Vec<ScopeEntry>> {
    Ok(siblings(conn, project_id)?
        .iter()
        .map(ScopeEntry::from)
        .collect())
}

/// Fails with `ProjectNotFound` when no project row exists.
pub fn ensure_project_exists(conn: &Connection, project_id: ProjectId) -> RepoResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM projects WHERE id = ?1);",
        [project_id.to_string()],
        |row| row.get(0),
    )?;
    if exists == 1 {
        Ok(())
    } else {
        Err(RepoError::ProjectNotFound(project_id))
    }
}
