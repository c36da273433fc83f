//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service orchestration.
//! - Own the authoritative `(task, project, position)` records.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`ProjectNotFound`,
//!   `TaskNotFound`) in addition to DB transport errors.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Only `position_store` writes the `position` column.

pub mod position_store;
pub mod project_repo;
pub mod scope_resolver;
pub mod task_repo;

use crate::db::DbError;
use crate::model::project::ProjectId;
use crate::model::task::{Task, TaskId};
use rusqlite::Row;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub(crate) const TASK_SELECT_SQL: &str = "SELECT
    id,
    project_id,
    name,
    deadline,
    done,
    position,
    created_at,
    updated_at
FROM tasks";

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from repository operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    ProjectNotFound(ProjectId),
    TaskNotFound(TaskId),
    /// Persisted scope is not `1..=N` after a write.
    ScopeNotDense {
        project_id: ProjectId,
        expected: i64,
        found: Option<i64>,
    },
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl RepoError {
    /// Returns whether another writer held the database lock.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Db(err) if err.is_busy())
    }

    /// Returns whether SQLite rejected a write on a constraint.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Self::Db(DbError::Sqlite(rusqlite::Error::SqliteFailure(err, _)))
                if err.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::ProjectNotFound(id) => write!(f, "project not found: {id}"),
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::ScopeNotDense {
                project_id,
                expected,
                found,
            } => match found {
                Some(found) => write!(
                    f,
                    "project {project_id} positions are not dense: expected {expected}, found {found}"
                ),
                None => write!(
                    f,
                    "project {project_id} positions are not dense: expected {expected}, found detached task"
                ),
            },
            Self::InvalidData(message) => write!(f, "invalid persisted task data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

pub(crate) fn parse_task_row(row: &Row<'_>) -> RepoResult<Task> {
    let id_text: String = row.get("id")?;
    let project_text: String = row.get("project_id")?;
    let id = parse_uuid(&id_text, "tasks.id")?;

    let position = row.get::<_, Option<i64>>("position")?.ok_or_else(|| {
        RepoError::InvalidData(format!("task {id_text} has no position in tasks.position"))
    })?;
    if position < 1 {
        return Err(RepoError::InvalidData(format!(
            "invalid position `{position}` in tasks.position"
        )));
    }

    Ok(Task {
        id,
        project_id: parse_uuid(&project_text, "tasks.project_id")?,
        name: row.get("name")?,
        deadline: row.get("deadline")?,
        done: parse_bool(row.get("done")?, "tasks.done")?,
        position,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn parse_bool(value: i64, column: &'static str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
