//! Task and project use-case service.
//!
//! # Responsibility
//! - Expose create/read/update/delete, completion and reorder operations.
//! - Run every position-mutating operation as one guarded, atomic unit:
//!   scope lock, `BEGIN IMMEDIATE`, snapshot, plan, write, density check,
//!   commit.
//!
//! # Invariants
//! - After every committed mutation a project's positions are `1..=N`.
//! - `toggle_done` and field-only updates never touch `position` and never
//!   take the scope lock.
//! - A density breach aborts the transaction and is reported as
//!   `InvariantViolation`; it is never renumbered away.

use crate::model::project::{normalize_project_name, Project, ProjectId};
use crate::model::task::{normalize_name, NewTask, Task, TaskId, TaskPatch, TaskValidationError};
use crate::position::{
    apply_plan, plan_insert_at, plan_remove, PositionError, PositionPlan, ScopeEntry,
    ScopeGuard,
};
use crate::repo::position_store::PositionStore;
use crate::repo::project_repo::{ProjectRepository, SqliteProjectRepository};
use crate::repo::scope_resolver::{ensure_project_exists, scope_entries, siblings};
use crate::repo::task_repo::{SqliteTaskRepository, TaskRepository};
use crate::repo::RepoError;
use log::{error, info, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Errors surfaced by task service operations.
#[derive(Debug)]
pub enum TaskServiceError {
    /// Field input rejected before any write.
    InvalidField(TaskValidationError),
    /// Requested position outside `1..=max`; nothing was written.
    PositionOutOfRange { target: i64, max: i64 },
    ProjectNotFound(ProjectId),
    TaskNotFound(TaskId),
    /// The scope or database stayed locked; retry the whole operation.
    ConcurrencyConflict { project_id: Option<ProjectId> },
    /// Scope positions were not `1..=N`; the operation was rolled back.
    InvariantViolation { project_id: ProjectId, detail: String },
    /// Repository-level failure.
    Repo(RepoError),
}

impl TaskServiceError {
    /// Validation failures: bad field input or out-of-range position.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidField(_) | Self::PositionOutOfRange { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ProjectNotFound(_) | Self::TaskNotFound(_))
    }

    /// Only concurrency conflicts may be retried with identical input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict { .. })
    }
}

impl Display for TaskServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidField(err) => write!(f, "{err}"),
            Self::PositionOutOfRange { target, max } => {
                write!(f, "position {target} is out of range 1..={max}")
            }
            Self::ProjectNotFound(id) => write!(f, "project not found: {id}"),
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::ConcurrencyConflict {
                project_id: Some(project_id),
            } => write!(f, "concurrent update conflict on project {project_id}"),
            Self::ConcurrencyConflict { project_id: None } => {
                write!(f, "concurrent update conflict")
            }
            Self::InvariantViolation { project_id, detail } => write!(
                f,
                "position invariant violated in project {project_id}: {detail}"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TaskServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidField(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TaskValidationError> for TaskServiceError {
    fn from(value: TaskValidationError) -> Self {
        Self::InvalidField(value)
    }
}

impl From<RepoError> for TaskServiceError {
    fn from(value: RepoError) -> Self {
        if value.is_busy() {
            return Self::ConcurrencyConflict { project_id: None };
        }
        if let RepoError::ScopeNotDense { project_id, .. } = &value {
            return Self::InvariantViolation {
                project_id: *project_id,
                detail: value.to_string(),
            };
        }
        match value {
            RepoError::ProjectNotFound(id) => Self::ProjectNotFound(id),
            RepoError::TaskNotFound(id) => Self::TaskNotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<rusqlite::Error> for TaskServiceError {
    fn from(value: rusqlite::Error) -> Self {
        RepoError::from(value).into()
    }
}

/// Task service facade over one SQLite connection.
///
/// Share one `ScopeGuard` between every service in the process; give each
/// thread its own connection to the same database file.
pub struct TaskService<'conn> {
    conn: &'conn Connection,
    projects: SqliteProjectRepository<'conn>,
    tasks: SqliteTaskRepository<'conn>,
    guard: Arc<ScopeGuard>,
}

impl<'conn> TaskService<'conn> {
    /// Creates service from a migrated connection and a shared scope guard.
    pub fn try_new(
        conn: &'conn Connection,
        guard: Arc<ScopeGuard>,
    ) -> Result<Self, TaskServiceError> {
        Ok(Self {
            conn,
            projects: SqliteProjectRepository::try_new(conn)?,
            tasks: SqliteTaskRepository::try_new(conn)?,
            guard,
        })
    }

    pub fn guard(&self) -> &Arc<ScopeGuard> {
        &self.guard
    }

    /// Creates an empty project scope.
    pub fn create_project(&self, name: &str) -> Result<Project, TaskServiceError> {
        let name = normalize_project_name(name)?;
        let project = self.projects.create_project(&name)?;
        info!(
            "event=project_create module=service status=ok project_id={}",
            project.id
        );
        Ok(project)
    }

    pub fn get_project(&self, id: ProjectId) -> Result<Project, TaskServiceError> {
        self.projects
            .get_project(id)?
            .ok_or(TaskServiceError::ProjectNotFound(id))
    }

    pub fn list_projects(&self) -> Result<Vec<Project>, TaskServiceError> {
        Ok(self.projects.list_projects()?)
    }

    pub fn rename_project(&self, id: ProjectId, name: &str) -> Result<Project, TaskServiceError> {
        let name = normalize_project_name(name)?;
        self.projects.rename_project(id, &name)?;
        self.get_project(id)
    }

    /// Deletes a project and all of its tasks.
    ///
    /// Waits for in-flight mutations on the scope before deleting.
    pub fn delete_project(&self, id: ProjectId) -> Result<(), TaskServiceError> {
        self.guard
            .with_scope(id, || self.projects.delete_project(id))
            .map_err(|_| TaskServiceError::ConcurrencyConflict {
                project_id: Some(id),
            })??;
        info!("event=project_delete module=service status=ok project_id={id}");
        Ok(())
    }

    /// Creates a task at the requested position, or appends it at `N + 1`.
    pub fn create_task(&self, request: NewTask) -> Result<Task, TaskServiceError> {
        let name = normalize_name(&request.name)?;
        let project_id = request.project_id;
        let task_id = Uuid::new_v4();

        self.write_scope(project_id, "task_create", |store, scope| {
            let target = request.position.unwrap_or(scope.len() as i64 + 1);
            let plan = plan_insert_at(scope, task_id, target)?;
            store.insert_detached(task_id, project_id, &name, request.deadline)?;
            apply_plan(store, project_id, &plan)?;
            Ok(plan)
        })?;

        self.get_task(task_id)
    }

    /// Loads one task.
    pub fn get_task(&self, id: TaskId) -> Result<Task, TaskServiceError> {
        self.tasks
            .get_task(id)?
            .ok_or(TaskServiceError::TaskNotFound(id))
    }

    /// Lists a project's tasks ascending by position.
    ///
    /// Runs in one read transaction so the existence check and the listing
    /// observe the same committed snapshot.
    pub fn list_tasks(&self, project_id: ProjectId) -> Result<Vec<Task>, TaskServiceError> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Deferred)?;
        ensure_project_exists(&tx, project_id)?;
        let tasks = siblings(&tx, project_id)?;
        tx.commit()?;
        Ok(tasks)
    }

    /// Applies a patch. A patch carrying `position` performs a guarded move
    /// in the same transaction as the field changes.
    pub fn update_task(&self, id: TaskId, patch: TaskPatch) -> Result<Task, TaskServiceError> {
        if patch.is_empty() {
            return self.get_task(id);
        }
        let name = patch.name.as_deref().map(normalize_name).transpose()?;
        let current = self.get_task(id)?;

        match patch.position {
            None => {
                if name.is_some() || patch.deadline.is_some() {
                    self.tasks
                        .update_fields(id, name.as_deref(), patch.deadline)?;
                }
            }
            Some(target) => {
                self.write_scope(current.project_id, "task_update", |store, scope| {
                    let plan = plan_insert_at(scope, id, target)
                        .map_err(|err| in_scope_position_error(err, id))?;
                    if name.is_some() || patch.deadline.is_some() {
                        self.tasks
                            .update_fields(id, name.as_deref(), patch.deadline)?;
                    }
                    apply_plan(store, current.project_id, &plan)?;
                    Ok(plan)
                })?;
            }
        }

        self.get_task(id)
    }

    /// Moves a task to `new_position` within its project.
    ///
    /// Moving to the current position succeeds without writing.
    pub fn move_task(&self, id: TaskId, new_position: i64) -> Result<Task, TaskServiceError> {
        let current = self.get_task(id)?;

        self.write_scope(current.project_id, "task_move", |store, scope| {
            let plan = plan_insert_at(scope, id, new_position)
                .map_err(|err| in_scope_position_error(err, id))?;
            apply_plan(store, current.project_id, &plan)?;
            Ok(plan)
        })?;

        self.get_task(id)
    }

    /// Deletes a task and compacts every higher position down by one.
    pub fn delete_task(&self, id: TaskId) -> Result<(), TaskServiceError> {
        let current = self.get_task(id)?;

        self.write_scope(current.project_id, "task_delete", |store, scope| {
            let plan = plan_remove(scope, id).map_err(|err| in_scope_position_error(err, id))?;
            apply_plan(store, current.project_id, &plan)?;
            store.delete_detached(id)?;
            Ok(plan)
        })
    }

    /// Sets completion state. Never reads or writes `position`.
    pub fn toggle_done(&self, id: TaskId, done: bool) -> Result<Task, TaskServiceError> {
        self.tasks.set_done(id, done)?;
        info!("event=task_toggle_done module=service status=ok task_id={id} done={done}");
        self.get_task(id)
    }

    /// Runs `op` as one guarded, atomic unit on `project_id`.
    ///
    /// `op` returns the applied plan for logging. Any error returned before
    /// commit drops the transaction, which rolls back every write made
    /// through `store`.
    fn write_scope(
        &self,
        project_id: ProjectId,
        event: &'static str,
        op: impl FnOnce(
            &PositionStore<'_>,
            &[ScopeEntry],
        ) -> Result<PositionPlan, TaskServiceError>,
    ) -> Result<(), TaskServiceError> {
        let started_at = Instant::now();
        let result = self
            .guard
            .with_scope(project_id, || {
                let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
                ensure_project_exists(&tx, project_id)?;
                let scope = scope_entries(&tx, project_id)?;
                let store = PositionStore::new(&tx);
                let plan = op(&store, &scope)?;
                store.assert_dense(project_id)?;
                tx.commit()?;
                Ok(plan)
            })
            .unwrap_or_else(|timeout| {
                Err(TaskServiceError::ConcurrencyConflict {
                    project_id: Some(timeout.project_id),
                })
            })
            .map_err(|err| scope_error(err, project_id));

        match &result {
            Ok(plan) => info!(
                "event={} module=service status=ok project_id={} task_id={} plan={} rows={} duration_ms={}",
                event,
                project_id,
                plan.task_id(),
                plan.kind(),
                plan.shift().map_or(0, |shift| shift.rows()),
                started_at.elapsed().as_millis()
            ),
            Err(TaskServiceError::InvariantViolation { detail, .. }) => error!(
                "event={} module=service status=invariant_violation project_id={} duration_ms={} error={}",
                event,
                project_id,
                started_at.elapsed().as_millis(),
                detail
            ),
            Err(err) if err.is_retryable() => warn!(
                "event={} module=service status=conflict project_id={} duration_ms={}",
                event,
                project_id,
                started_at.elapsed().as_millis()
            ),
            Err(err) => info!(
                "event={} module=service status=rejected project_id={} duration_ms={} error={}",
                event,
                project_id,
                started_at.elapsed().as_millis(),
                err
            ),
        }

        result.map(|_| ())
    }
}

impl From<PositionError> for TaskServiceError {
    fn from(value: PositionError) -> Self {
        match value {
            PositionError::OutOfRange { target, max } => Self::PositionOutOfRange { target, max },
            PositionError::TaskNotInScope(id) => Self::TaskNotFound(id),
            PositionError::CorruptScope { .. } => Self::Repo(RepoError::InvalidData(
                value.to_string(),
            )),
        }
    }
}

/// Maps planner errors for a task that was looked up before the lock.
///
/// A task missing from the locked snapshot was deleted concurrently.
fn in_scope_position_error(err: PositionError, id: TaskId) -> TaskServiceError {
    match err {
        PositionError::TaskNotInScope(_) => TaskServiceError::TaskNotFound(id),
        other => other.into(),
    }
}

/// Attaches scope context to errors raised inside `write_scope`.
fn scope_error(err: TaskServiceError, project_id: ProjectId) -> TaskServiceError {
    match err {
        TaskServiceError::ConcurrencyConflict { project_id: None } => {
            TaskServiceError::ConcurrencyConflict {
                project_id: Some(project_id),
            }
        }
        TaskServiceError::Repo(RepoError::InvalidData(detail)) => {
            TaskServiceError::InvariantViolation { project_id, detail }
        }
        TaskServiceError::Repo(repo) if repo.is_constraint_violation() => {
            TaskServiceError::InvariantViolation {
                project_id,
                detail: repo.to_string(),
            }
        }
        other => other,
    }
}
