//! Core domain logic for ordered project tasks.
//! This crate is the single source of truth for task ordering invariants.

pub mod access;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod position;
pub mod repo;
pub mod service;

pub use access::{
    authorize, parse_project_role, AccessError, Permission, ProjectRole, TaskOperation,
};
pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, init_logging_from, logging_status};
pub use model::project::{Project, ProjectId};
pub use model::task::{NewTask, Task, TaskId, TaskPatch, TaskValidationError};
pub use position::{PositionError, PositionPlan, PositionShift, ScopeGuard, ScopeLockTimeout};
pub use repo::project_repo::{ProjectRepository, SqliteProjectRepository};
pub use repo::task_repo::{SqliteTaskRepository, TaskRepository};
pub use repo::{RepoError, RepoResult};
pub use service::task_service::{TaskService, TaskServiceError};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
