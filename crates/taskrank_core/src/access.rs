//! Project access roles and per-operation permission checks.
//!
//! # Responsibility
//! - Map each task/project operation to the permission it requires.
//! - Decide whether a caller's role on a project grants that permission.
//!
//! # Invariants
//! - Checks run at the system boundary before any core service call.
//! - Unknown role strings are rejected, never defaulted.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Caller's role on one project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProjectRole {
    Viewer,
    Editor,
    Owner,
}

/// Permission level required by an operation. Ordered weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Permission {
    Read,
    Write,
    Owner,
}

/// Operations exposed to the boundary layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskOperation {
    ListTasks,
    ShowTask,
    CreateTask,
    UpdateTask,
    MoveTask,
    DeleteTask,
    ToggleDone,
    ListProjects,
    CreateProject,
    ShowProject,
    RenameProject,
    DeleteProject,
}

/// Role string for viewers.
pub const PROJECT_ROLE_VIEWER: &str = "viewer";
/// Role string for editors.
pub const PROJECT_ROLE_EDITOR: &str = "editor";
/// Role string for owners.
pub const PROJECT_ROLE_OWNER: &str = "owner";

impl ProjectRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Viewer => PROJECT_ROLE_VIEWER,
            Self::Editor => PROJECT_ROLE_EDITOR,
            Self::Owner => PROJECT_ROLE_OWNER,
        }
    }

    /// Highest permission this role holds.
    pub fn permission(self) -> Permission {
        match self {
            Self::Viewer => Permission::Read,
            Self::Editor => Permission::Write,
            Self::Owner => Permission::Owner,
        }
    }

    pub fn grants(self, required: Permission) -> bool {
        self.permission() >= required
    }
}

impl TaskOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ListTasks => "list_tasks",
            Self::ShowTask => "show_task",
            Self::CreateTask => "create_task",
            Self::UpdateTask => "update_task",
            Self::MoveTask => "move_task",
            Self::DeleteTask => "delete_task",
            Self::ToggleDone => "toggle_done",
            Self::ListProjects => "list_projects",
            Self::CreateProject => "create_project",
            Self::ShowProject => "show_project",
            Self::RenameProject => "rename_project",
            Self::DeleteProject => "delete_project",
        }
    }

    pub fn required_permission(self) -> Permission {
        match self {
            Self::ListTasks | Self::ShowTask | Self::ListProjects | Self::ShowProject => {
                Permission::Read
            }
            Self::CreateProject
            | Self::CreateTask
            | Self::UpdateTask
            | Self::MoveTask
            | Self::DeleteTask
            | Self::ToggleDone => Permission::Write,
            Self::RenameProject | Self::DeleteProject => Permission::Owner,
        }
    }
}

/// Parses a role from its stable lowercase string.
pub fn parse_project_role(value: &str) -> Result<ProjectRole, AccessError> {
    let normalized = value.trim();
    if normalized.is_empty() {
        return Err(AccessError::EmptyRole);
    }

    match normalized {
        PROJECT_ROLE_VIEWER => Ok(ProjectRole::Viewer),
        PROJECT_ROLE_EDITOR => Ok(ProjectRole::Editor),
        PROJECT_ROLE_OWNER => Ok(ProjectRole::Owner),
        other => Err(AccessError::UnsupportedRole(other.to_string())),
    }
}

/// Grants or denies `operation` for a caller holding `role`.
pub fn authorize(role: ProjectRole, operation: TaskOperation) -> Result<(), AccessError> {
    if role.grants(operation.required_permission()) {
        Ok(())
    } else {
        Err(AccessError::Denied { role, operation })
    }
}

/// Access check failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    EmptyRole,
    UnsupportedRole(String),
    Denied {
        role: ProjectRole,
        operation: TaskOperation,
    },
}

impl Display for AccessError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyRole => write!(f, "project role must not be empty"),
            Self::UnsupportedRole(value) => write!(f, "project role is unsupported: {value}"),
            Self::Denied { role, operation } => write!(
                f,
                "role `{}` may not perform `{}`",
                role.as_str(),
                operation.as_str()
            ),
        }
    }
}

impl Error for AccessError {}
