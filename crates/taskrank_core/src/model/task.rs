//! Task domain model.
//!
//! # Responsibility
//! - Define the task read model and the typed create/patch inputs.
//! - Validate names before persistence.
//!
//! # Invariants
//! - `position` is a 1-based rank; within one project the positions of all
//!   tasks are exactly `1..=N`.
//! - `done` is completion state only and never influences `position`.

use crate::model::project::ProjectId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable task identifier.
pub type TaskId = Uuid;

/// Maximum task/project name length in characters after trimming.
pub const MAX_NAME_CHARS: usize = 255;

/// Persisted task read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub name: String,
    /// Unix epoch milliseconds.
    pub deadline: Option<i64>,
    pub done: bool,
    /// 1-based rank within `project_id`.
    pub position: i64,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms update timestamp.
    pub updated_at: i64,
}

/// Input for task creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub project_id: ProjectId,
    pub name: String,
    pub deadline: Option<i64>,
    /// Requested 1-based position; `None` appends at `N + 1`.
    pub position: Option<i64>,
}

impl NewTask {
    /// Creates an append-at-end request with no deadline.
    pub fn new(project_id: ProjectId, name: impl Into<String>) -> Self {
        Self {
            project_id,
            name: name.into(),
            deadline: None,
            position: None,
        }
    }

    pub fn with_deadline(mut self, deadline: i64) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn at_position(mut self, position: i64) -> Self {
        self.position = Some(position);
        self
    }
}

/// Partial update for one task.
///
/// `deadline: Some(None)` clears the deadline; `None` leaves it unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    pub name: Option<String>,
    pub deadline: Option<Option<i64>>,
    pub position: Option<i64>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.deadline.is_none() && self.position.is_none()
    }
}

/// Field-level validation failures for task and project input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskValidationError {
    BlankName,
    NameTooLong { max_chars: usize, actual_chars: usize },
}

impl Display for TaskValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "name must not be blank"),
            Self::NameTooLong {
                max_chars,
                actual_chars,
            } => write!(
                f,
                "name must be at most {max_chars} characters, got {actual_chars}"
            ),
        }
    }
}

impl Error for TaskValidationError {}

/// Trims `value` and enforces non-blank, bounded-length names.
pub fn normalize_name(value: &str) -> Result<String, TaskValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TaskValidationError::BlankName);
    }
    let actual_chars = trimmed.chars().count();
    if actual_chars > MAX_NAME_CHARS {
        return Err(TaskValidationError::NameTooLong {
            max_chars: MAX_NAME_CHARS,
            actual_chars,
        });
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::{normalize_name, NewTask, TaskPatch, TaskValidationError, MAX_NAME_CHARS};
    use uuid::Uuid;

    #[test]
    fn normalize_name_trims_and_rejects_blank() {
        assert_eq!(normalize_name("  Write docs ").unwrap(), "Write docs");
        assert_eq!(normalize_name(" \t\n"), Err(TaskValidationError::BlankName));
    }

    #[test]
    fn normalize_name_counts_chars_not_bytes() {
        let at_limit = "é".repeat(MAX_NAME_CHARS);
        assert!(normalize_name(&at_limit).is_ok());

        let over = "x".repeat(MAX_NAME_CHARS + 1);
        assert_eq!(
            normalize_name(&over),
            Err(TaskValidationError::NameTooLong {
                max_chars: MAX_NAME_CHARS,
                actual_chars: MAX_NAME_CHARS + 1,
            })
        );
    }

    #[test]
    fn new_task_defaults_to_append() {
        let request = NewTask::new(Uuid::new_v4(), "A");
        assert_eq!(request.position, None);
        assert_eq!(request.deadline, None);

        let request = request.at_position(2).with_deadline(1_700_000_000_000);
        assert_eq!(request.position, Some(2));
        assert_eq!(request.deadline, Some(1_700_000_000_000));
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(TaskPatch::default().is_empty());
        let patch = TaskPatch {
            deadline: Some(None),
            ..TaskPatch::default()
        };
        assert!(!patch.is_empty());
    }
}
