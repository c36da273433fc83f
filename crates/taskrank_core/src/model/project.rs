//! Project domain model.
//!
//! A project is the scope key for task ordering: positions are unique only
//! among tasks sharing one project.

use crate::model::task::{normalize_name, TaskValidationError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable project identifier; doubles as the ordering scope key.
pub type ProjectId = Uuid;

/// Persisted project read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms update timestamp.
    pub updated_at: i64,
}

/// Normalizes a project name with the same rules as task names.
pub fn normalize_project_name(value: &str) -> Result<String, TaskValidationError> {
    normalize_name(value)
}
