//! Domain model for projects and their ordered tasks.
//!
//! # Responsibility
//! - Define canonical records used by positioning and CRUD services.
//! - Validate user-supplied fields before they reach storage.
//!
//! # Invariants
//! - Every task belongs to exactly one project scope for its lifetime.
//! - `Task::position` is only meaningful for persisted tasks.

pub mod project;
pub mod task;
