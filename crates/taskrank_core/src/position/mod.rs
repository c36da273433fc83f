//! Task position management.
//!
//! # Responsibility
//! - Plan the minimal contiguous shift for insert, move and remove.
//! - Serialize position-mutating operations per project scope.
//!
//! # Invariants
//! - Planning is pure: it reads one snapshot and never touches storage.
//! - A plan shifts at most one contiguous interval by exactly one.
//! - Out-of-range targets are rejected, never clamped.

pub mod guard;
pub mod manager;

pub use guard::{ScopeGuard, ScopeLockTimeout};
pub use manager::{
    apply_plan, check_dense, plan_insert_at, plan_remove, PositionError, PositionPlan,
    PositionShift, PositionWriter, ScopeEntry,
};
