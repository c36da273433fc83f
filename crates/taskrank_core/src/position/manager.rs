//! Position planner for one project scope.
//!
//! # Responsibility
//! - Turn a scope snapshot plus a requested change into a `PositionPlan`.
//! - Apply a plan through a `PositionWriter` without extra reads.
//!
//! # Invariants
//! - Snapshots passed to the planner must already be dense (`1..=N`);
//!   anything else is reported as `CorruptScope` and never repaired here.
//! - `PositionPlan::Unchanged` performs zero writes.
//! - Write cost is bounded by the shifted interval, not the scope size.

use crate::model::project::ProjectId;
use crate::model::task::{Task, TaskId};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One task slot in a scope snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeEntry {
    pub task_id: TaskId,
    pub position: i64,
}

impl From<&Task> for ScopeEntry {
    fn from(task: &Task) -> Self {
        Self {
            task_id: task.id,
            position: task.position,
        }
    }
}

/// Inclusive interval `[from, to]` of positions moved by `delta`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionShift {
    pub from: i64,
    pub to: i64,
    /// Always `+1` or `-1`.
    pub delta: i64,
}

impl PositionShift {
    fn up(from: i64, to: i64) -> Option<Self> {
        Self::new(from, to, 1)
    }

    fn down(from: i64, to: i64) -> Option<Self> {
        Self::new(from, to, -1)
    }

    fn new(from: i64, to: i64, delta: i64) -> Option<Self> {
        (from <= to).then_some(Self { from, to, delta })
    }

    /// Number of sibling rows this shift rewrites; 0 for an inverted range.
    pub fn rows(&self) -> usize {
        usize::try_from(self.to - self.from + 1).unwrap_or(0)
    }

    pub fn contains(&self, position: i64) -> bool {
        (self.from..=self.to).contains(&position)
    }
}

/// Position changes computed for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionPlan {
    /// Target equals the current position.
    Unchanged { task_id: TaskId, position: i64 },
    /// Task enters the scope at `target`.
    Insert {
        task_id: TaskId,
        target: i64,
        shift: Option<PositionShift>,
    },
    /// Task relocates inside the scope.
    Move {
        task_id: TaskId,
        from: i64,
        target: i64,
        shift: PositionShift,
    },
    /// Task leaves the scope; higher siblings close the gap.
    Remove {
        task_id: TaskId,
        from: i64,
        shift: Option<PositionShift>,
    },
}

impl PositionPlan {
    pub fn task_id(&self) -> TaskId {
        match self {
            Self::Unchanged { task_id, .. }
            | Self::Insert { task_id, .. }
            | Self::Move { task_id, .. }
            | Self::Remove { task_id, .. } => *task_id,
        }
    }

    /// Final position of the planned task; `None` after removal.
    pub fn target(&self) -> Option<i64> {
        match self {
            Self::Unchanged { position, .. } => Some(*position),
            Self::Insert { target, .. } | Self::Move { target, .. } => Some(*target),
            Self::Remove { .. } => None,
        }
    }

    pub fn shift(&self) -> Option<PositionShift> {
        match self {
            Self::Unchanged { .. } => None,
            Self::Insert { shift, .. } | Self::Remove { shift, .. } => *shift,
            Self::Move { shift, .. } => Some(*shift),
        }
    }

    /// Short operation label used in log events.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unchanged { .. } => "unchanged",
            Self::Insert { .. } => "insert",
            Self::Move { .. } => "move",
            Self::Remove { .. } => "remove",
        }
    }
}

/// Planner failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionError {
    /// Target outside `[1, max]`, where `max = N + 1` over the other siblings.
    OutOfRange { target: i64, max: i64 },
    /// Task to remove is not part of the snapshot.
    TaskNotInScope(TaskId),
    /// Snapshot breaks density: slot `index` holds `found` instead of `expected`.
    CorruptScope {
        index: usize,
        expected: i64,
        found: i64,
    },
}

impl Display for PositionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfRange { target, max } => {
                write!(f, "position {target} is out of range 1..={max}")
            }
            Self::TaskNotInScope(id) => write!(f, "task is not in scope: {id}"),
            Self::CorruptScope {
                index,
                expected,
                found,
            } => write!(
                f,
                "scope positions are not dense: slot {index} holds {found}, expected {expected}"
            ),
        }
    }
}

impl Error for PositionError {}

/// Storage operations needed to carry out a plan.
///
/// Implementations run inside one atomic unit; the caller commits or
/// rolls back after `apply_plan` returns.
pub trait PositionWriter {
    type Error;

    /// Clears the task's position so its slot can be reused.
    fn detach(&self, task_id: TaskId) -> Result<(), Self::Error>;
    /// Moves every sibling in `shift` by `shift.delta`; returns rows changed.
    fn shift(&self, project_id: ProjectId, shift: PositionShift) -> Result<usize, Self::Error>;
    /// Places a detached task at `position`.
    fn assign(&self, task_id: TaskId, position: i64) -> Result<(), Self::Error>;
}

/// Verifies that an ascending snapshot holds exactly `1..=N`.
pub fn check_dense(scope: &[ScopeEntry]) -> Result<(), PositionError> {
    for (index, entry) in scope.iter().enumerate() {
        let expected = index as i64 + 1;
        if entry.position != expected {
            return Err(PositionError::CorruptScope {
                index,
                expected,
                found: entry.position,
            });
        }
    }
    Ok(())
}

/// Plans placing `task_id` at `target` within `scope`.
///
/// `scope` is the ascending snapshot of the project. When it already
/// contains `task_id` the plan is a move (or `Unchanged`); otherwise it is
/// an insertion of a new task.
pub fn plan_insert_at(
    scope: &[ScopeEntry],
    task_id: TaskId,
    target: i64,
) -> Result<PositionPlan, PositionError> {
    check_dense(scope)?;

    let current = scope.iter().find(|entry| entry.task_id == task_id);
    let others = scope.len() as i64 - i64::from(current.is_some());
    let max = others + 1;
    if !(1..=max).contains(&target) {
        return Err(PositionError::OutOfRange { target, max });
    }

    let Some(current) = current else {
        return Ok(PositionPlan::Insert {
            task_id,
            target,
            shift: PositionShift::up(target, others),
        });
    };

    let from = current.position;
    let shift = if target > from {
        PositionShift::down(from + 1, target)
    } else if target < from {
        PositionShift::up(target, from - 1)
    } else {
        None
    };

    Ok(match shift {
        Some(shift) => PositionPlan::Move {
            task_id,
            from,
            target,
            shift,
        },
        None => PositionPlan::Unchanged {
            task_id,
            position: from,
        },
    })
}

/// Plans removing `task_id` from `scope` and compacting higher positions.
pub fn plan_remove(scope: &[ScopeEntry], task_id: TaskId) -> Result<PositionPlan, PositionError> {
    check_dense(scope)?;

    let current = scope
        .iter()
        .find(|entry| entry.task_id == task_id)
        .ok_or(PositionError::TaskNotInScope(task_id))?;

    Ok(PositionPlan::Remove {
        task_id,
        from: current.position,
        shift: PositionShift::down(current.position + 1, scope.len() as i64),
    })
}

/// Executes `plan` against `writer`.
///
/// For `Insert` the task row must already exist in detached form. For
/// `Remove` the task is left detached; deleting the row is up to the caller.
pub fn apply_plan<W: PositionWriter>(
    writer: &W,
    project_id: ProjectId,
    plan: &PositionPlan,
) -> Result<(), W::Error> {
    match *plan {
        PositionPlan::Unchanged { .. } => {}
        PositionPlan::Insert {
            task_id,
            target,
            shift,
        } => {
            if let Some(shift) = shift {
                writer.shift(project_id, shift)?;
            }
            writer.assign(task_id, target)?;
        }
        PositionPlan::Move {
            task_id,
            target,
            shift,
            ..
        } => {
            writer.detach(task_id)?;
            writer.shift(project_id, shift)?;
            writer.assign(task_id, target)?;
        }
        PositionPlan::Remove { task_id, shift, .. } => {
            writer.detach(task_id)?;
            if let Some(shift) = shift {
                writer.shift(project_id, shift)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{
        apply_plan, check_dense, plan_insert_at, plan_remove, PositionError, PositionPlan,
        PositionShift, PositionWriter, ScopeEntry,
    };
    use crate::model::project::ProjectId;
    use crate::model::task::TaskId;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use uuid::Uuid;

    /// In-memory writer that applies plans to a map and records every call.
    struct MapWriter {
        positions: RefCell<HashMap<TaskId, Option<i64>>>,
        calls: RefCell<Vec<&'static str>>,
    }

    impl MapWriter {
        fn from_scope(scope: &[ScopeEntry]) -> Self {
            Self {
                positions: RefCell::new(
                    scope
                        .iter()
                        .map(|entry| (entry.task_id, Some(entry.position)))
                        .collect(),
                ),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn add_detached(&self, task_id: TaskId) {
            self.positions.borrow_mut().insert(task_id, None);
        }

        fn snapshot(&self) -> Vec<ScopeEntry> {
            let mut entries = self
                .positions
                .borrow()
                .iter()
                .filter_map(|(task_id, position)| {
                    position.map(|position| ScopeEntry {
                        task_id: *task_id,
                        position,
                    })
                })
                .collect::<Vec<_>>();
            entries.sort_by_key(|entry| entry.position);
            entries
        }
    }

    impl PositionWriter for MapWriter {
        type Error = ();

        fn detach(&self, task_id: TaskId) -> Result<(), ()> {
            self.calls.borrow_mut().push("detach");
            self.positions.borrow_mut().insert(task_id, None);
            Ok(())
        }

        fn shift(&self, _project_id: ProjectId, shift: PositionShift) -> Result<usize, ()> {
            self.calls.borrow_mut().push("shift");
            let mut changed = 0;
            for position in self.positions.borrow_mut().values_mut().flatten() {
                if shift.contains(*position) {
                    *position += shift.delta;
                    changed += 1;
                }
            }
            Ok(changed)
        }

        fn assign(&self, task_id: TaskId, position: i64) -> Result<(), ()> {
            self.calls.borrow_mut().push("assign");
            self.positions.borrow_mut().insert(task_id, Some(position));
            Ok(())
        }
    }

    fn scope_of(len: usize) -> Vec<ScopeEntry> {
        (1..=len as i64)
            .map(|position| ScopeEntry {
                task_id: Uuid::new_v4(),
                position,
            })
            .collect()
    }

    fn order(entries: &[ScopeEntry]) -> Vec<TaskId> {
        entries.iter().map(|entry| entry.task_id).collect()
    }

    #[test]
    fn insert_into_middle_shifts_tail_up() {
        let scope = scope_of(3);
        let new_id = Uuid::new_v4();

        let plan = plan_insert_at(&scope, new_id, 2).expect("valid insert");
        assert_eq!(
            plan,
            PositionPlan::Insert {
                task_id: new_id,
                target: 2,
                shift: Some(PositionShift {
                    from: 2,
                    to: 3,
                    delta: 1
                }),
            }
        );

        let writer = MapWriter::from_scope(&scope);
        writer.add_detached(new_id);
        apply_plan(&writer, Uuid::new_v4(), &plan).unwrap();
        assert_eq!(
            order(&writer.snapshot()),
            vec![scope[0].task_id, new_id, scope[1].task_id, scope[2].task_id]
        );
    }

    #[test]
    fn append_has_no_shift() {
        let scope = scope_of(2);
        let plan = plan_insert_at(&scope, Uuid::new_v4(), 3).expect("append");
        assert_eq!(plan.shift(), None);
        assert_eq!(plan.target(), Some(3));
    }

    #[test]
    fn insert_into_empty_scope_accepts_only_one() {
        let id = Uuid::new_v4();
        assert!(plan_insert_at(&[], id, 1).is_ok());
        assert_eq!(
            plan_insert_at(&[], id, 2),
            Err(PositionError::OutOfRange { target: 2, max: 1 })
        );
    }

    #[test]
    fn forward_move_shifts_interval_down() {
        let scope = scope_of(5);
        let moved = scope[1].task_id;

        let plan = plan_insert_at(&scope, moved, 4).expect("forward move");
        assert_eq!(
            plan,
            PositionPlan::Move {
                task_id: moved,
                from: 2,
                target: 4,
                shift: PositionShift {
                    from: 3,
                    to: 4,
                    delta: -1
                },
            }
        );

        let writer = MapWriter::from_scope(&scope);
        apply_plan(&writer, Uuid::new_v4(), &plan).unwrap();
        assert_eq!(
            order(&writer.snapshot()),
            vec![
                scope[0].task_id,
                scope[2].task_id,
                scope[3].task_id,
                moved,
                scope[4].task_id
            ]
        );
    }

    #[test]
    fn backward_move_shifts_interval_up() {
        let scope = scope_of(3);
        let moved = scope[2].task_id;

        let plan = plan_insert_at(&scope, moved, 1).expect("backward move");
        assert_eq!(
            plan.shift(),
            Some(PositionShift {
                from: 1,
                to: 2,
                delta: 1
            })
        );

        let writer = MapWriter::from_scope(&scope);
        apply_plan(&writer, Uuid::new_v4(), &plan).unwrap();
        assert_eq!(
            order(&writer.snapshot()),
            vec![moved, scope[0].task_id, scope[1].task_id]
        );
    }

    #[test]
    fn moving_to_current_position_writes_nothing() {
        let scope = scope_of(3);
        let plan = plan_insert_at(&scope, scope[1].task_id, 2).expect("no-op move");
        assert!(matches!(plan, PositionPlan::Unchanged { position: 2, .. }));

        let writer = MapWriter::from_scope(&scope);
        apply_plan(&writer, Uuid::new_v4(), &plan).unwrap();
        assert!(writer.calls.borrow().is_empty());
    }

    #[test]
    fn range_excludes_the_moved_task_itself() {
        let scope = scope_of(3);
        let existing = scope[0].task_id;

        assert!(plan_insert_at(&scope, existing, 3).is_ok());
        assert_eq!(
            plan_insert_at(&scope, existing, 4),
            Err(PositionError::OutOfRange { target: 4, max: 3 })
        );
        assert_eq!(
            plan_insert_at(&scope, Uuid::new_v4(), 5),
            Err(PositionError::OutOfRange { target: 5, max: 4 })
        );
        assert_eq!(
            plan_insert_at(&scope, Uuid::new_v4(), 0),
            Err(PositionError::OutOfRange { target: 0, max: 4 })
        );
    }

    #[test]
    fn remove_compacts_higher_positions() {
        let scope = scope_of(4);
        let removed = scope[1].task_id;

        let plan = plan_remove(&scope, removed).expect("remove");
        assert_eq!(
            plan.shift(),
            Some(PositionShift {
                from: 3,
                to: 4,
                delta: -1
            })
        );
        assert_eq!(plan.target(), None);

        let writer = MapWriter::from_scope(&scope);
        apply_plan(&writer, Uuid::new_v4(), &plan).unwrap();
        let remaining = writer.snapshot();
        check_dense(&remaining).expect("compacted scope is dense");
        assert_eq!(
            order(&remaining),
            vec![scope[0].task_id, scope[2].task_id, scope[3].task_id]
        );
    }

    #[test]
    fn removing_last_task_has_no_shift() {
        let scope = scope_of(2);
        let plan = plan_remove(&scope, scope[1].task_id).unwrap();
        assert_eq!(plan.shift(), None);
    }

    #[test]
    fn remove_rejects_unknown_task() {
        let scope = scope_of(2);
        let stranger = Uuid::new_v4();
        assert_eq!(
            plan_remove(&scope, stranger),
            Err(PositionError::TaskNotInScope(stranger))
        );
    }

    #[test]
    fn corrupt_snapshot_is_reported_not_repaired() {
        let mut scope = scope_of(3);
        scope[2].position = 4;
        assert_eq!(
            plan_insert_at(&scope, Uuid::new_v4(), 1),
            Err(PositionError::CorruptScope {
                index: 2,
                expected: 3,
                found: 4
            })
        );
        assert!(matches!(
            plan_remove(&scope, scope[0].task_id),
            Err(PositionError::CorruptScope { .. })
        ));
    }

    #[test]
    fn shift_rows_match_interval() {
        let shift = PositionShift {
            from: 2,
            to: 5,
            delta: 1,
        };
        assert_eq!(shift.rows(), 4);
        let inverted = PositionShift {
            from: 5,
            to: 2,
            delta: 1,
        };
        assert_eq!(inverted.rows(), 0);
        assert!(shift.contains(2) && shift.contains(5));
        assert!(!shift.contains(1) && !shift.contains(6));
    }
}
