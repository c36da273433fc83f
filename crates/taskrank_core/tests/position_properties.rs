//! Property tests: random operation sequences against a `Vec` model.

use proptest::prelude::*;
use std::sync::Arc;
use taskrank_core::db::open_db_in_memory;
use taskrank_core::{NewTask, ScopeGuard, TaskId, TaskService};

#[derive(Debug, Clone)]
enum Op {
    /// Create with `slot` mapped into `0..=len + 2`; `None` appends.
    Create(Option<usize>),
    /// Move the task at `pick % len` to `slot` mapped into `0..=len + 1`.
    Move(usize, usize),
    Delete(usize),
    Toggle(usize),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => proptest::option::of(0usize..64).prop_map(Op::Create),
        3 => (0usize..64, 0usize..64).prop_map(|(pick, slot)| Op::Move(pick, slot)),
        1 => (0usize..64).prop_map(Op::Delete),
        1 => (0usize..64).prop_map(Op::Toggle),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn positions_match_vec_model(ops in prop::collection::vec(arb_op(), 1..40)) {
        let conn = open_db_in_memory().unwrap();
        let service = TaskService::try_new(&conn, Arc::new(ScopeGuard::default())).unwrap();
        let project_id = service.create_project("Model").unwrap().id;
        let mut model: Vec<TaskId> = Vec::new();

        for (step, op) in ops.into_iter().enumerate() {
            match op {
                Op::Create(slot) => {
                    let request = NewTask::new(project_id, format!("t{step}"));
                    let target = slot.map(|slot| (slot % (model.len() + 3)) as i64);
                    let request = match target {
                        Some(target) => request.at_position(target),
                        None => request,
                    };
                    let result = service.create_task(request);
                    match target {
                        Some(target) if target < 1 || target > model.len() as i64 + 1 => {
                            prop_assert!(result.unwrap_err().is_validation());
                        }
                        Some(target) => model.insert(target as usize - 1, result.unwrap().id),
                        None => model.push(result.unwrap().id),
                    }
                }
                Op::Move(pick, slot) if !model.is_empty() => {
                    let id = model[pick % model.len()];
                    let target = (slot % (model.len() + 2)) as i64;
                    let result = service.move_task(id, target);
                    if target < 1 || target > model.len() as i64 {
                        prop_assert!(result.unwrap_err().is_validation());
                    } else {
                        prop_assert_eq!(result.unwrap().position, target);
                        model.retain(|other| *other != id);
                        model.insert(target as usize - 1, id);
                    }
                }
                Op::Delete(pick) if !model.is_empty() => {
                    let id = model.remove(pick % model.len());
                    service.delete_task(id).unwrap();
                }
                Op::Toggle(pick) if !model.is_empty() => {
                    let id = model[pick % model.len()];
                    let before = service.get_task(id).unwrap().position;
                    let toggled = service.toggle_done(id, true).unwrap();
                    prop_assert_eq!(toggled.position, before);
                }
                _ => {}
            }

            let listed = service.list_tasks(project_id).unwrap();
            let ids = listed.iter().map(|task| task.id).collect::<Vec<_>>();
            let positions = listed.iter().map(|task| task.position).collect::<Vec<_>>();
            prop_assert_eq!(&ids, &model);
            prop_assert_eq!(positions, (1..=model.len() as i64).collect::<Vec<_>>());
        }
    }
}
