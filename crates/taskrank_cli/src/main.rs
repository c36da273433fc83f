//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `taskrank_core` linkage and storage bootstrap.
//! - Walk one project through create/move/delete/toggle and print the
//!   resulting order after each step.
//!
//! Usage: `taskrank_cli [config.json]`. Without a config the walkthrough
//! runs against an in-memory database.

use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;
use taskrank_core::db::open_db_with;
use taskrank_core::{init_logging_from, CoreConfig, NewTask, ScopeGuard, Task, TaskService};

fn main() -> ExitCode {
    println!("taskrank_core ping={}", taskrank_core::ping());
    println!("taskrank_core version={}", taskrank_core::core_version());

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("taskrank_cli failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => CoreConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => CoreConfig::default(),
    };
    init_logging_from(&config)?;

    let conn = open_db_with(&config)?;
    let guard = Arc::new(ScopeGuard::new(config.scope_lock_timeout()));
    let service = TaskService::try_new(&conn, guard)?;

    let project = service.create_project("walkthrough")?;
    let a = service.create_task(NewTask::new(project.id, "A"))?;
    let b = service.create_task(NewTask::new(project.id, "B"))?;
    let c = service.create_task(NewTask::new(project.id, "C"))?;
    print_scope("created", &service.list_tasks(project.id)?);

    service.move_task(c.id, 1)?;
    print_scope("move C to 1", &service.list_tasks(project.id)?);

    service.delete_task(b.id)?;
    print_scope("delete B", &service.list_tasks(project.id)?);

    service.toggle_done(c.id, true)?;
    print_scope("complete C", &service.list_tasks(project.id)?);

    service.create_task(NewTask::new(project.id, "D").at_position(2))?;
    print_scope("insert D at 2", &service.list_tasks(project.id)?);

    match service.move_task(a.id, 5) {
        Err(err) if err.is_validation() => println!("move A to 5 rejected: {err}"),
        other => return Err(format!("expected validation error, got {other:?}").into()),
    }

    Ok(())
}

fn print_scope(step: &str, tasks: &[Task]) {
    let rendered = tasks
        .iter()
        .map(|task| {
            let mark = if task.done { "*" } else { "" };
            format!("{}{}({})", task.name, mark, task.position)
        })
        .collect::<Vec<_>>()
        .join(" ");
    println!("{step:<14} {rendered}");
}
