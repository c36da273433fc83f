use rusqlite::Connection;
use taskrank_core::db::migrations::{ensure_schema_ready, latest_version};
use taskrank_core::db::{open_db, open_db_in_memory, open_db_with, DbError};
use taskrank_core::{CoreConfig, SqliteTaskRepository};

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "projects");
    assert_table_exists(&conn, "tasks");
    ensure_schema_ready(&conn).unwrap();
}

#[test]
fn tasks_table_has_position_columns_and_unique_index() {
    let conn = open_db_in_memory().unwrap();

    let mut stmt = conn.prepare("PRAGMA table_info(tasks);").unwrap();
    let mut rows = stmt.query([]).unwrap();
    let mut columns = Vec::new();
    while let Some(row) = rows.next().unwrap() {
        let column_name: String = row.get(1).unwrap();
        columns.push(column_name);
    }
    for expected in ["id", "project_id", "name", "deadline", "done", "position"] {
        assert!(columns.contains(&expected.to_string()), "missing {expected}");
    }

    let unique: i64 = conn
        .query_row(
            "SELECT \"unique\" FROM pragma_index_list('tasks') WHERE name = 'tasks_project_position';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(unique, 1);
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("taskrank.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "tasks");
}

#[test]
fn open_db_with_config_uses_file_path() {
    let dir = tempfile::tempdir().unwrap();
    let config = CoreConfig {
        db_path: Some(dir.path().join("configured.db")),
        ..CoreConfig::default()
    };

    let conn = open_db_with(&config).unwrap();
    assert_eq!(schema_version(&conn), latest_version());
    assert!(dir.path().join("configured.db").exists());
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn repositories_reject_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();

    let err = SqliteTaskRepository::try_new(&conn).err().unwrap();
    assert!(err.to_string().contains("schema version"));
}

#[test]
fn schema_check_reports_missing_position_index() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch("DROP INDEX tasks_project_position;")
        .unwrap();

    let err = ensure_schema_ready(&conn).unwrap_err();
    assert!(matches!(
        err,
        DbError::MissingRequiredIndex("tasks_project_position")
    ));
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
