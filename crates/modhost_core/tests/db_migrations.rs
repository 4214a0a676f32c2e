use modhost_core::db::migrations::latest_version;
use modhost_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "module_manifests");
    assert_table_exists(&conn, "module_configurations");
    assert_table_exists(&conn, "module_migrations");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("modhost.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "module_migrations");
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
fn ledger_rejects_unknown_module_and_duplicate_versions() {
    let conn = open_db_in_memory().unwrap();

    let orphan = conn.execute(
        "INSERT INTO module_migrations (id, module_id, version, description, applied_at, seq)
         VALUES ('a', 'ghost', '1', 'x', 0, 1);",
        [],
    );
    assert!(orphan.is_err(), "foreign keys must be enforced");

    conn.execute(
        "INSERT INTO module_manifests (
            id, name, version, description, author, requires, permissions,
            is_enabled, install_date, update_date
        ) VALUES ('m', 'M', '1', '', '', '[]', '[]', 0, 0, 0);",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO module_migrations (id, module_id, version, description, applied_at, seq)
         VALUES ('a', 'm', '1', 'x', 0, 1);",
        [],
    )
    .unwrap();
    let duplicate = conn.execute(
        "INSERT INTO module_migrations (id, module_id, version, description, applied_at, seq)
         VALUES ('b', 'm', '1', 'x', 0, 2);",
        [],
    );
    assert!(duplicate.is_err(), "(module_id, version) must be unique");
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
