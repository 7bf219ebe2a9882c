//! Migration Schema Tests
//!
//! Applies the cetane migrations to a fresh database and inspects the result
//! with rusqlite.

use std::collections::BTreeMap;

use rusqlite::{Connection, Result as SqliteResult};

use lc0acquire::repository::migrations::run_migrations;

#[derive(Debug, Clone, PartialEq, Eq)]
struct ColumnInfo {
    col_type: String,
    not_null: bool,
    default_value: Option<String>,
    primary_key: bool,
}

/// Extract the columns of one table
fn extract_columns(conn: &Connection, table: &str) -> SqliteResult<BTreeMap<String, ColumnInfo>> {
    let mut pragma = conn.prepare(&format!("PRAGMA table_info(\"{}\")", table))?;
    let rows = pragma.query_map([], |row| {
        Ok((
            row.get::<_, String>(1)?,
            ColumnInfo {
                col_type: row.get::<_, String>(2)?.to_uppercase(),
                not_null: row.get(3)?,
                default_value: row.get(4)?,
                primary_key: row.get::<_, i32>(5)? > 0,
            },
        ))
    })?;
    rows.collect()
}

/// Extract user tables, excluding SQLite internals
fn extract_tables(conn: &Connection) -> SqliteResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    let names = stmt
        .query_map([], |row| row.get(0))?
        .collect::<SqliteResult<Vec<_>>>()?;
    Ok(names)
}

/// Extract index name -> (table, columns)
fn extract_indexes(conn: &Connection) -> SqliteResult<BTreeMap<String, (String, Vec<String>)>> {
    let mut stmt = conn.prepare(
        "SELECT name, tbl_name FROM sqlite_master WHERE type='index' AND sql IS NOT NULL ORDER BY name",
    )?;
    let pairs: Vec<(String, String)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<SqliteResult<Vec<_>>>()?;

    let mut indexes = BTreeMap::new();
    for (name, table) in pairs {
        let mut pragma = conn.prepare(&format!("PRAGMA index_info(\"{}\")", name))?;
        let columns = pragma
            .query_map([], |row| row.get::<_, String>(2))?
            .collect::<SqliteResult<Vec<_>>>()?;
        indexes.insert(name, (table, columns));
    }
    Ok(indexes)
}

async fn migrated_db() -> (tempfile::TempDir, Connection) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("schema.db");
    run_migrations(&path.display().to_string()).await.unwrap();
    let conn = Connection::open(&path).unwrap();
    (dir, conn)
}

#[tokio::test]
async fn test_tables_exist() {
    let (_dir, conn) = migrated_db().await;
    let tables = extract_tables(&conn).unwrap();

    assert!(tables.contains(&"entries".to_string()));
    assert!(tables.contains(&"audit_log".to_string()));
    assert!(tables.contains(&"__cetane_migrations".to_string()));
}

#[tokio::test]
async fn test_entries_columns() {
    let (_dir, conn) = migrated_db().await;
    let columns = extract_columns(&conn, "entries").unwrap();

    let names: Vec<&str> = columns.keys().map(|s| s.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "attempts",
            "created_at",
            "id",
            "occurred_at",
            "processed",
            "source_filename",
            "status"
        ]
    );

    assert!(columns["id"].primary_key);
    assert_eq!(columns["id"].col_type, "INTEGER");
    assert!(columns["occurred_at"].not_null);
    assert_eq!(columns["status"].default_value.as_deref(), Some("'pending'"));
    assert_eq!(columns["attempts"].default_value.as_deref(), Some("0"));
    assert_eq!(columns["processed"].default_value.as_deref(), Some("0"));
}

#[tokio::test]
async fn test_audit_log_columns() {
    let (_dir, conn) = migrated_db().await;
    let columns = extract_columns(&conn, "audit_log").unwrap();

    for name in ["id", "entry_id", "status", "message", "timestamp"] {
        assert!(columns.contains_key(name), "missing column {}", name);
    }
    assert!(columns["id"].primary_key);
    assert!(columns["entry_id"].not_null);
    assert!(columns["timestamp"].not_null);
}

#[tokio::test]
async fn test_lookup_indexes() {
    let (_dir, conn) = migrated_db().await;
    let indexes = extract_indexes(&conn).unwrap();

    assert_eq!(
        indexes["idx_entries_occurred_at"],
        ("entries".to_string(), vec!["occurred_at".to_string()])
    );
    assert_eq!(
        indexes["idx_entries_status"],
        ("entries".to_string(), vec!["status".to_string()])
    );
    assert_eq!(
        indexes["idx_audit_log_entry"],
        ("audit_log".to_string(), vec!["entry_id".to_string()])
    );
}

#[tokio::test]
async fn test_migrations_recorded_once() {
    let dir = tempfile::tempdir().unwrap();
    let url = dir.path().join("again.db").display().to_string();

    let first = run_migrations(&url).await.unwrap();
    assert_eq!(first, vec!["0001_initial_schema", "0002_lookup_indexes"]);
    assert!(run_migrations(&url).await.unwrap().is_empty());

    let conn = Connection::open(dir.path().join("again.db")).unwrap();
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM __cetane_migrations", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 2);
}
