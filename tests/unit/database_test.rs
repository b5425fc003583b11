//! Unit tests for the cookie jar database layer (connection + migrations).

use damecon::database::migrations::{get_schema_version, run_all, CURRENT_SCHEMA_VERSION};
use damecon::database::Database;
use rusqlite::Connection;
use tempfile::TempDir;

#[test]
fn test_open_in_memory_succeeds() {
    let db = Database::open_in_memory();
    assert!(db.is_ok(), "open_in_memory should succeed");
}

#[test]
fn test_migrations_create_cookie_table() {
    let db = Database::open_in_memory().expect("open_in_memory failed");
    let count: i64 = db
        .connection()
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'cookies'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(get_schema_version(db.connection()), CURRENT_SCHEMA_VERSION);
}

#[test]
fn test_cookie_key_is_unique() {
    let db = Database::open_in_memory().unwrap();
    let conn = db.connection();
    let insert = "INSERT INTO cookies (name, value, domain, path) VALUES ('a', ?1, '.dmm.com', '/')";
    conn.execute(insert, ["1"]).unwrap();
    assert!(conn.execute(insert, ["2"]).is_err());
}

#[test]
fn test_file_jar_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cookies.db");
    {
        let db = Database::open(&path).unwrap();
        db.connection()
            .execute(
                "INSERT INTO cookies (name, value, domain) VALUES ('ckcy', '1', '.dmm.com')",
                [],
            )
            .unwrap();
    }

    let db = Database::open(&path).unwrap();
    let value: String = db
        .connection()
        .query_row("SELECT value FROM cookies WHERE name = 'ckcy'", [], |row| row.get(0))
        .unwrap();
    assert_eq!(value, "1");
    assert_eq!(get_schema_version(db.connection()), CURRENT_SCHEMA_VERSION);
}

#[test]
fn test_v1_jar_gains_same_site_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE schema_version (version INTEGER PRIMARY KEY, applied_at INTEGER NOT NULL, description TEXT NOT NULL);
         INSERT INTO schema_version VALUES (1, 0, 'Cookie jar');
         CREATE TABLE cookies (
             id INTEGER PRIMARY KEY AUTOINCREMENT,
             name TEXT NOT NULL,
             value TEXT NOT NULL,
             domain TEXT NOT NULL,
             host_only INTEGER NOT NULL DEFAULT 1,
             path TEXT NOT NULL DEFAULT '/',
             secure INTEGER NOT NULL DEFAULT 0,
             http_only INTEGER NOT NULL DEFAULT 0,
             expiration_date REAL,
             UNIQUE(name, domain, path)
         );
         INSERT INTO cookies (name, value, domain) VALUES ('old', 'x', 'a.example');",
    )
    .unwrap();

    run_all(&conn).unwrap();

    let same_site: String = conn
        .query_row("SELECT same_site FROM cookies WHERE name = 'old'", [], |row| row.get(0))
        .unwrap();
    assert_eq!(same_site, "unspecified");
    assert_eq!(get_schema_version(&conn), 2);
}
