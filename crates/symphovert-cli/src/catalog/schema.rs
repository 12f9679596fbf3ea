//! SQLite schema for the archive catalog

use crate::error::Result;
use rusqlite::{params, Connection, OptionalExtension};

/// Version written to the `metadata` table on initialisation
pub const SCHEMA_VERSION: i64 = 1;

/// Initialize catalog database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS metadata (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
        [],
    )?;

    // Original files
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS files (
            uuid TEXT PRIMARY KEY,
            relative_path TEXT NOT NULL UNIQUE,
            puid TEXT,
            processed BOOLEAN NOT NULL DEFAULT 0,

            action TEXT,
            action_data TEXT NOT NULL DEFAULT '{}'  -- JSON
        )
        "#,
        [],
    )?;

    // Converted master copies
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS master_files (
            uuid TEXT PRIMARY KEY,
            relative_path TEXT NOT NULL UNIQUE,
            original_uuid TEXT NOT NULL,
            sequence INTEGER NOT NULL DEFAULT 0,
            checksum TEXT,
            size INTEGER,

            FOREIGN KEY(original_uuid) REFERENCES files(uuid)
        )
        "#,
        [],
    )?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            time DATETIME NOT NULL,
            operation TEXT NOT NULL,
            uuid TEXT,
            data TEXT,  -- JSON
            reason TEXT
        )
        "#,
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_files_pending ON files(processed, action)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_master_original ON master_files(original_uuid)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_uuid ON events(uuid)",
        [],
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO metadata (key, value) VALUES ('schema_version', ?1)",
        params![SCHEMA_VERSION.to_string()],
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO metadata (key, value) VALUES ('initialised_at', ?1)",
        params![chrono::Utc::now().to_rfc3339()],
    )?;

    Ok(())
}

/// Whether `init_schema` has run on this database
pub fn is_initialised(conn: &Connection) -> Result<bool> {
    let has_metadata: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'metadata')",
        [],
        |row| row.get(0),
    )?;

    if !has_metadata {
        return Ok(false);
    }

    let version: Option<String> = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()?;

    Ok(version.is_some())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_init_schema() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap();

        let tables: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"metadata".to_string()));
        assert!(tables.contains(&"files".to_string()));
        assert!(tables.contains(&"master_files".to_string()));
        assert!(tables.contains(&"events".to_string()));
    }

    #[test]
    fn test_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        init_schema(&conn).unwrap();
        assert!(init_schema(&conn).is_ok());

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM metadata", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 2);
    }

    #[test]
    fn test_is_initialised() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(!is_initialised(&conn).unwrap());

        conn.execute("CREATE TABLE metadata (key TEXT PRIMARY KEY, value TEXT NOT NULL)", [])
            .unwrap();
        assert!(!is_initialised(&conn).unwrap());

        init_schema(&conn).unwrap();
        assert!(is_initialised(&conn).unwrap());
    }
}
