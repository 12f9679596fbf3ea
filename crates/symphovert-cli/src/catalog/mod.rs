//! Archive catalog
//!
//! The SQLite database at `_metadata/avid.db` listing the archive's original
//! files, their converted master copies and an event log.
//!
//! Writes open a transaction on first use and stay uncommitted until
//! [`Catalog::commit`]; a process that dies in between leaves no trace.

pub mod schema;
pub mod types;

pub use types::{
    ActionData, CatalogEvent, ConvertAction, FileRecord, MasterArtifact, PendingFilter,
    CONVERT_ACTION,
};

use crate::error::{CliError, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Handle on an archive catalog
pub struct Catalog {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Catalog {
    /// Open an existing, initialised catalog
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(CliError::CatalogMissing(path.to_path_buf()));
        }

        let conn = Connection::open(path)?;
        if !schema::is_initialised(&conn)? {
            return Err(CliError::CatalogNotInitialised(path.to_path_buf()));
        }

        debug!(path = %path.display(), "opened catalog");
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Create (or reopen) a catalog file and initialise its schema
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        schema::init_schema(&conn)?;

        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Create an in-memory catalog (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::init_schema(&conn)?;

        Ok(Self { conn, path: None })
    }

    /// Database file, `None` for in-memory catalogs
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn begin(&self) -> Result<()> {
        if self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN IMMEDIATE")?;
        }
        Ok(())
    }

    /// Whether writes are waiting for [`Catalog::commit`]
    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    /// Make every write since the last commit durable
    pub fn commit(&self) -> Result<()> {
        if self.in_transaction() {
            self.conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    /// Discard every write since the last commit
    pub fn rollback(&self) -> Result<()> {
        if self.in_transaction() {
            self.conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }

    /// File records matching `filter`, in catalog order
    pub fn select_pending(&self, filter: &PendingFilter) -> Result<Vec<FileRecord>> {
        let mut sql = String::from(
            "SELECT uuid, relative_path, puid, processed, action, action_data FROM files WHERE 1 = 1",
        );
        if filter.unprocessed_only {
            sql.push_str(" AND processed = 0");
        }
        if filter.action.is_some() {
            sql.push_str(" AND action = ?1");
        }
        sql.push_str(" ORDER BY rowid");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = match &filter.action {
            Some(action) => stmt.query_map(params![action], file_from_row)?,
            None => stmt.query_map([], file_from_row)?,
        };

        let records = rows.collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    pub fn get_file_record(&self, uuid: Uuid) -> Result<Option<FileRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT uuid, relative_path, puid, processed, action, action_data
                 FROM files WHERE uuid = ?1",
                params![uuid.to_string()],
                file_from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Add an original file
    pub fn insert_file_record(&self, record: &FileRecord) -> Result<()> {
        self.begin()?;
        self.conn.execute(
            r#"
            INSERT INTO files (uuid, relative_path, puid, processed, action, action_data)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.uuid.to_string(),
                record.relative_path,
                record.puid,
                record.processed,
                record.action,
                serde_json::to_string(&record.action_data)?,
            ],
        )?;
        Ok(())
    }

    /// Write back every column of an existing file record
    pub fn update_file_record(&self, record: &FileRecord) -> Result<()> {
        self.begin()?;
        let changed = self.conn.execute(
            r#"
            UPDATE files
            SET relative_path = ?2, puid = ?3, processed = ?4, action = ?5, action_data = ?6
            WHERE uuid = ?1
            "#,
            params![
                record.uuid.to_string(),
                record.relative_path,
                record.puid,
                record.processed,
                record.action,
                serde_json::to_string(&record.action_data)?,
            ],
        )?;

        if changed == 0 {
            return Err(CliError::invalid_record(format!(
                "no file with uuid {}",
                record.uuid
            )));
        }
        Ok(())
    }

    pub fn insert_master_artifact(&self, artifact: &MasterArtifact) -> Result<()> {
        self.begin()?;
        self.conn.execute(
            r#"
            INSERT INTO master_files (uuid, relative_path, original_uuid, sequence, checksum, size)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                artifact.uuid.to_string(),
                artifact.relative_path,
                artifact.original_uuid.to_string(),
                artifact.sequence,
                artifact.checksum,
                artifact.size.map(|s| s as i64),
            ],
        )?;
        Ok(())
    }

    pub fn find_master_artifact_by_path(&self, relative_path: &str) -> Result<Option<MasterArtifact>> {
        let artifact = self
            .conn
            .query_row(
                "SELECT uuid, relative_path, original_uuid, sequence, checksum, size
                 FROM master_files WHERE relative_path = ?1",
                params![relative_path],
                master_from_row,
            )
            .optional()?;
        Ok(artifact)
    }

    /// Master copies of one original
    pub fn master_artifacts_for(&self, original_uuid: Uuid) -> Result<Vec<MasterArtifact>> {
        let mut stmt = self.conn.prepare(
            "SELECT uuid, relative_path, original_uuid, sequence, checksum, size
             FROM master_files WHERE original_uuid = ?1 ORDER BY sequence",
        )?;
        let artifacts = stmt
            .query_map(params![original_uuid.to_string()], master_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(artifacts)
    }

    /// Append to the event log, returning the event id
    pub fn log_event(&self, event: &CatalogEvent) -> Result<i64> {
        self.begin()?;

        let data = event
            .data
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.conn.execute(
            "INSERT INTO events (time, operation, uuid, data, reason) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                event.time.to_rfc3339(),
                event.operation,
                event.uuid.map(|u| u.to_string()),
                data,
                event.reason,
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    /// Event log, oldest first
    pub fn events(&self) -> Result<Vec<CatalogEvent>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, time, operation, uuid, data, reason FROM events ORDER BY id ASC")?;

        let events = stmt
            .query_map([], |row: &Row| {
                let time_str = row.get::<_, String>(1)?;
                let time = DateTime::parse_from_rfc3339(&time_str)
                    .map_err(|e| conversion_error(1, e))?
                    .with_timezone(&Utc);

                let uuid = row
                    .get::<_, Option<String>>(3)?
                    .map(|s| Uuid::parse_str(&s).map_err(|e| conversion_error(3, e)))
                    .transpose()?;

                let data = row
                    .get::<_, Option<String>>(4)?
                    .map(|s| serde_json::from_str(&s).map_err(|e| conversion_error(4, e)))
                    .transpose()?;

                Ok(CatalogEvent {
                    id: Some(row.get(0)?),
                    time,
                    operation: row.get(2)?,
                    uuid,
                    data,
                    reason: row.get(5)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(events)
    }
}

fn conversion_error<E>(column: usize, e: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e))
}

fn uuid_column(row: &Row, column: usize) -> rusqlite::Result<Uuid> {
    let raw = row.get::<_, String>(column)?;
    Uuid::parse_str(&raw).map_err(|e| conversion_error(column, e))
}

fn file_from_row(row: &Row) -> rusqlite::Result<FileRecord> {
    let action_data = match row.get::<_, Option<String>>(5)? {
        Some(raw) if !raw.trim().is_empty() => {
            serde_json::from_str(&raw).map_err(|e| conversion_error(5, e))?
        }
        _ => ActionData::default(),
    };

    Ok(FileRecord {
        uuid: uuid_column(row, 0)?,
        relative_path: row.get(1)?,
        puid: row.get(2)?,
        processed: row.get(3)?,
        action: row.get(4)?,
        action_data,
    })
}

fn master_from_row(row: &Row) -> rusqlite::Result<MasterArtifact> {
    Ok(MasterArtifact {
        uuid: uuid_column(row, 0)?,
        relative_path: row.get(1)?,
        original_uuid: uuid_column(row, 2)?,
        sequence: row.get(3)?,
        checksum: row.get(4)?,
        size: row.get::<_, Option<i64>>(5)?.map(|s| s as u64),
    })
}
