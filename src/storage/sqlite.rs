//! SQLite storage backend for job-state records

use super::traits::{JobRecord, JobStore, OpenStore, StorageError, StorageResult};
use crate::ids::AttributeValueId;
use crate::visibility::Visibility;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

/// SQLite-backed job store.
///
/// One row per (tenancy, root): a surrogate integer key, the tenancy
/// columns, and a single JSON column carrying the three id lists plus
/// per-id metadata. Thread-safe via an internal mutex on the connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Initialize the database schema
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS dependent_value_jobs (
                pk INTEGER PRIMARY KEY AUTOINCREMENT,
                workspace_id TEXT NOT NULL,
                change_set_id TEXT NOT NULL,
                root_attribute_value_id TEXT NOT NULL,
                job_json TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE (workspace_id, change_set_id, root_attribute_value_id)
            );

            CREATE INDEX IF NOT EXISTS idx_jobs_tenancy
                ON dependent_value_jobs(workspace_id, change_set_id);

            -- Enable WAL mode for concurrent reads during writes
            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl JobStore for SqliteStore {
    fn create_job(&self, tenancy: &Visibility, root: &AttributeValueId) -> StorageResult<()> {
        let record = JobRecord::empty(root.clone());
        let job_json = serde_json::to_string(&record)?;
        let conn = self.conn.lock().unwrap();
        let result = conn.execute(
            "INSERT INTO dependent_value_jobs
                (workspace_id, change_set_id, root_attribute_value_id, job_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                tenancy.workspace_id.as_str(),
                tenancy.change_set_id.as_str(),
                root.as_str(),
                job_json,
                Utc::now().to_rfc3339(),
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(err)
                if err.sqlite_error_code() == Some(rusqlite::ErrorCode::ConstraintViolation) =>
            {
                Err(StorageError::JobExists(root.clone()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn save_job(&self, tenancy: &Visibility, record: &JobRecord) -> StorageResult<()> {
        let job_json = serde_json::to_string(record)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO dependent_value_jobs
                (workspace_id, change_set_id, root_attribute_value_id, job_json, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (workspace_id, change_set_id, root_attribute_value_id)
             DO UPDATE SET job_json = excluded.job_json",
            params![
                tenancy.workspace_id.as_str(),
                tenancy.change_set_id.as_str(),
                record.attribute_value_id.as_str(),
                job_json,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn load_job(
        &self,
        tenancy: &Visibility,
        root: &AttributeValueId,
    ) -> StorageResult<Option<JobRecord>> {
        let conn = self.conn.lock().unwrap();
        let job_json: Option<String> = conn
            .query_row(
                "SELECT job_json FROM dependent_value_jobs
                 WHERE workspace_id = ?1 AND change_set_id = ?2
                   AND root_attribute_value_id = ?3",
                params![
                    tenancy.workspace_id.as_str(),
                    tenancy.change_set_id.as_str(),
                    root.as_str(),
                ],
                |row| row.get(0),
            )
            .optional()?;
        match job_json {
            Some(job_json) => Ok(Some(serde_json::from_str(&job_json)?)),
            None => Ok(None),
        }
    }

    fn list_jobs(&self, tenancy: &Visibility) -> StorageResult<Vec<JobRecord>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT job_json FROM dependent_value_jobs
             WHERE workspace_id = ?1 AND change_set_id = ?2
             ORDER BY root_attribute_value_id",
        )?;
        let rows = stmt.query_map(
            params![
                tenancy.workspace_id.as_str(),
                tenancy.change_set_id.as_str(),
            ],
            |row| row.get::<_, String>(0),
        )?;
        let mut records = Vec::new();
        for job_json in rows {
            records.push(serde_json::from_str(&job_json?)?);
        }
        Ok(records)
    }

    fn delete_job(&self, tenancy: &Visibility, root: &AttributeValueId) -> StorageResult<bool> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM dependent_value_jobs
             WHERE workspace_id = ?1 AND change_set_id = ?2
               AND root_attribute_value_id = ?3",
            params![
                tenancy.workspace_id.as_str(),
                tenancy.change_set_id.as_str(),
                root.as_str(),
            ],
        )?;
        Ok(deleted > 0)
    }
}
