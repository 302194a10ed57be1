//! SQLite persistence backend.
//!
//! The service keeps no connection pool: [`Database`] only knows where the database lives,
//! and every request opens its own [`rusqlite::Connection`] through [`Database::connect`].
//! That connection is the request-scoped session handed to repositories and services.
//!
//! The schema is created with `CREATE TABLE IF NOT EXISTS` when the process starts. There is
//! no migration machinery.

use crate::config::CoreConfig;
use crate::constants::DATABASE_BUSY_TIMEOUT_MS;
use crate::{RecordsError, RecordsResult};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS patients (
    id          TEXT PRIMARY KEY NOT NULL,
    name        TEXT NOT NULL,
    mobile      TEXT,
    abha_id     TEXT,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS health_records (
    id                 TEXT PRIMARY KEY NOT NULL,
    patient_id         TEXT NOT NULL REFERENCES patients(id),
    record_type        TEXT NOT NULL,
    record_date        TEXT NOT NULL,
    data_json          TEXT NOT NULL,
    data_text          TEXT,
    source_hospital    TEXT,
    request_id         TEXT,
    was_encrypted      INTEGER NOT NULL DEFAULT 0,
    decryption_status  TEXT NOT NULL DEFAULT 'NONE',
    delivery_attempt   INTEGER NOT NULL DEFAULT 0,
    created_at         TEXT NOT NULL,
    updated_at         TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_health_records_patient_id
    ON health_records(patient_id);
";

/// Handle to the records database.
#[derive(Clone, Debug)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    pub fn new(cfg: &CoreConfig) -> Self {
        Self {
            path: cfg.database_path().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Opens a new connection (session) to the database.
    ///
    /// Foreign keys are enforced and the connection waits up to
    /// [`DATABASE_BUSY_TIMEOUT_MS`] for competing writers.
    ///
    /// # Errors
    ///
    /// Returns [`RecordsError::DatabaseOpen`] if the file cannot be opened, or
    /// [`RecordsError::Database`] if the connection cannot be configured.
    pub fn connect(&self) -> RecordsResult<Connection> {
        let conn = Connection::open(&self.path).map_err(|source| RecordsError::DatabaseOpen {
            path: self.path.clone(),
            source,
        })?;
        conn.busy_timeout(Duration::from_millis(DATABASE_BUSY_TIMEOUT_MS))?;
        conn.pragma_update(None, "foreign_keys", true)?;
        Ok(conn)
    }

    /// Creates the tables and indexes if they do not exist yet.
    ///
    /// Intended to run once at startup, before the server accepts requests.
    pub fn initialise_schema(&self) -> RecordsResult<()> {
        let conn = self.connect()?;
        conn.execute_batch(SCHEMA)?;
        tracing::info!("database schema ready at {}", self.path.display());
        Ok(())
    }
}
