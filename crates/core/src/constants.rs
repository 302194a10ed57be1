//! Constants used throughout the records core crate.

/// Default SQLite database file when no explicit path is configured.
pub const DEFAULT_DATABASE_PATH: &str = "health_records.db";

/// How long a connection waits on a locked database before failing.
pub const DATABASE_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Summary bucket for records created locally (records with no source hospital).
pub const LOCAL_SOURCE_BUCKET: &str = "local";

