//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services, so
//! request handling never reads process-wide environment variables.

use crate::constants::DEFAULT_DATABASE_PATH;
use crate::{RecordsError, RecordsResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    database_path: PathBuf,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`RecordsError::InvalidInput`] if `database_path` is empty or names an existing
    /// directory.
    pub fn new(database_path: PathBuf) -> RecordsResult<Self> {
        if database_path.as_os_str().is_empty() {
            return Err(RecordsError::InvalidInput(
                "database path cannot be empty".into(),
            ));
        }
        if database_path.is_dir() {
            return Err(RecordsError::InvalidInput(format!(
                "database path is a directory: {}",
                database_path.display()
            )));
        }

        Ok(Self { database_path })
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }
}

/// Resolve the database path from an optional environment value.
///
/// `None` or a blank value falls back to [`DEFAULT_DATABASE_PATH`].
pub fn database_path_from_env_value(value: Option<String>) -> PathBuf {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_database_path_defaults_when_unset_or_blank() {
        assert_eq!(
            database_path_from_env_value(None),
            PathBuf::from(DEFAULT_DATABASE_PATH)
        );
        assert_eq!(
            database_path_from_env_value(Some("   ".into())),
            PathBuf::from(DEFAULT_DATABASE_PATH)
        );
        assert_eq!(
            database_path_from_env_value(Some(" /var/lib/records.db ".into())),
            PathBuf::from("/var/lib/records.db")
        );
    }

    #[test]
    fn test_new_rejects_directory_path() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let err = CoreConfig::new(temp_dir.path().to_path_buf())
            .expect_err("directory should be rejected");
        assert!(matches!(err, RecordsError::InvalidInput(_)));
    }

    #[test]
    fn test_new_rejects_empty_path() {
        let err = CoreConfig::new(PathBuf::new()).expect_err("empty path should be rejected");
        assert!(matches!(err, RecordsError::InvalidInput(_)));
    }
}
