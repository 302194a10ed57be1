use records_uuid::{PatientId, RecordId, UuidError};

#[derive(Debug, thiserror::Error)]
pub enum RecordsError {
    #[error(transparent)]
    InvalidId(#[from] UuidError),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("Patient {0} not found")]
    PatientNotFound(PatientId),
    #[error("Health record {record_id} not found for patient {patient_id}")]
    RecordNotFound {
        patient_id: PatientId,
        record_id: RecordId,
    },

    #[error("failed to open database {path}: {source}", path = path.display())]
    DatabaseOpen {
        path: std::path::PathBuf,
        #[source]
        source: rusqlite::Error,
    },
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("failed to serialize record payload: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize record payload: {0}")]
    Deserialization(serde_json::Error),
    #[error("invalid stored value in column {column}: {value}")]
    CorruptRow { column: &'static str, value: String },
}

impl RecordsError {
    /// True for errors caused by the caller's input rather than by the store.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RecordsError::InvalidId(_)
                | RecordsError::InvalidInput(_)
                | RecordsError::PatientNotFound(_)
                | RecordsError::RecordNotFound { .. }
        )
    }
}

pub type RecordsResult<T> = std::result::Result<T, RecordsError>;
