//! Request handlers, grouped by resource.

pub mod health;
pub mod records;
pub mod scan;

use crate::{ApiError, ApiResult};
use records_core::{PatientId, RecordId};

/// Parses a patient id path segment; malformed ids never reach the store.
pub(crate) fn parse_patient_id(raw: &str) -> ApiResult<PatientId> {
    PatientId::parse(raw).map_err(|e| {
        tracing::debug!("rejecting patient id: {}", e);
        ApiError::bad_request("Invalid patient ID format")
    })
}

pub(crate) fn parse_record_ids(patient: &str, record: &str) -> ApiResult<(PatientId, RecordId)> {
    match (PatientId::parse(patient), RecordId::parse(record)) {
        (Ok(patient_id), Ok(record_id)) => Ok((patient_id, record_id)),
        _ => Err(ApiError::bad_request("Invalid ID format")),
    }
}
