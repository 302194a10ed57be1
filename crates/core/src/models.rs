//! Domain types for patients and health records.

use crate::{RecordsError, RecordsResult};
use chrono::{DateTime, NaiveDateTime, Utc};
use records_types::{NonEmptyText, RecordType};
use records_uuid::{PatientId, RecordId};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::{fmt, str::FromStr};

/// Structured clinical payload of a record (a JSON object).
pub type RecordData = Map<String, Value>;

/// A registered patient.
///
/// Patients are created by the registration flow; the records service only reads them.
#[derive(Clone, Debug, PartialEq)]
pub struct Patient {
    pub id: PatientId,
    pub name: String,
    pub mobile: Option<String>,
    /// External health identifier (ABHA id).
    pub health_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A patient together with the number of health records they have.
#[derive(Clone, Debug, PartialEq)]
pub struct PatientRecordCount {
    pub patient: Patient,
    pub record_count: u64,
}

/// Outcome of decrypting a payload received from another facility.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DecryptionStatus {
    /// Payload was never encrypted (always the case for local records).
    #[default]
    None,
    Decrypted,
    Failed,
}

impl DecryptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecryptionStatus::None => "NONE",
            DecryptionStatus::Decrypted => "DECRYPTED",
            DecryptionStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for DecryptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DecryptionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NONE" => Ok(DecryptionStatus::None),
            "DECRYPTED" => Ok(DecryptionStatus::Decrypted),
            "FAILED" => Ok(DecryptionStatus::Failed),
            other => Err(format!("unknown decryption status: {other}")),
        }
    }
}

/// Delivery bookkeeping for a record received from another hospital.
#[derive(Clone, Debug, PartialEq)]
pub struct ExternalOrigin {
    pub source_hospital: NonEmptyText,
    pub request_id: Option<String>,
    pub was_encrypted: bool,
    pub decryption_status: DecryptionStatus,
    pub delivery_attempt: u32,
}

/// Where a new record comes from.
///
/// Only external records carry a source hospital, so a locally created record can never be
/// stored with one.
#[derive(Clone, Debug, PartialEq)]
pub enum RecordOrigin {
    Local,
    External(ExternalOrigin),
}

/// Input for inserting a health record. The id and timestamps are assigned by the store.
#[derive(Clone, Debug, PartialEq)]
pub struct NewHealthRecord {
    pub record_type: RecordType,
    pub record_date: NaiveDateTime,
    pub data: RecordData,
    pub data_text: Option<String>,
    pub origin: RecordOrigin,
}

/// A stored health record.
#[derive(Clone, Debug, PartialEq)]
pub struct HealthRecord {
    pub id: RecordId,
    pub patient_id: PatientId,
    pub record_type: RecordType,
    pub record_date: NaiveDateTime,
    pub data: RecordData,
    pub data_text: Option<String>,
    /// `None` for locally created records.
    pub source_hospital: Option<String>,
    pub request_id: Option<String>,
    pub was_encrypted: bool,
    pub decryption_status: DecryptionStatus,
    pub delivery_attempt: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HealthRecord {
    pub fn is_external(&self) -> bool {
        self.source_hospital.is_some()
    }

    /// Display title: the payload's own `title` string if it has one, otherwise derived from
    /// the record type.
    pub fn title(&self) -> String {
        match self.data.get("title").and_then(Value::as_str) {
            Some(title) if !title.trim().is_empty() => title.trim().to_string(),
            _ => self.record_type.title(),
        }
    }
}

/// Optional, conjunctive filters for listing a patient's records.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub record_type: Option<NonEmptyText>,
    pub source_hospital: Option<NonEmptyText>,
}

impl RecordFilter {
    /// Builds a filter from raw query values; blank values mean "no filter".
    pub fn from_query(record_type: Option<&str>, source_hospital: Option<&str>) -> Self {
        Self {
            record_type: NonEmptyText::from_optional(record_type),
            source_hospital: NonEmptyText::from_optional(source_hospital),
        }
    }

    /// Filter on a single record type. Unlike the query form, a blank type is an error.
    pub fn by_type(record_type: &str) -> RecordsResult<Self> {
        let record_type = NonEmptyText::new(record_type)
            .map_err(|_| RecordsError::InvalidInput("record type cannot be empty".into()))?;
        Ok(Self {
            record_type: Some(record_type),
            source_hospital: None,
        })
    }

    /// Filter on a single source hospital. A blank id is an error, never "any source".
    pub fn by_source(source_hospital: &str) -> RecordsResult<Self> {
        let source_hospital = NonEmptyText::new(source_hospital)
            .map_err(|_| RecordsError::InvalidInput("hospital id cannot be empty".into()))?;
        Ok(Self {
            record_type: None,
            source_hospital: Some(source_hospital),
        })
    }
}

/// Aggregate view of a patient's records.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HealthRecordSummary {
    pub total_records: u64,
    pub by_type: BTreeMap<String, u64>,
    /// Keyed by source hospital; local records are counted under
    /// [`LOCAL_SOURCE_BUCKET`](crate::constants::LOCAL_SOURCE_BUCKET).
    pub by_source: BTreeMap<String, u64>,
    /// `None` when the patient has no records.
    pub last_updated: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record_with(record_type: &str, data: Value) -> HealthRecord {
        let now = Utc::now();
        HealthRecord {
            id: RecordId::new(),
            patient_id: PatientId::new(),
            record_type: RecordType::new(record_type).unwrap(),
            record_date: now.naive_utc(),
            data: data.as_object().cloned().unwrap_or_default(),
            data_text: None,
            source_hospital: None,
            request_id: None,
            was_encrypted: false,
            decryption_status: DecryptionStatus::None,
            delivery_attempt: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_title_prefers_payload_title() {
        let record = record_with("LAB_REPORT", json!({"title": "Lipid Panel"}));
        assert_eq!(record.title(), "Lipid Panel");
    }

    #[test]
    fn test_title_falls_back_to_record_type() {
        let record = record_with("LAB_REPORT", json!({"title": "  ", "value": 1}));
        assert_eq!(record.title(), "Lab Report");

        let record = record_with("PRESCRIPTION", json!({"title": 42}));
        assert_eq!(record.title(), "Prescription");
    }

    #[test]
    fn test_decryption_status_round_trip() {
        for status in [
            DecryptionStatus::None,
            DecryptionStatus::Decrypted,
            DecryptionStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<DecryptionStatus>(), Ok(status));
        }
        assert!("PENDING".parse::<DecryptionStatus>().is_err());
    }

    #[test]
    fn test_filter_from_query_ignores_blank_values() {
        let filter = RecordFilter::from_query(Some(" "), Some("HOSP-1"));
        assert!(filter.record_type.is_none());
        assert_eq!(filter.source_hospital.unwrap().as_str(), "HOSP-1");
    }

    #[test]
    fn test_single_value_filters_reject_blank() {
        assert!(matches!(
            RecordFilter::by_source(" "),
            Err(RecordsError::InvalidInput(_))
        ));
        assert!(matches!(
            RecordFilter::by_type("\t"),
            Err(RecordsError::InvalidInput(_))
        ));
        let filter = RecordFilter::by_source(" HOSP-1 ").unwrap();
        assert_eq!(filter.source_hospital.unwrap().as_str(), "HOSP-1");
        assert!(filter.record_type.is_none());
    }
}
