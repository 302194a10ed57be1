//! Request and response bodies.
//!
//! Field names are camelCase on the wire, except the scan response which keeps its
//! snake_case keys for existing clients.

use records_core::validation::format_iso;
use records_core::{HealthRecord, HealthRecordSummary, PatientRecordCount, RecordData};
use records_scan::ScanOutcome;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthRecordDto {
    pub id: String,
    #[serde(rename = "type")]
    pub record_type: String,
    /// Record date, ISO-8601 without offset.
    pub date: String,
    /// `null` for records created locally.
    pub source_hospital: Option<String>,
    #[schema(value_type = Object)]
    pub data: RecordData,
    pub data_text: Option<String>,
    pub received_at: String,
    pub request_id: Option<String>,
    pub patient_id: String,
    pub title: String,
}

impl From<HealthRecord> for HealthRecordDto {
    fn from(record: HealthRecord) -> Self {
        let title = record.title();
        Self {
            id: record.id.to_string(),
            record_type: record.record_type.as_str().to_string(),
            date: format_iso(&record.record_date),
            source_hospital: record.source_hospital,
            data: record.data,
            data_text: record.data_text,
            received_at: format_iso(&record.created_at.naive_utc()),
            request_id: record.request_id,
            patient_id: record.patient_id.to_string(),
            title,
        }
    }
}

pub fn record_dtos(records: Vec<HealthRecord>) -> Vec<HealthRecordDto> {
    records.into_iter().map(HealthRecordDto::from).collect()
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientWithRecordsDto {
    pub patient_id: String,
    pub name: String,
    pub mobile: Option<String>,
    pub abha_id: Option<String>,
    pub record_count: u64,
}

impl From<PatientRecordCount> for PatientWithRecordsDto {
    fn from(entry: PatientRecordCount) -> Self {
        Self {
            patient_id: entry.patient.id.to_string(),
            name: entry.patient.name,
            mobile: entry.patient.mobile,
            abha_id: entry.patient.health_id,
            record_count: entry.record_count,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PatientListRes {
    pub total: usize,
    pub patients: Vec<PatientWithRecordsDto>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthRecordSummaryDto {
    pub total_records: u64,
    pub by_type: BTreeMap<String, u64>,
    /// Locally created records are counted under `local`.
    pub by_source: BTreeMap<String, u64>,
    pub last_updated: Option<String>,
}

impl From<HealthRecordSummary> for HealthRecordSummaryDto {
    fn from(summary: HealthRecordSummary) -> Self {
        Self {
            total_records: summary.total_records,
            by_type: summary.by_type,
            by_source: summary.by_source,
            last_updated: summary
                .last_updated
                .map(|stamp| format_iso(&stamp.naive_utc())),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateHealthRecordReq {
    /// Stored trimmed of surrounding whitespace; must not be blank.
    pub record_type: String,
    /// RFC 3339, naive ISO-8601 date-time, or a bare date.
    pub record_date: String,
    #[schema(value_type = Object)]
    pub data: RecordData,
    #[serde(default)]
    pub data_text: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRecordRes {
    pub status: String,
    pub record_id: String,
    pub message: String,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct RecordQuery {
    /// Only records of this type, e.g. `PRESCRIPTION`.
    pub record_type: Option<String>,
    /// Only records received from this hospital.
    pub source_hospital: Option<String>,
}

/// Multipart form accepted by the scan endpoint.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct ScanUploadForm {
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ScanRes {
    /// Whether structured extraction succeeded.
    pub success: bool,
    pub ocr_text: String,
    #[schema(value_type = Option<Object>)]
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
}

impl From<ScanOutcome> for ScanRes {
    fn from(outcome: ScanOutcome) -> Self {
        Self {
            success: outcome.success,
            ocr_text: outcome.ocr_text,
            data: outcome.data,
            error: outcome.error,
        }
    }
}
