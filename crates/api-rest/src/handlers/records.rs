//! Patient-scoped health record endpoints.
//!
//! Endpoints that return a single resource check the patient exists before doing anything
//! else. List endpoints run their query first and only check existence when the result is
//! empty, so an existing patient without records gets `[]` and an unknown patient gets 404.

use super::{parse_patient_id, parse_record_ids};
use crate::dto::{
    record_dtos, CreateHealthRecordReq, DeleteRecordRes, HealthRecordDto, HealthRecordSummaryDto,
    PatientListRes, PatientWithRecordsDto, RecordQuery,
};
use crate::error::ErrorBody;
use crate::{ApiError, ApiResult, AppState};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::response::Json;
use records_core::{LocalRecordInput, PatientId, RecordFilter};

/// Shared body of the filtered list endpoints.
async fn list_with_existence_check(
    state: &AppState,
    patient_id: PatientId,
    filter: RecordFilter,
) -> ApiResult<Json<Vec<HealthRecordDto>>> {
    let records = state
        .with_records(move |svc| {
            let records = svc.records_for_patient(&patient_id, &filter)?;
            if records.is_empty() {
                svc.require_patient(&patient_id)?;
            }
            Ok(records)
        })
        .await?;
    Ok(Json(record_dtos(records)))
}

#[utoipa::path(
    get,
    path = "/api/health-records/",
    responses(
        (status = 200, description = "Patients with at least one record", body = PatientListRes),
        (status = 500, description = "Internal server error", body = ErrorBody)
    )
)]
/// List patients that have health records, with a record count for each.
#[axum::debug_handler]
pub async fn list_patients(State(state): State<AppState>) -> ApiResult<Json<PatientListRes>> {
    let patients: Vec<PatientWithRecordsDto> = state
        .with_records(|svc| svc.patients_with_records())
        .await?
        .into_iter()
        .map(PatientWithRecordsDto::from)
        .collect();

    Ok(Json(PatientListRes {
        total: patients.len(),
        patients,
    }))
}

#[utoipa::path(
    get,
    path = "/api/health-records/{patient_id}",
    params(
        ("patient_id" = String, Path, description = "Patient UUID"),
        RecordQuery
    ),
    responses(
        (status = 200, description = "Matching records in insertion order", body = [HealthRecordDto]),
        (status = 400, description = "Malformed patient id", body = ErrorBody),
        (status = 404, description = "Patient not found", body = ErrorBody)
    )
)]
/// List a patient's health records.
///
/// `record_type` and `source_hospital` are optional and combine conjunctively; blank values
/// are ignored.
#[axum::debug_handler]
pub async fn list_records(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
    Query(query): Query<RecordQuery>,
) -> ApiResult<Json<Vec<HealthRecordDto>>> {
    let patient_id = parse_patient_id(&patient_id)?;
    let filter = RecordFilter::from_query(
        query.record_type.as_deref(),
        query.source_hospital.as_deref(),
    );
    list_with_existence_check(&state, patient_id, filter).await
}

#[utoipa::path(
    get,
    path = "/api/health-records/{patient_id}/by-type/{record_type}",
    params(
        ("patient_id" = String, Path, description = "Patient UUID"),
        ("record_type" = String, Path, description = "Record type, e.g. PRESCRIPTION")
    ),
    responses(
        (status = 200, description = "Records of the given type", body = [HealthRecordDto]),
        (status = 400, description = "Malformed patient id or blank record type", body = ErrorBody),
        (status = 404, description = "Patient not found", body = ErrorBody)
    )
)]
#[axum::debug_handler]
pub async fn records_by_type(
    State(state): State<AppState>,
    Path((patient_id, record_type)): Path<(String, String)>,
) -> ApiResult<Json<Vec<HealthRecordDto>>> {
    let patient_id = parse_patient_id(&patient_id)?;
    let filter = RecordFilter::by_type(&record_type)?;
    list_with_existence_check(&state, patient_id, filter).await
}

#[utoipa::path(
    get,
    path = "/api/health-records/{patient_id}/from-hospital/{hospital_id}",
    params(
        ("patient_id" = String, Path, description = "Patient UUID"),
        ("hospital_id" = String, Path, description = "Source hospital identifier")
    ),
    responses(
        (status = 200, description = "Records received from the hospital", body = [HealthRecordDto]),
        (status = 400, description = "Malformed patient id or blank hospital id", body = ErrorBody),
        (status = 404, description = "Patient not found", body = ErrorBody)
    )
)]
#[axum::debug_handler]
pub async fn records_from_hospital(
    State(state): State<AppState>,
    Path((patient_id, hospital_id)): Path<(String, String)>,
) -> ApiResult<Json<Vec<HealthRecordDto>>> {
    let patient_id = parse_patient_id(&patient_id)?;
    let filter = RecordFilter::by_source(&hospital_id)?;
    list_with_existence_check(&state, patient_id, filter).await
}

#[utoipa::path(
    get,
    path = "/api/health-records/{patient_id}/summary",
    params(("patient_id" = String, Path, description = "Patient UUID")),
    responses(
        (status = 200, description = "Record counts by type and source", body = HealthRecordSummaryDto),
        (status = 400, description = "Malformed patient id", body = ErrorBody),
        (status = 404, description = "Patient not found", body = ErrorBody)
    )
)]
/// Summary statistics for a patient's records.
///
/// Both `byType` and `bySource` sum to `totalRecords`; local records are counted under
/// `local`. `lastUpdated` is `null` when the patient has no records.
#[axum::debug_handler]
pub async fn summary(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
) -> ApiResult<Json<HealthRecordSummaryDto>> {
    let patient_id = parse_patient_id(&patient_id)?;
    let summary = state
        .with_records(move |svc| {
            svc.require_patient(&patient_id)?;
            svc.summary(&patient_id)
        })
        .await?;
    Ok(Json(summary.into()))
}

#[utoipa::path(
    get,
    path = "/api/health-records/{patient_id}/external",
    params(("patient_id" = String, Path, description = "Patient UUID")),
    responses(
        (status = 200, description = "Records received from other hospitals", body = [HealthRecordDto]),
        (status = 400, description = "Malformed patient id", body = ErrorBody),
        (status = 404, description = "Patient not found", body = ErrorBody)
    )
)]
#[axum::debug_handler]
pub async fn external_records(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
) -> ApiResult<Json<Vec<HealthRecordDto>>> {
    let patient_id = parse_patient_id(&patient_id)?;
    let records = state
        .with_records(move |svc| {
            svc.require_patient(&patient_id)?;
            svc.external_records(&patient_id)
        })
        .await?;
    Ok(Json(record_dtos(records)))
}

#[utoipa::path(
    get,
    path = "/api/health-records/{patient_id}/{record_id}",
    params(
        ("patient_id" = String, Path, description = "Patient UUID"),
        ("record_id" = String, Path, description = "Health record UUID")
    ),
    responses(
        (status = 200, description = "The health record", body = HealthRecordDto),
        (status = 400, description = "Malformed id", body = ErrorBody),
        (status = 404, description = "Patient or record not found", body = ErrorBody)
    )
)]
#[axum::debug_handler]
pub async fn get_record(
    State(state): State<AppState>,
    Path((patient_id, record_id)): Path<(String, String)>,
) -> ApiResult<Json<HealthRecordDto>> {
    let (patient_id, record_id) = parse_record_ids(&patient_id, &record_id)?;
    let record = state
        .with_records(move |svc| svc.record(&patient_id, &record_id))
        .await?;
    Ok(Json(record.into()))
}

#[utoipa::path(
    post,
    path = "/api/health-records/{patient_id}",
    params(("patient_id" = String, Path, description = "Patient UUID")),
    request_body = CreateHealthRecordReq,
    responses(
        (status = 200, description = "Record created", body = HealthRecordDto),
        (status = 400, description = "Malformed id or invalid body", body = ErrorBody),
        (status = 404, description = "Patient not found", body = ErrorBody)
    )
)]
/// Create a locally generated health record.
///
/// The record id is generated server-side and the record has no source hospital.
///
/// # Errors
/// Returns `400 Bad Request` if:
/// - the patient id is malformed,
/// - the body is not valid JSON for the request shape,
/// - `recordType` is blank, or
/// - `recordDate` cannot be parsed.
///
/// Returns `404 Not Found` if the patient does not exist.
#[axum::debug_handler]
pub async fn create_record(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
    body: Result<Json<CreateHealthRecordReq>, JsonRejection>,
) -> ApiResult<Json<HealthRecordDto>> {
    let patient_id = parse_patient_id(&patient_id)?;
    let req = match body {
        Ok(Json(req)) => req,
        Err(rejection) => {
            state
                .with_records(move |svc| svc.require_patient(&patient_id).map(drop))
                .await?;
            return Err(ApiError::bad_request(rejection.body_text()));
        }
    };

    let input = LocalRecordInput {
        record_type: req.record_type,
        record_date: req.record_date,
        data: req.data,
        data_text: req.data_text,
    };
    let record = state
        .with_records(move |svc| svc.create_local_record(&patient_id, input))
        .await?;
    Ok(Json(record.into()))
}

#[utoipa::path(
    delete,
    path = "/api/health-records/{patient_id}/{record_id}",
    params(
        ("patient_id" = String, Path, description = "Patient UUID"),
        ("record_id" = String, Path, description = "Health record UUID")
    ),
    responses(
        (status = 200, description = "Record deleted", body = DeleteRecordRes),
        (status = 400, description = "Malformed id", body = ErrorBody),
        (status = 404, description = "Patient or record not found", body = ErrorBody)
    )
)]
/// Permanently delete a health record.
#[axum::debug_handler]
pub async fn delete_record(
    State(state): State<AppState>,
    Path((patient_id, record_id)): Path<(String, String)>,
) -> ApiResult<Json<DeleteRecordRes>> {
    let (patient_id, record_id) = parse_record_ids(&patient_id, &record_id)?;
    state
        .with_records(move |svc| svc.delete_record(&patient_id, &record_id))
        .await?;

    Ok(Json(DeleteRecordRes {
        status: "DELETED".into(),
        record_id: record_id.to_string(),
        message: format!("Health record {} deleted successfully", record_id),
    }))
}
