//! # API REST
//!
//! HTTP surface of the health records service.
//!
//! Handles:
//! - Patient-scoped record endpoints under `/api/health-records` (axum)
//! - The prescription scan upload endpoint
//! - OpenAPI/Swagger documentation and CORS
//!
//! Storage and query rules live in `records-core`; OCR and extraction live in `records-scan`.

#![warn(rust_2018_idioms)]

pub mod dto;
pub mod error;
pub mod handlers;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use records_core::{Database, HealthRecordService, RecordsResult};
use records_scan::ScanPipeline;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use error::{ApiError, ApiResult};

/// Default cap on scan upload bodies.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Shared state for request handlers.
///
/// Only the database path and the boot-time collaborators are shared; each request opens its
/// own connection.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub scan: Arc<ScanPipeline>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(db: Database, scan: Arc<ScanPipeline>) -> Self {
        Self {
            db,
            scan,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    /// Runs `op` against a fresh connection on the blocking pool.
    pub(crate) async fn with_records<T, F>(&self, op: F) -> ApiResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&HealthRecordService<'_>) -> RecordsResult<T> + Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let conn = db.connect()?;
            op(&HealthRecordService::new(&conn))
        })
        .await
        .map_err(|e| {
            tracing::error!("Record store task failed: {:?}", e);
            ApiError::internal("Internal server error")
        })?
        .map_err(ApiError::from)
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health,
        handlers::records::list_patients,
        handlers::records::list_records,
        handlers::records::create_record,
        handlers::records::summary,
        handlers::records::external_records,
        handlers::records::get_record,
        handlers::records::delete_record,
        handlers::records::records_by_type,
        handlers::records::records_from_hospital,
        handlers::scan::scan_prescription,
    ),
    components(schemas(
        dto::HealthRes,
        dto::HealthRecordDto,
        dto::PatientWithRecordsDto,
        dto::PatientListRes,
        dto::HealthRecordSummaryDto,
        dto::CreateHealthRecordReq,
        dto::DeleteRecordRes,
        dto::ScanUploadForm,
        dto::ScanRes,
        error::ErrorBody,
    ))
)]
pub struct ApiDoc;

/// Builds the application router with documentation and CORS attached.
pub fn router(state: AppState) -> Router {
    use handlers::{health, records, scan};

    let max_upload_bytes = state.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health))
        .route("/api/health-records", get(records::list_patients))
        .route("/api/health-records/", get(records::list_patients))
        .route(
            "/api/health-records/:patient_id",
            get(records::list_records).post(records::create_record),
        )
        .route(
            "/api/health-records/:patient_id/summary",
            get(records::summary),
        )
        .route(
            "/api/health-records/:patient_id/external",
            get(records::external_records),
        )
        .route(
            "/api/health-records/:patient_id/scan",
            post(scan::scan_prescription).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route(
            "/api/health-records/:patient_id/by-type/:record_type",
            get(records::records_by_type),
        )
        .route(
            "/api/health-records/:patient_id/from-hospital/:hospital_id",
            get(records::records_from_hospital),
        )
        .route(
            "/api/health-records/:patient_id/:record_id",
            get(records::get_record).delete(records::delete_record),
        )
        .merge(
            SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}
