//! Mapping from library errors to HTTP responses.
//!
//! Every error response has the body `{"detail": "<message>"}`. Store and collaborator
//! failures are logged here, once, before they are turned into a 500.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use records_core::RecordsError;
use records_scan::ScanError;
use serde::Serialize;
use utoipa::ToSchema;

/// Error body shared by every endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, detail)
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, detail)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

impl From<RecordsError> for ApiError {
    fn from(err: RecordsError) -> Self {
        if !err.is_client_error() {
            tracing::error!("Record store error: {:?}", err);
            return Self::internal("Internal server error");
        }
        match err {
            RecordsError::InvalidInput(message) => Self::bad_request(message),
            RecordsError::InvalidId(e) => Self::bad_request(e.to_string()),
            // The remaining client errors are the not-found variants.
            e => Self::new(StatusCode::NOT_FOUND, e.to_string()),
        }
    }
}

impl From<ScanError> for ApiError {
    fn from(err: ScanError) -> Self {
        tracing::error!("Scan failed: {:?}", err);
        Self::internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { detail: self.detail })).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
