//! # Records Scan
//!
//! Turns a photographed prescription into structured clinical fields.
//!
//! The pipeline is linear: the upload is written to a request-scoped temporary directory,
//! sent to an OCR collaborator, and the recognised text is handed to a generative-text
//! collaborator that is asked for a JSON object. Both collaborators are trait objects
//! ([`OcrEngine`], [`TextGenerator`]) chosen once at startup.
//!
//! Failure policy:
//! - upload storage and OCR failures are returned as [`ScanError`] to the caller;
//! - extraction failures (blank OCR text, missing credentials, service errors, malformed
//!   JSON) are reported in-band through [`ExtractionOutcome`].

pub mod config;
pub mod extraction;
pub mod pipeline;
pub mod provider;
pub mod providers;

pub use config::{ExtractionSettings, OcrSettings};
pub use extraction::{parse_json_leniently, strip_json_fence, ExtractionOutcome, StructuredExtractor};
pub use pipeline::{ScanOutcome, ScanPipeline, ScanUpload};
pub use provider::{
    build_text_generator, ocr_text_from_response, OcrEngine, OcrRequest, TextGenerator,
    UnconfiguredGenerator,
};
pub use providers::{gemini::GeminiClient, gradio::GradioOcrClient};

/// Errors from the scan pipeline and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// A required credential or setting is missing.
    #[error("{0}")]
    Configuration(String),
    #[error("OCR text is empty")]
    EmptyOcrText,
    #[error("{service} request failed: {message}")]
    ExternalService {
        service: &'static str,
        message: String,
    },
    #[error("failed to parse {service} response: {message}")]
    Parse {
        service: &'static str,
        message: String,
    },
    #[error("failed to store upload: {0}")]
    Upload(std::io::Error),
}

impl ScanError {
    pub(crate) fn service(service: &'static str, err: impl std::fmt::Display) -> Self {
        ScanError::ExternalService {
            service,
            message: err.to_string(),
        }
    }

    pub(crate) fn parse(service: &'static str, err: impl std::fmt::Display) -> Self {
        ScanError::Parse {
            service,
            message: err.to_string(),
        }
    }
}

pub type ScanResult<T> = std::result::Result<T, ScanError>;

/// Longest slice of an error response body kept in the error message.
const ERROR_BODY_LIMIT: usize = 512;

/// Returns the response if its status is a success. Otherwise the body is read into the
/// [`ScanError::ExternalService`] message, since it usually names the real cause.
pub(crate) async fn ensure_success(
    service: &'static str,
    resp: reqwest::Response,
) -> ScanResult<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ScanError::ExternalService {
        service,
        message: status_message(status, &body),
    })
}

fn status_message(status: reqwest::StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return status.to_string();
    }
    let body: String = body.chars().take(ERROR_BODY_LIMIT).collect();
    format!("{status}: {body}")
}
