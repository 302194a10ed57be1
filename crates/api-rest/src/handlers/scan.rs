//! Prescription scan upload.

use super::parse_patient_id;
use crate::dto::{ScanRes, ScanUploadForm};
use crate::error::ErrorBody;
use crate::{ApiError, ApiResult, AppState};
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Path, State};
use axum::response::Json;
use records_scan::ScanUpload;

const FILE_FIELD: &str = "file";

async fn read_upload(multipart: &mut Multipart) -> ApiResult<ScanUpload> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::new(e.status(), e.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::new(e.status(), e.body_text()))?;
        return Ok(ScanUpload {
            file_name,
            bytes: bytes.to_vec(),
        });
    }
    Err(ApiError::bad_request("Missing multipart field 'file'"))
}

#[utoipa::path(
    post,
    path = "/api/health-records/{patient_id}/scan",
    params(("patient_id" = String, Path, description = "Patient UUID")),
    request_body(content = ScanUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "OCR text and extracted fields; `success` reports extraction", body = ScanRes),
        (status = 400, description = "Malformed patient id or missing file", body = ErrorBody),
        (status = 404, description = "Patient not found", body = ErrorBody),
        (status = 500, description = "Upload storage or OCR failed", body = ErrorBody)
    )
)]
/// Scan a prescription image and extract structured fields.
///
/// The image is run through OCR and the text is handed to the extraction model. Extraction
/// failures are reported in the body with `success: false`; nothing is stored.
///
/// # Errors
/// Returns `500 Internal Server Error` if:
/// - the upload cannot be staged, or
/// - the OCR service fails.
#[axum::debug_handler]
pub async fn scan_prescription(
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<ScanRes>> {
    let patient_id = parse_patient_id(&patient_id)?;
    state
        .with_records(move |svc| svc.require_patient(&patient_id).map(drop))
        .await?;

    let mut multipart = multipart.map_err(|e| ApiError::new(e.status(), e.body_text()))?;
    let upload = read_upload(&mut multipart).await?;

    tracing::info!(
        "scanning {} byte upload for patient {} with {}",
        upload.bytes.len(),
        patient_id,
        state.scan.ocr_engine()
    );
    let outcome = state.scan.scan(upload).await?;
    Ok(Json(outcome.into()))
}

#[cfg(test)]
mod tests {
    use crate::test_support::TestApp;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use records_core::PatientId;
    use serde_json::{json, Value};

    const BOUNDARY: &str = "X-SCAN-BOUNDARY";

    fn multipart_body(field: &str, file_name: &str, bytes: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; \
                 filename=\"{file_name}\"\r\nContent-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    async fn post_scan(app: &TestApp, patient: &str, body: Vec<u8>) -> (StatusCode, Value) {
        app.send(
            Request::post(format!("/api/health-records/{patient}/scan"))
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }

    fn uploads_empty(app: &TestApp) -> bool {
        std::fs::read_dir(app.uploads.path()).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn test_scan_returns_ocr_text_and_fields() {
        let app = TestApp::new();
        let patient_id = app.register_patient("Asha Rao");

        let (status, body) = post_scan(
            &app,
            &patient_id.to_string(),
            multipart_body("file", "rx.png", b"\x89PNG"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!({
                "success": true,
                "ocr_text": "Rx: Paracetamol 500mg",
                "data": {"prescription": "Paracetamol"},
                "error": null
            })
        );
        let staged = app.ocr.staged.lock().unwrap().clone().unwrap();
        assert_eq!(staged.file_name().unwrap(), "rx.png");
        assert!(uploads_empty(&app));
    }

    #[tokio::test]
    async fn test_extraction_failure_is_in_band_and_cleans_up() {
        let app = TestApp::with_collaborators(
            Ok(json!(["Tab. Azithral 500"])),
            Err("GEMINI_API_KEY is not configured".into()),
        );
        let patient_id = app.register_patient("Asha Rao");

        let (status, body) = post_scan(
            &app,
            &patient_id.to_string(),
            multipart_body("file", "../../rx.png", b"\x89PNG"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert_eq!(body["ocr_text"], "Tab. Azithral 500");
        assert_eq!(body["data"], Value::Null);
        assert_eq!(body["error"], "GEMINI_API_KEY is not configured");

        let staged = app.ocr.staged.lock().unwrap().clone().unwrap();
        assert_eq!(staged.file_name().unwrap(), "rx.png");
        assert!(!staged.exists());
        assert!(uploads_empty(&app));
    }

    #[tokio::test]
    async fn test_blank_ocr_text_skips_extraction() {
        let app = TestApp::with_collaborators(Ok(json!("   ")), Ok("{}".into()));
        let patient_id = app.register_patient("Asha Rao");

        let (status, body) = post_scan(
            &app,
            &patient_id.to_string(),
            multipart_body("file", "rx.png", b"\x89PNG"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "OCR text is empty");
        assert_eq!(app.generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_ocr_failure_is_500() {
        let app = TestApp::with_collaborators(Err("space is sleeping".into()), Ok("{}".into()));
        let patient_id = app.register_patient("Asha Rao");

        let (status, body) = post_scan(
            &app,
            &patient_id.to_string(),
            multipart_body("file", "rx.png", b"\x89PNG"),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["detail"], "ocr request failed: space is sleeping");
        assert!(uploads_empty(&app));
        assert_eq!(app.generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_file_field_is_400() {
        let app = TestApp::new();
        let patient_id = app.register_patient("Asha Rao");

        let (status, body) = post_scan(
            &app,
            &patient_id.to_string(),
            multipart_body("image", "rx.png", b"\x89PNG"),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Missing multipart field 'file'");
        assert!(app.ocr.staged.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_scan_validates_patient_first() {
        let app = TestApp::new();

        let (status, body) =
            post_scan(&app, "not-a-uuid", multipart_body("file", "rx.png", b"x")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "Invalid patient ID format");

        let missing = PatientId::new();
        let (status, body) = post_scan(
            &app,
            &missing.to_string(),
            multipart_body("file", "rx.png", b"x"),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], format!("Patient {missing} not found"));
        assert!(app.ocr.staged.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_oversized_upload_is_rejected() {
        let mut app = TestApp::new();
        app.state = app.state.clone().with_max_upload_bytes(64);
        let patient_id = app.register_patient("Asha Rao");

        let (status, _) = post_scan(
            &app,
            &patient_id.to_string(),
            multipart_body("file", "rx.png", &[0u8; 1024]),
        )
        .await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert!(app.ocr.staged.lock().unwrap().is_none());
    }
}
