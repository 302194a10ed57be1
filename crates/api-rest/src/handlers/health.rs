use crate::dto::HealthRes;
use axum::response::Json;

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Liveness probe for monitoring and load balancers.
#[axum::debug_handler]
pub async fn health() -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "Health records API is alive".into(),
    })
}

#[cfg(test)]
mod tests {
    use crate::test_support::TestApp;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_health() {
        let app = TestApp::new();
        let (status, body) = app.get("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn test_openapi_document_lists_record_routes() {
        let app = TestApp::new();
        let (status, body) = app.get("/api-docs/openapi.json").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["paths"]["/api/health-records/{patient_id}/scan"].is_object());
        assert!(body["paths"]["/api/health-records/{patient_id}/{record_id}"]["delete"].is_object());
    }
}
