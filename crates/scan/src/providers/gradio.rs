//! Client for a hosted Gradio OCR space.
//!
//! A call is three round trips: upload the image, start the prediction (which returns an
//! event id), then read the server-sent event stream until a `complete` or `error` event.

use crate::provider::{OcrEngine, OcrRequest};
use crate::{ensure_success, ScanError, ScanResult};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::{json, Value};

pub const DEFAULT_OCR_SPACE_URL: &str = "https://khang119966-deepseek-ocr-demo.hf.space";
pub const OCR_API_NAME: &str = "process_ocr_task";

const SERVICE: &str = "ocr";

#[derive(Deserialize)]
struct CallStarted {
    event_id: String,
}

pub struct GradioOcrClient {
    base_url: String,
    api_name: String,
    client: reqwest::Client,
}

impl GradioOcrClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_name: OCR_API_NAME.to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn call_url(&self) -> String {
        format!("{}/gradio_api/call/{}", self.base_url, self.api_name)
    }

    async fn upload(&self, request: &OcrRequest<'_>) -> ScanResult<String> {
        let bytes = tokio::fs::read(request.image)
            .await
            .map_err(ScanError::Upload)?;
        let file_name = request
            .image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.png".to_string());

        let form = Form::new().part("files", Part::bytes(bytes).file_name(file_name));
        let resp = self
            .client
            .post(format!("{}/gradio_api/upload", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ScanError::service(SERVICE, e))?;
        let paths: Vec<String> = ensure_success(SERVICE, resp)
            .await?
            .json()
            .await
            .map_err(|e| ScanError::parse(SERVICE, e))?;

        paths
            .into_iter()
            .next()
            .ok_or_else(|| ScanError::parse(SERVICE, "upload returned no file path"))
    }

    async fn start(&self, payload: &Value) -> ScanResult<String> {
        let resp = self
            .client
            .post(self.call_url())
            .json(payload)
            .send()
            .await
            .map_err(|e| ScanError::service(SERVICE, e))?;
        let started: CallStarted = ensure_success(SERVICE, resp)
            .await?
            .json()
            .await
            .map_err(|e| ScanError::parse(SERVICE, e))?;
        Ok(started.event_id)
    }

    async fn result(&self, event_id: &str) -> ScanResult<Value> {
        let resp = self
            .client
            .get(format!("{}/{}", self.call_url(), event_id))
            .send()
            .await
            .map_err(|e| ScanError::service(SERVICE, e))?;
        let body = ensure_success(SERVICE, resp)
            .await?
            .text()
            .await
            .map_err(|e| ScanError::service(SERVICE, e))?;
        parse_event_stream(&body)
    }
}

/// Prediction payload: the uploaded file reference followed by the task parameters.
fn prediction_payload(uploaded_path: &str, request: &OcrRequest<'_>) -> Value {
    json!({
        "data": [
            {"path": uploaded_path, "meta": {"_type": "gradio.FileData"}},
            request.model_size,
            request.task_type,
            request.ref_text,
        ]
    })
}

/// Reads a Gradio event stream and returns the data of the `complete` event.
///
/// Intermediate events (`generating`, `heartbeat`) are skipped. An `error` event, or a stream
/// that ends without completing, is an external service failure.
pub fn parse_event_stream(body: &str) -> ScanResult<Value> {
    let mut event = "";
    for line in body.lines() {
        if let Some(name) = line.strip_prefix("event:") {
            event = name.trim();
            continue;
        }
        let Some(data) = line.strip_prefix("data:") else {
            continue;
        };
        let data = data.trim();
        match event {
            "complete" => {
                return serde_json::from_str(data).map_err(|e| ScanError::parse(SERVICE, e))
            }
            "error" => {
                let message = if data.is_empty() || data == "null" {
                    "OCR service reported an error".to_string()
                } else {
                    data.to_string()
                };
                return Err(ScanError::ExternalService {
                    service: SERVICE,
                    message,
                });
            }
            _ => {}
        }
    }
    Err(ScanError::ExternalService {
        service: SERVICE,
        message: "event stream ended without a result".into(),
    })
}

#[async_trait]
impl OcrEngine for GradioOcrClient {
    async fn recognise(&self, request: OcrRequest<'_>) -> ScanResult<Value> {
        let uploaded = self.upload(&request).await?;
        let event_id = self.start(&prediction_payload(&uploaded, &request)).await?;
        tracing::debug!(event_id = %event_id, "OCR prediction started");
        self.result(&event_id).await
    }

    fn name(&self) -> &str {
        "gradio"
    }
}
