//! Collaborator seams for the scan pipeline.
//!
//! Both collaborators are remote services in production and mocks in tests, so they sit
//! behind object-safe async traits and are shared as `Arc<dyn ...>`.

use crate::config::ExtractionSettings;
use crate::providers::gemini::GeminiClient;
use crate::{ScanError, ScanResult};
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

/// Model size requested from the OCR space.
pub const OCR_MODEL_SIZE: &str = "Gundam (Recommended)";
/// OCR task type: plain transcription, no layout grounding.
pub const OCR_TASK_TYPE: &str = "📝 Free OCR";
/// Reference text; ignored by the free OCR task but required by the endpoint.
pub const OCR_REF_TEXT: &str = "Hello!!";

/// A single OCR call.
#[derive(Debug, Clone, Copy)]
pub struct OcrRequest<'a> {
    pub image: &'a Path,
    pub model_size: &'a str,
    pub task_type: &'a str,
    pub ref_text: &'a str,
}

impl<'a> OcrRequest<'a> {
    /// Free transcription of `image` with the fixed model size and task.
    pub fn free_ocr(image: &'a Path) -> Self {
        Self {
            image,
            model_size: OCR_MODEL_SIZE,
            task_type: OCR_TASK_TYPE,
            ref_text: OCR_REF_TEXT,
        }
    }
}

/// Optical character recognition over a stored image.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Runs recognition and returns the raw result value.
    ///
    /// The result is either a sequence whose first element is the text, or the text itself;
    /// see [`ocr_text_from_response`].
    async fn recognise(&self, request: OcrRequest<'_>) -> ScanResult<Value>;

    fn name(&self) -> &str;
}

/// Generative text completion.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, model: &str, prompt: &str) -> ScanResult<String>;

    fn name(&self) -> &str;
}

/// Pulls the recognised text out of an OCR result.
///
/// Sequences yield their first element. Strings are returned as-is, `null` and empty
/// sequences become empty text, and any other value is rendered as JSON.
pub fn ocr_text_from_response(response: &Value) -> String {
    let first = match response {
        Value::Array(items) => match items.first() {
            Some(item) => item,
            None => return String::new(),
        },
        other => other,
    };

    match first {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Stand-in generator used when no credentials are configured.
///
/// Every call fails with [`ScanError::Configuration`], which the extractor reports in-band.
#[derive(Debug, Clone)]
pub struct UnconfiguredGenerator {
    reason: String,
}

impl UnconfiguredGenerator {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl TextGenerator for UnconfiguredGenerator {
    async fn generate(&self, _model: &str, _prompt: &str) -> ScanResult<String> {
        Err(ScanError::Configuration(self.reason.clone()))
    }

    fn name(&self) -> &str {
        "unconfigured"
    }
}

/// Chooses the text generator once at startup.
pub fn build_text_generator(settings: &ExtractionSettings) -> Arc<dyn TextGenerator> {
    match settings.api_key() {
        Some(key) => Arc::new(GeminiClient::new(key.clone())),
        None => {
            tracing::warn!("GEMINI_API_KEY not set; structured extraction is disabled");
            Arc::new(UnconfiguredGenerator::new("GEMINI_API_KEY is not configured"))
        }
    }
}
