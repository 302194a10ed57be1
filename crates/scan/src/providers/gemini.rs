//! Google Gemini text generation.

use crate::provider::TextGenerator;
use crate::{ensure_success, ScanError, ScanResult};
use async_trait::async_trait;
use records_types::NonEmptyText;
use serde_json::Value;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

const SERVICE: &str = "gemini";

pub struct GeminiClient {
    api_key: NonEmptyText,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: NonEmptyText) -> Self {
        Self::with_base_url(api_key, DEFAULT_GEMINI_BASE_URL)
    }

    pub fn with_base_url(api_key: NonEmptyText, base_url: &str) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }

    fn request_body(prompt: &str) -> Value {
        serde_json::json!({
            "contents": [{"role": "user", "parts": [{"text": prompt}]}]
        })
    }

    /// Extracts the first candidate's text.
    pub fn parse_response(json: &Value) -> ScanResult<String> {
        json.pointer("/candidates/0/content/parts/0/text")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .ok_or_else(|| {
                ScanError::parse(SERVICE, "missing candidates[0].content.parts[0].text")
            })
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, model: &str, prompt: &str) -> ScanResult<String> {
        let resp = self
            .client
            .post(self.endpoint(model))
            .header("x-goog-api-key", self.api_key.as_str())
            .json(&Self::request_body(prompt))
            .send()
            .await
            .map_err(|e| ScanError::service(SERVICE, e))?;

        let json: Value = ensure_success(SERVICE, resp)
            .await?
            .json().await.map_err(|e| ScanError::parse(SERVICE, e))?;
        Self::parse_response(&json)
    }

    fn name(&self) -> &str {
        SERVICE
    }
}
