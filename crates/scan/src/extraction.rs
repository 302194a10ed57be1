//! Structured field extraction from OCR text.

use crate::config::ExtractionSettings;
use crate::provider::TextGenerator;
use crate::{ScanError, ScanResult};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are an AI that extracts structured data from medical prescriptions.
Extract ONLY the following fields:
- patient_name
- doctor_name
- symptoms
- prescription
- dosage
- doctor_notes

Rules:
1. Return ONLY a valid JSON object.
2. No explanations, no markdown.
3. Use null if a field is missing.";

const SERVICE: &str = "extraction";

/// Wraps OCR text in the fixed request template listing the expected fields.
pub fn build_prompt(ocr_text: &str) -> String {
    format!(
        r#"Prescription Text:
{ocr_text}

Expected JSON format:
{{
  "patient_name": null,
  "doctor_name": null,
  "symptoms": null,
  "prescription": null,
  "dosage": null,
  "doctor_notes": null
}}"#
    )
    .trim()
    .to_string()
}

/// Removes a surrounding markdown code fence, optionally tagged `json`.
///
/// Text without a leading fence is only trimmed.
pub fn strip_json_fence(text: &str) -> &str {
    let cleaned = text.trim();
    let Some(rest) = cleaned.strip_prefix("```") else {
        return cleaned;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parses model output as JSON after stripping any code fence.
pub fn parse_json_leniently(text: &str) -> ScanResult<Value> {
    serde_json::from_str(strip_json_fence(text)).map_err(|e| ScanError::parse(SERVICE, e))
}

/// Result of an extraction attempt. Failures are carried here, never raised.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractionOutcome {
    pub success: bool,
    pub data: Option<Value>,
    pub error: Option<String>,
}

impl ExtractionOutcome {
    fn succeeded(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn failed(error: &ScanError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.to_string()),
        }
    }
}

pub struct StructuredExtractor {
    generator: Arc<dyn TextGenerator>,
    model: String,
    system_prompt: String,
}

impl StructuredExtractor {
    pub fn new(generator: Arc<dyn TextGenerator>, settings: &ExtractionSettings) -> Self {
        Self {
            generator,
            model: settings.model().to_string(),
            system_prompt: settings.system_prompt().to_string(),
        }
    }

    /// Extracts prescription fields from `ocr_text`.
    ///
    /// Blank text fails without calling the generator.
    pub async fn extract(&self, ocr_text: &str) -> ExtractionOutcome {
        match self.try_extract(ocr_text).await {
            Ok(data) => ExtractionOutcome::succeeded(data),
            Err(e) => {
                tracing::error!(
                    generator = self.generator.name(),
                    "Structured extraction failed: {}",
                    e
                );
                ExtractionOutcome::failed(&e)
            }
        }
    }

    async fn try_extract(&self, ocr_text: &str) -> ScanResult<Value> {
        if ocr_text.trim().is_empty() {
            return Err(ScanError::EmptyOcrText);
        }
        let prompt = format!("{}\n\n{}", self.system_prompt, build_prompt(ocr_text));
        let raw = self.generator.generate(&self.model, &prompt).await?;
        parse_json_leniently(&raw)
    }
}
