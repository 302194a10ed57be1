//! Scan pipeline configuration.
//!
//! Settings are read from the environment once, in `main`, and passed in. Nothing in this
//! crate reads environment variables at call time.

use crate::extraction::{DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT};
use crate::providers::gradio::DEFAULT_OCR_SPACE_URL;
use records_types::NonEmptyText;
use std::path::PathBuf;

/// Settings for the structured extraction collaborator.
#[derive(Clone, Debug)]
pub struct ExtractionSettings {
    api_key: Option<NonEmptyText>,
    model: String,
    system_prompt: String,
}

impl ExtractionSettings {
    /// Builds settings from raw optional values; blank values count as unset.
    ///
    /// The model and system prompt fall back to their defaults. A missing API key is not an
    /// error here: it disables extraction, which is reported on every scan.
    pub fn from_env_values(
        api_key: Option<String>,
        model: Option<String>,
        system_prompt: Option<String>,
    ) -> Self {
        Self {
            api_key: NonEmptyText::from_optional(api_key),
            model: NonEmptyText::from_optional(model)
                .map(NonEmptyText::into_string)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            system_prompt: NonEmptyText::from_optional(system_prompt)
                .map(NonEmptyText::into_string)
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
        }
    }

    pub fn api_key(&self) -> Option<&NonEmptyText> {
        self.api_key.as_ref()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self::from_env_values(None, None, None)
    }
}

/// Settings for the OCR collaborator and upload staging.
#[derive(Clone, Debug)]
pub struct OcrSettings {
    space_url: String,
    upload_dir: Option<PathBuf>,
}

impl OcrSettings {
    pub fn from_env_values(space_url: Option<String>, upload_dir: Option<String>) -> Self {
        Self {
            space_url: NonEmptyText::from_optional(space_url)
                .map(|url| url.as_str().trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_OCR_SPACE_URL.to_string()),
            upload_dir: NonEmptyText::from_optional(upload_dir)
                .map(|dir| PathBuf::from(dir.as_str())),
        }
    }

    pub fn space_url(&self) -> &str {
        &self.space_url
    }

    /// Parent directory for per-request upload directories; the system temp dir if unset.
    pub fn upload_dir(&self) -> Option<&PathBuf> {
        self.upload_dir.as_ref()
    }
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self::from_env_values(None, None)
    }
}
