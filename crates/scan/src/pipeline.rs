//! Upload staging, OCR, then extraction.

use crate::config::OcrSettings;
use crate::extraction::StructuredExtractor;
use crate::provider::{ocr_text_from_response, OcrEngine, OcrRequest};
use crate::{ScanError, ScanResult};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

pub const DEFAULT_UPLOAD_NAME: &str = "upload.png";

/// An uploaded image as received from the client.
#[derive(Debug, Clone)]
pub struct ScanUpload {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

/// Response body for a completed scan.
///
/// `success` reflects extraction only; OCR text is returned even when extraction fails.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanOutcome {
    pub success: bool,
    pub ocr_text: String,
    pub data: Option<Value>,
    pub error: Option<String>,
}

pub struct ScanPipeline {
    ocr: Arc<dyn OcrEngine>,
    extractor: StructuredExtractor,
    upload_dir: Option<PathBuf>,
}

impl ScanPipeline {
    pub fn new(
        ocr: Arc<dyn OcrEngine>,
        extractor: StructuredExtractor,
        settings: &OcrSettings,
    ) -> Self {
        Self {
            ocr,
            extractor,
            upload_dir: settings.upload_dir().cloned(),
        }
    }

    pub fn ocr_engine(&self) -> &str {
        self.ocr.name()
    }

    /// Runs OCR and extraction over one upload.
    ///
    /// The upload lives in a fresh temporary directory that is removed before this returns,
    /// whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Upload`] if the upload cannot be staged, or the OCR engine's error.
    /// Extraction failures are reported inside the [`ScanOutcome`].
    pub async fn scan(&self, upload: ScanUpload) -> ScanResult<ScanOutcome> {
        let staging = self.staging_dir()?;
        let image = staging
            .path()
            .join(upload_file_name(upload.file_name.as_deref()));
        tokio::fs::write(&image, &upload.bytes)
            .await
            .map_err(ScanError::Upload)?;

        let response = self.ocr.recognise(OcrRequest::free_ocr(&image)).await?;
        let ocr_text = ocr_text_from_response(&response);
        let extraction = self.extractor.extract(&ocr_text).await;

        if let Err(e) = staging.close() {
            tracing::warn!("Failed to remove scan staging directory: {}", e);
        }

        Ok(ScanOutcome {
            success: extraction.success,
            ocr_text,
            data: extraction.data,
            error: extraction.error,
        })
    }

    fn staging_dir(&self) -> ScanResult<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("scan-");
        match &self.upload_dir {
            Some(dir) => builder.tempdir_in(dir),
            None => builder.tempdir(),
        }
        .map_err(ScanError::Upload)
    }
}

/// Reduces a client-supplied name to its final component so it cannot escape the staging
/// directory. Missing, blank, or traversal-only names fall back to [`DEFAULT_UPLOAD_NAME`].
pub fn upload_file_name(raw: Option<&str>) -> String {
    let candidate = raw
        .and_then(|name| name.rsplit(|c: char| c == '/' || c == '\\').next())
        .map(str::trim)
        .unwrap_or_default();
    Path::new(candidate)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_UPLOAD_NAME.to_string())
}
