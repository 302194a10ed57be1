use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, DEFAULT_MAX_UPLOAD_BYTES};
use records_core::{CoreConfig, Database, config::database_path_from_env_value};
use records_scan::{
    ExtractionSettings, GradioOcrClient, OcrSettings, ScanPipeline, StructuredExtractor,
    TextGenerator, build_text_generator,
};

/// Reads an optional byte limit; unset or blank falls back to the default.
fn max_upload_bytes_from_env_value(value: Option<String>) -> anyhow::Result<usize> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(DEFAULT_MAX_UPLOAD_BYTES),
        Some(raw) => raw
            .parse()
            .with_context(|| format!("SCAN_MAX_UPLOAD_BYTES must be a byte count, got '{raw}'")),
    }
}

/// Main entry point for the health records service
///
/// Resolves configuration, prepares the database schema, wires the scan collaborators and
/// serves the REST API.
///
/// # Environment Variables
/// - `RECORDS_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `RECORDS_DATABASE_PATH`: SQLite database file (default: "health_records.db")
/// - `OCR_SPACE_URL`: Gradio OCR space base URL
/// - `SCAN_UPLOAD_DIR`: parent directory for per-request upload staging (default: system temp)
/// - `SCAN_MAX_UPLOAD_BYTES`: scan upload body limit (default: 10 MiB)
/// - `GEMINI_API_KEY`, `GEMINI_MODEL`, `GEMINI_SYSTEM_PROMPT`: structured extraction
///
/// # Errors
/// Returns an error if:
/// - configuration values are invalid,
/// - the database schema cannot be created,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("records=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("RECORDS_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let cfg = CoreConfig::new(database_path_from_env_value(
        std::env::var("RECORDS_DATABASE_PATH").ok(),
    ))?;
    let db = Database::new(&cfg);
    db.initialise_schema()?;

    let ocr_settings = OcrSettings::from_env_values(
        std::env::var("OCR_SPACE_URL").ok(),
        std::env::var("SCAN_UPLOAD_DIR").ok(),
    );
    let extraction_settings = ExtractionSettings::from_env_values(
        std::env::var("GEMINI_API_KEY").ok(),
        std::env::var("GEMINI_MODEL").ok(),
        std::env::var("GEMINI_SYSTEM_PROMPT").ok(),
    );
    let max_upload_bytes =
        max_upload_bytes_from_env_value(std::env::var("SCAN_MAX_UPLOAD_BYTES").ok())?;

    let generator = build_text_generator(&extraction_settings);
    tracing::info!(
        "-- OCR space {}; extraction via {} ({})",
        ocr_settings.space_url(),
        generator.name(),
        extraction_settings.model()
    );
    let pipeline = ScanPipeline::new(
        Arc::new(GradioOcrClient::new(ocr_settings.space_url())),
        StructuredExtractor::new(generator, &extraction_settings),
        &ocr_settings,
    );

    let state = AppState::new(db, Arc::new(pipeline)).with_max_upload_bytes(max_upload_bytes);
    let app = api_rest::router(state);

    tracing::info!("++ Starting health records REST on {}", rest_addr);
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
