use crate::config::Config;
use crate::engines;
use crate::error::OcrError;
use crate::pool::BlockingPool;
use crate::preprocessing::{self, PreprocessConfig};
use crate::recognition::{OcrResult, RecognitionConfig, Recognizer};
use axum::{
    body::Bytes,
    extract::{
        multipart::MultipartError, rejection::QueryRejection, DefaultBodyLimit, Multipart, Query,
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Room for multipart framing on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub recognizer: Recognizer,
    pub pool: BlockingPool,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, recognizer: Recognizer) -> Self {
        Self {
            recognizer,
            pool: BlockingPool::new(config.workers),
            config: Arc::new(config),
        }
    }
}

/// OCR response; `error` is only present when the upload could not be decoded
#[derive(Debug, Serialize)]
pub struct OcrResponse {
    #[serde(flatten)]
    pub result: OcrResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OcrResponse {
    fn invalid_image() -> Self {
        Self {
            result: OcrResult::default(),
            error: Some(OcrError::InvalidImage.to_string()),
        }
    }
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Query parameters accepted by `POST /ocr`
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct OcrParams {
    #[serde(deserialize_with = "deserialize_flag")]
    pub grayscale: bool,
    pub threshold: i64,
    #[serde(deserialize_with = "deserialize_flag")]
    pub invert: bool,
    pub blur: i64,
    pub lang: Option<String>,
    #[serde(alias = "minConfidence")]
    pub min_confidence: i64,
}

impl Default for OcrParams {
    fn default() -> Self {
        let preprocess = PreprocessConfig::default();
        Self {
            grayscale: preprocess.grayscale,
            threshold: i64::from(preprocess.threshold),
            invert: preprocess.invert,
            blur: i64::from(preprocess.blur),
            lang: None,
            min_confidence: 0,
        }
    }
}

impl OcrParams {
    /// Range-check the parameters and split them into the two stage configs
    pub fn validate(
        self,
        default_language: &str,
    ) -> Result<(PreprocessConfig, RecognitionConfig), OcrError> {
        let preprocess = PreprocessConfig {
            grayscale: self.grayscale,
            threshold: in_range("threshold", self.threshold, 255)?,
            invert: self.invert,
            blur: in_range("blur", self.blur, 25)?,
        };

        let lang = match self.lang.as_deref().map(str::trim) {
            Some(lang) if !lang.is_empty() => lang.to_string(),
            _ => default_language.to_string(),
        };
        if !is_valid_language(&lang) {
            return Err(OcrError::InvalidRequest(format!(
                "lang must be language codes joined by '+', got '{}'",
                lang
            )));
        }

        let recognition = RecognitionConfig {
            lang,
            min_confidence: in_range("min_confidence", self.min_confidence, 100)?,
        };

        Ok((preprocess, recognition))
    }
}

fn in_range(name: &str, value: i64, max: u8) -> Result<u8, OcrError> {
    u8::try_from(value)
        .ok()
        .filter(|v| *v <= max)
        .ok_or_else(|| {
            OcrError::InvalidRequest(format!("{} must be between 0 and {}, got {}", name, max, value))
        })
}

/// Language names such as "vie", "chi_sim", "eng+vie" or "script/Latin"
fn is_valid_language(lang: &str) -> bool {
    lang.split('+').all(|code| {
        let mut parts = code.split('/');
        let valid_part = |part: &str| {
            !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        };
        // At most one directory level, e.g. "script/Latin"
        let first = parts.next().is_some_and(valid_part);
        let second = parts.next().map_or(true, valid_part);
        first && second && parts.next().is_none()
    })
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_flag(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("expected a boolean, got '{}'", raw)))
}

/// Build the router for an explicitly constructed state
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_file_size.saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/health", get(handle_health))
        .route("/ocr", get(handle_ocr_probe).post(handle_ocr))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}

/// Run the HTTP server
pub async fn run(config: Config) -> anyhow::Result<()> {
    let engine = engines::create(&config)?;
    let addr = format!("{}:{}", config.host, config.port);

    let state = AppState::new(config, Recognizer::new(engine));
    tracing::info!("OCR worker pool ready with {} slots", state.pool.size());
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining in-flight requests...");
}

/// Handle OCR requests
async fn handle_ocr(
    State(state): State<AppState>,
    query: Result<Query<OcrParams>, QueryRejection>,
    mut multipart: Multipart,
) -> Result<Json<OcrResponse>, OcrError> {
    let start = Instant::now();

    let Query(params) = query.map_err(|e| OcrError::InvalidRequest(e.body_text()))?;
    let (preprocess_config, recognition_config) =
        params.validate(&state.config.default_language)?;

    let mut file_data: Option<Bytes> = None;

    // Parse multipart form
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Failed to parse multipart", e, state.config.max_file_size))?
    {
        if field.name() == Some("file") {
            file_data = Some(field.bytes().await.map_err(|e| {
                multipart_error("Failed to read file data", e, state.config.max_file_size)
            })?);
        }
    }

    let data = file_data.ok_or(OcrError::MissingFile)?;

    if data.len() > state.config.max_file_size {
        return Err(OcrError::ImageTooLarge {
            size: data.len(),
            max: state.config.max_file_size,
        });
    }

    let upload_size = data.len();
    let recognizer = state.recognizer.clone();
    let job_recognition = recognition_config.clone();

    let outcome = state
        .pool
        .submit(move || {
            let image = preprocessing::decode(&data)?;
            let image = preprocessing::preprocess(image, &preprocess_config)?;
            recognizer.recognize(&image, &job_recognition)
        })
        .await;

    let result = match outcome {
        Ok(result) => result,
        Err(OcrError::InvalidImage) => {
            tracing::warn!("Rejected undecodable upload of {} bytes", upload_size);
            return Ok(Json(OcrResponse::invalid_image()));
        }
        Err(e) => {
            tracing::error!(
                "OCR failed with {} (lang: {}): {}",
                state.recognizer.engine_name(),
                recognition_config.lang,
                e
            );
            return Err(e);
        }
    };

    tracing::info!(
        "OCR completed in {}ms, tokens: {}, lang: {}, min_confidence: {}, preprocess: {:?}",
        start.elapsed().as_millis(),
        result.items.len(),
        recognition_config.lang,
        recognition_config.min_confidence,
        preprocess_config
    );

    Ok(Json(OcrResponse {
        result,
        error: None,
    }))
}

/// Body-limit failures keep their 413; anything else is a malformed request
fn multipart_error(context: &str, e: MultipartError, max_file_size: usize) -> OcrError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        OcrError::UploadTooLarge { max: max_file_size }
    } else {
        OcrError::InvalidRequest(format!("{}: {}", context, e))
    }
}

/// Handle health check requests
async fn handle_health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Reachability probe for clients (`GET`/`HEAD /ocr`)
async fn handle_ocr_probe() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}
