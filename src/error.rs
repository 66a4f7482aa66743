use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::recognition::Token;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Invalid image")]
    InvalidImage,

    #[error("Failed to initialize OCR engine: {0}")]
    InitializationError(String),

    #[error("Failed to process image: {0}")]
    ProcessingError(String),

    #[error("Language data unavailable: {0}")]
    LanguageDataUnavailable(String),

    #[error("Image too large: {size} bytes (max: {max} bytes)")]
    ImageTooLarge { size: usize, max: usize },

    #[error("Upload exceeds the maximum size of {max} bytes")]
    UploadTooLarge { max: usize },

    #[error("Missing file")]
    MissingFile,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl OcrError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            OcrError::InvalidImage => (StatusCode::OK, "INVALID_IMAGE"),
            OcrError::InitializationError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INIT_ERROR"),
            OcrError::ProcessingError(_) => (StatusCode::INTERNAL_SERVER_ERROR, "PROCESSING_ERROR"),
            OcrError::LanguageDataUnavailable(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "LANGUAGE_DATA_UNAVAILABLE",
            ),
            OcrError::ImageTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "IMAGE_TOO_LARGE"),
            OcrError::UploadTooLarge { .. } => (StatusCode::PAYLOAD_TOO_LARGE, "IMAGE_TOO_LARGE"),
            OcrError::MissingFile => (StatusCode::BAD_REQUEST, "MISSING_FILE"),
            OcrError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            OcrError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

/// Error body; keeps the `text`/`items` shape of a successful OCR response
/// so clients can always read both arrays.
#[derive(Serialize)]
pub struct ErrorResponse {
    pub text: Vec<String>,
    pub items: Vec<Token>,
    pub error: String,
    pub code: String,
}

impl IntoResponse for OcrError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let body = Json(ErrorResponse {
            text: Vec::new(),
            items: Vec::new(),
            error: self.to_string(),
            code: code.to_string(),
        });

        (status, body).into_response()
    }
}
