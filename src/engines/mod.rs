//! OCR engine implementations
//!
//! Engines are conditionally compiled based on feature flags.

#[cfg(feature = "engine-tesseract")]
pub mod tesseract;

use crate::config::Config;
use crate::engine::OcrEngine;
use crate::error::OcrError;
use std::sync::Arc;

/// Build the OCR engine this binary was compiled with
pub fn create(config: &Config) -> Result<Arc<dyn OcrEngine>, OcrError> {
    #[cfg(feature = "engine-tesseract")]
    {
        tracing::info!("Initializing tesseract engine...");
        let engine = tesseract::TesseractEngine::new(config)?;
        tracing::info!("Using {} engine: {}", engine.name(), engine.description());
        Ok(Arc::new(engine))
    }

    #[cfg(not(feature = "engine-tesseract"))]
    {
        let _ = config;
        Err(OcrError::InitializationError(
            "No OCR engines available. Build with --features engine-tesseract".to_string(),
        ))
    }
}
