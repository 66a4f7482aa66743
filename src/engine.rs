use crate::error::OcrError;
use image::DynamicImage;

/// One row of engine output, exactly as the engine reported it.
///
/// Confidence stays a string here; engines report sentinel or non-numeric
/// values and interpreting them is left to `recognition::shape_tokens`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawToken {
    pub text: String,
    pub confidence: String,
}

impl RawToken {
    pub fn new(text: impl Into<String>, confidence: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            confidence: confidence.into(),
        }
    }
}

/// Trait that all OCR engines must implement
pub trait OcrEngine: Send + Sync {
    /// Returns the engine identifier (e.g., "tesseract")
    fn name(&self) -> &'static str;

    /// Returns a human-readable description of the engine
    fn description(&self) -> &'static str;

    /// Recognize text in a preprocessed image, returning per-token output in
    /// the engine's reading order. Blocking and CPU-bound.
    fn recognize(&self, image: &DynamicImage, lang: &str) -> Result<Vec<RawToken>, OcrError>;
}
