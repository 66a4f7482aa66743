//! Recognition adapter
//!
//! Runs the OCR engine on a preprocessed image and turns its raw per-token
//! output into a filtered, typed [`OcrResult`].

use crate::engine::{OcrEngine, RawToken};
use crate::error::OcrError;
use image::DynamicImage;
use serde::Serialize;
use std::sync::Arc;

/// Per-request recognition settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionConfig {
    pub lang: String,
    /// Tokens with a numeric confidence below this value are dropped (0-100)
    pub min_confidence: u8,
}

/// A recognized word
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub text: String,
    /// `None` when the engine reported no usable number
    pub confidence: Option<f64>,
}

/// Filtered OCR output; `text[i]` is always `items[i].text`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OcrResult {
    pub text: Vec<String>,
    pub items: Vec<Token>,
}

impl OcrResult {
    fn from_items(items: Vec<Token>) -> Self {
        Self {
            text: items.iter().map(|item| item.text.clone()).collect(),
            items,
        }
    }
}

/// Couples an engine with the token shaping rules
#[derive(Clone)]
pub struct Recognizer {
    engine: Arc<dyn OcrEngine>,
}

impl Recognizer {
    pub fn new(engine: Arc<dyn OcrEngine>) -> Self {
        Self { engine }
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    /// Run the engine and shape its output. Blocking: call through the worker pool.
    pub fn recognize(
        &self,
        image: &DynamicImage,
        config: &RecognitionConfig,
    ) -> Result<OcrResult, OcrError> {
        let raw = self.engine.recognize(image, &config.lang)?;
        let raw_count = raw.len();
        let result = shape_tokens(raw, config.min_confidence);

        tracing::debug!(
            "{} returned {} raw tokens, kept {} (min_confidence: {})",
            self.engine.name(),
            raw_count,
            result.items.len(),
            config.min_confidence
        );

        Ok(result)
    }
}

/// Filter and reshape raw engine tokens, preserving engine order.
///
/// Drops tokens that are empty after trimming and tokens whose confidence is
/// numeric and below `min_confidence`. Tokens without a usable confidence are
/// kept regardless of the cutoff.
pub fn shape_tokens<I>(raw: I, min_confidence: u8) -> OcrResult
where
    I: IntoIterator<Item = RawToken>,
{
    let min_confidence = f64::from(min_confidence);

    let items = raw
        .into_iter()
        .filter_map(|token| {
            let text = token.text.trim();
            if text.is_empty() {
                return None;
            }

            let confidence = parse_confidence(&token.confidence);
            if matches!(confidence, Some(c) if c < min_confidence) {
                return None;
            }

            Some(Token {
                text: text.to_string(),
                confidence,
            })
        })
        .collect();

    OcrResult::from_items(items)
}

fn parse_confidence(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}
