//! Image preprocessing for OCR
//!
//! Decodes uploads and runs the fixed grayscale -> blur -> threshold -> invert
//! pipeline.

pub mod pipeline;
pub mod steps;

pub use pipeline::{preprocess, PreprocessConfig};

use crate::error::OcrError;
use image::DynamicImage;

/// Decode an uploaded image as 8-bit colour; the format is sniffed from content.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage, OcrError> {
    let image = image::load_from_memory(bytes).map_err(|e| {
        tracing::warn!("Failed to decode upload ({} bytes): {}", bytes.len(), e);
        OcrError::InvalidImage
    })?;

    Ok(DynamicImage::ImageRgb8(image.into_rgb8()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    #[test]
    fn test_decode_rejects_non_image_bytes() {
        let err = decode(b"definitely not an image").unwrap_err();
        assert!(matches!(err, OcrError::InvalidImage));
    }

    #[test]
    fn test_decode_rejects_empty_input() {
        assert!(matches!(decode(&[]), Err(OcrError::InvalidImage)));
    }

    #[test]
    fn test_decode_png_drops_alpha() {
        let img = RgbaImage::from_pixel(7, 3, Rgba([10, 20, 30, 128]));
        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();

        let decoded = decode(&png).unwrap();

        assert!(matches!(decoded, DynamicImage::ImageRgb8(_)));
        assert_eq!((decoded.width(), decoded.height()), (7, 3));
    }
}
