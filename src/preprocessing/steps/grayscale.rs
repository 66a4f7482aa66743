use crate::error::OcrError;
use image::DynamicImage;

/// Convert image to single-channel luma; grayscale input passes through untouched
pub fn apply(image: DynamicImage) -> Result<DynamicImage, OcrError> {
    match image {
        DynamicImage::ImageLuma8(_) => Ok(image),
        other => Ok(DynamicImage::ImageLuma8(other.to_luma8())),
    }
}
