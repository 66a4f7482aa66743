use crate::error::OcrError;
use image::{DynamicImage, GrayImage, Luma};

use super::blur::{convolve_separable, gaussian_kernel, to_u8};

/// Adaptive threshold parameters
const BLOCK_SIZE: u32 = 11;
const BIAS: i32 = 2;

/// Apply adaptive Gaussian thresholding.
/// Colour input is reduced to luma first; output is strictly 0 or 255.
pub fn apply(image: DynamicImage) -> Result<DynamicImage, OcrError> {
    let gray = match image {
        DynamicImage::ImageLuma8(gray) => gray,
        other => other.to_luma8(),
    };
    let binarized = adaptive_gaussian_threshold(&gray, BLOCK_SIZE, BIAS);
    Ok(DynamicImage::ImageLuma8(binarized))
}

/// For each pixel, threshold = gaussian-weighted mean of the
/// `block_size` x `block_size` neighbourhood minus `bias`.
/// The mean is rounded to an integer before comparing.
/// Pixels strictly above their threshold become white.
fn adaptive_gaussian_threshold(img: &GrayImage, block_size: u32, bias: i32) -> GrayImage {
    let (width, height) = img.dimensions();
    let local_mean = convolve_separable(img.as_raw(), width, height, 1, &gaussian_kernel(block_size));

    GrayImage::from_fn(width, height, |x, y| {
        let pixel = i32::from(img.get_pixel(x, y).0[0]);
        let mean = i32::from(to_u8(local_mean[(y * width + x) as usize]));
        if pixel - mean > -bias {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}
