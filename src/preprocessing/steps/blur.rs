use crate::error::OcrError;
use image::{DynamicImage, GrayImage, Luma, Rgb, RgbImage};

/// Fixed taps used for small kernels when sigma is derived from the size
const SMALL_KERNELS: [&[f32]; 4] = [
    &[1.0],
    &[0.25, 0.5, 0.25],
    &[0.0625, 0.25, 0.375, 0.25, 0.0625],
    &[0.03125, 0.109375, 0.21875, 0.28125, 0.21875, 0.109375, 0.03125],
];

/// Odd kernel size for a blur strength: `max(1, 2 * floor(blur / 2) + 1)`
pub fn kernel_size(blur: u8) -> u32 {
    (2 * (u32::from(blur) / 2) + 1).max(1)
}

/// Normalized 1D Gaussian kernel of odd `size`, sigma derived from the size
pub fn gaussian_kernel(size: u32) -> Vec<f32> {
    debug_assert!(size % 2 == 1, "kernel size must be odd");

    if let Some(taps) = SMALL_KERNELS.get((size / 2) as usize) {
        return taps.to_vec();
    }

    let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let half = (size / 2) as i32;
    let mut kernel: Vec<f32> = (-half..=half)
        .map(|i| (-((i * i) as f32) / (2.0 * sigma * sigma)).exp())
        .collect();

    let sum: f32 = kernel.iter().sum();
    for tap in &mut kernel {
        *tap /= sum;
    }
    kernel
}

/// Gaussian blur; single-channel input stays single-channel, anything else is blurred as RGB
pub fn apply(image: DynamicImage, blur: u8) -> Result<DynamicImage, OcrError> {
    let kernel = gaussian_kernel(kernel_size(blur));
    if kernel.len() == 1 {
        return Ok(image);
    }

    let blurred = match image {
        DynamicImage::ImageLuma8(gray) => {
            let (width, height) = gray.dimensions();
            let filtered = convolve_separable(gray.as_raw(), width, height, 1, &kernel);
            DynamicImage::ImageLuma8(GrayImage::from_fn(width, height, |x, y| {
                let i = (y * width + x) as usize;
                Luma([to_u8(filtered[i])])
            }))
        }
        other => {
            let rgb = other.to_rgb8();
            let (width, height) = rgb.dimensions();
            let filtered = convolve_separable(rgb.as_raw(), width, height, 3, &kernel);
            DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
                let i = (y * width + x) as usize * 3;
                Rgb([
                    to_u8(filtered[i]),
                    to_u8(filtered[i + 1]),
                    to_u8(filtered[i + 2]),
                ])
            }))
        }
    };
    Ok(blurred)
}

/// Round a filtered sample back to 8 bits
pub(crate) fn to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Correlate interleaved 8-bit samples with `kernel` along rows, then columns.
///
/// Runs in floating point with no intermediate rounding; borders replicate
/// the edge pixel. Returns one `f32` per input sample.
pub(crate) fn convolve_separable(
    samples: &[u8],
    width: u32,
    height: u32,
    channels: usize,
    kernel: &[f32],
) -> Vec<f32> {
    let (w, h) = (width as usize, height as usize);
    if w == 0 || h == 0 {
        return Vec::new();
    }
    let half = (kernel.len() / 2) as isize;
    let clamp_to = |i: isize, len: usize| i.clamp(0, len as isize - 1) as usize;

    let mut horizontal = vec![0.0f32; w * h * channels];
    for y in 0..h {
        for x in 0..w {
            for c in 0..channels {
                horizontal[(y * w + x) * channels + c] = kernel
                    .iter()
                    .enumerate()
                    .map(|(k, tap)| {
                        let sx = clamp_to(x as isize + k as isize - half, w);
                        tap * f32::from(samples[(y * w + sx) * channels + c])
                    })
                    .sum();
            }
        }
    }

    let mut output = vec![0.0f32; w * h * channels];
    for y in 0..h {
        for x in 0..w {
            for c in 0..channels {
                output[(y * w + x) * channels + c] = kernel
                    .iter()
                    .enumerate()
                    .map(|(k, tap)| {
                        let sy = clamp_to(y as isize + k as isize - half, h);
                        tap * horizontal[(sy * w + x) * channels + c]
                    })
                    .sum();
            }
        }
    }

    output
}
