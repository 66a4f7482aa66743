use crate::error::OcrError;
use image::DynamicImage;
use std::time::Instant;

use super::steps;

/// Preprocessing toggles for a single request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreprocessConfig {
    pub grayscale: bool,
    /// Nonzero enables adaptive thresholding. The value itself is not used
    /// as a cutoff; the cutoff is computed per pixel.
    pub threshold: u8,
    pub invert: bool,
    /// Blur strength (0-25); 0 disables blurring
    pub blur: u8,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            grayscale: true,
            threshold: 180,
            invert: false,
            blur: 0,
        }
    }
}

/// Preprocessing pipeline; step order is fixed, the config only switches steps on or off
pub struct Pipeline {
    config: PreprocessConfig,
}

impl Pipeline {
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    /// Process an image according to the configured toggles
    pub fn process(&self, image: DynamicImage) -> Result<DynamicImage, OcrError> {
        let start = Instant::now();
        let mut img = image;

        if self.config.grayscale {
            img = self.run_step("grayscale", img, steps::grayscale::apply)?;
        }

        if self.config.blur > 0 {
            let blur = self.config.blur;
            img = self.run_step("blur", img, |img| steps::blur::apply(img, blur))?;
        }

        if self.config.threshold > 0 {
            img = self.run_step("threshold", img, steps::threshold::apply)?;
        }

        if self.config.invert {
            img = self.run_step("invert", img, steps::invert::apply)?;
        }

        tracing::debug!(
            "Preprocessing finished in {}ms ({:?})",
            start.elapsed().as_millis(),
            self.config
        );

        Ok(img)
    }

    fn run_step<F>(&self, name: &str, img: DynamicImage, step_fn: F) -> Result<DynamicImage, OcrError>
    where
        F: FnOnce(DynamicImage) -> Result<DynamicImage, OcrError>,
    {
        let step_start = Instant::now();
        let result = step_fn(img)?;
        tracing::debug!("Step {} took {}ms", name, step_start.elapsed().as_millis());
        Ok(result)
    }
}

/// Run the preprocessing pipeline once
pub fn preprocess(image: DynamicImage, config: &PreprocessConfig) -> Result<DynamicImage, OcrError> {
    Pipeline::new(*config).process(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    fn sample_image() -> DynamicImage {
        // Light page with a dark bar and a colour gradient
        let img = RgbImage::from_fn(40, 24, |x, y| {
            if (8..32).contains(&x) && (10..14).contains(&y) {
                Rgb([15, 20, 25])
            } else {
                Rgb([200 + (x as u8 % 40), 220, 180 + (y as u8 * 2)])
            }
        });
        DynamicImage::ImageRgb8(img)
    }

    fn all_configs() -> Vec<PreprocessConfig> {
        let mut configs = Vec::new();
        for grayscale in [false, true] {
            for threshold in [0, 1, 180, 255] {
                for invert in [false, true] {
                    for blur in [0, 1, 2, 3, 4, 24, 25] {
                        configs.push(PreprocessConfig {
                            grayscale,
                            threshold,
                            invert,
                            blur,
                        });
                    }
                }
            }
        }
        configs
    }

    #[test]
    fn test_preserves_dimensions_for_every_config() {
        for config in all_configs() {
            let result = preprocess(sample_image(), &config).unwrap();
            assert_eq!(
                (result.width(), result.height()),
                (40, 24),
                "dimensions changed for {:?}",
                config
            );
        }
    }

    #[test]
    fn test_is_deterministic() {
        for config in all_configs() {
            let first = preprocess(sample_image(), &config).unwrap();
            let second = preprocess(sample_image(), &config).unwrap();
            assert_eq!(first.as_bytes(), second.as_bytes(), "differs for {:?}", config);
        }
    }

    #[test]
    fn test_all_steps_disabled_is_passthrough() {
        let config = PreprocessConfig {
            grayscale: false,
            threshold: 0,
            invert: false,
            blur: 0,
        };
        let input = sample_image();
        let result = preprocess(input.clone(), &config).unwrap();
        assert_eq!(result, input);
    }

    #[test]
    fn test_default_config_produces_binary_grayscale() {
        let result = preprocess(sample_image(), &PreprocessConfig::default()).unwrap();

        let DynamicImage::ImageLuma8(gray) = result else {
            panic!("expected single-channel output");
        };
        assert!(gray.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
        // Dark bar comes out black on a white page
        assert_eq!(gray.get_pixel(20, 11).0[0], 0);
        assert_eq!(gray.get_pixel(20, 2).0[0], 255);
    }

    #[test]
    fn test_invert_runs_after_threshold() {
        let config = PreprocessConfig {
            invert: true,
            ..PreprocessConfig::default()
        };
        let result = preprocess(sample_image(), &config).unwrap().to_luma8();

        // Foreground and background swapped
        assert_eq!(result.get_pixel(20, 11).0[0], 255);
        assert_eq!(result.get_pixel(20, 2).0[0], 0);
    }

    #[test]
    fn test_color_kept_without_grayscale_or_threshold() {
        let config = PreprocessConfig {
            grayscale: false,
            threshold: 0,
            invert: true,
            blur: 3,
        };
        let result = preprocess(sample_image(), &config).unwrap();
        assert!(matches!(result, DynamicImage::ImageRgb8(_)));
    }

    #[test]
    fn test_threshold_on_color_input_does_not_fail() {
        let config = PreprocessConfig {
            grayscale: false,
            ..PreprocessConfig::default()
        };
        let result = preprocess(sample_image(), &config).unwrap();
        assert!(matches!(result, DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn test_grayscale_input_passes_through_grayscale_step() {
        let gray = GrayImage::from_pixel(5, 5, Luma([77]));
        let config = PreprocessConfig {
            grayscale: true,
            threshold: 0,
            invert: false,
            blur: 0,
        };
        let result = preprocess(DynamicImage::ImageLuma8(gray.clone()), &config).unwrap();
        assert_eq!(result, DynamicImage::ImageLuma8(gray));
    }
}
