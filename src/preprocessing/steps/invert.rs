use crate::error::OcrError;
use image::DynamicImage;

/// Bitwise complement of every channel (swaps foreground/background of a binary image)
pub fn apply(mut image: DynamicImage) -> Result<DynamicImage, OcrError> {
    image.invert();
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    #[test]
    fn test_invert_complements_gray_values() {
        let img = GrayImage::from_fn(4, 1, |x, _| Luma([[0, 255, 100, 3][x as usize]]));

        let result = apply(DynamicImage::ImageLuma8(img)).unwrap().to_luma8();

        let values: Vec<u8> = result.pixels().map(|p| p.0[0]).collect();
        assert_eq!(values, vec![255, 0, 155, 252]);
    }

    #[test]
    fn test_invert_complements_each_color_channel() {
        let img = RgbImage::from_pixel(2, 2, Rgb([10, 128, 250]));

        let result = apply(DynamicImage::ImageRgb8(img)).unwrap();

        let DynamicImage::ImageRgb8(rgb) = result else {
            panic!("expected colour output");
        };
        assert_eq!(rgb.get_pixel(1, 1).0, [245, 127, 5]);
    }

    #[test]
    fn test_double_invert_is_identity() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_fn(6, 6, |x, y| Luma([(x * 40 + y) as u8])));
        let twice = apply(apply(img.clone()).unwrap()).unwrap();
        assert_eq!(twice, img);
    }
}
