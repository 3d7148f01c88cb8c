//! Fast SIMD-accelerated thumbnail resizing.
//!
//! Uses fast_image_resize, which picks AVX2/NEON code paths when available.

use crate::error::GenerateError;
use fast_image_resize::{images::Image, FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{DynamicImage, RgbImage};

/// Output size for a thumbnail bounded by `target_max_dimension`.
///
/// Aspect ratio is preserved, images are never enlarged, and neither side
/// collapses below one pixel.
pub fn thumbnail_dimensions(width: u32, height: u32, target_max_dimension: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest == 0 {
        return (0, 0);
    }

    let scale = (target_max_dimension as f64 / longest as f64).min(1.0);
    let scaled = |side: u32| ((side as f64 * scale).round() as u32).max(1);

    (scaled(width), scaled(height))
}

/// Reusable RGB resizer
pub struct FastResizer {
    resizer: Resizer,
}

impl FastResizer {
    pub fn new() -> Self {
        Self {
            resizer: Resizer::new(),
        }
    }

    /// Flatten to RGB and resize to exactly `width` x `height`.
    pub fn resize_rgb(
        &mut self,
        image: &DynamicImage,
        width: u32,
        height: u32,
    ) -> Result<RgbImage, GenerateError> {
        let rgb = image.to_rgb8();
        let (src_width, src_height) = rgb.dimensions();

        if src_width == 0 || src_height == 0 {
            return Err(GenerateError::EmptyImage);
        }

        if width == 0 || height == 0 {
            return Err(GenerateError::ResizeFailed(
                "Invalid destination dimensions".to_string(),
            ));
        }

        if (src_width, src_height) == (width, height) {
            return Ok(rgb);
        }

        let src_image = Image::from_vec_u8(src_width, src_height, rgb.into_raw(), PixelType::U8x3)
            .map_err(|e| GenerateError::ResizeFailed(format!("Failed to create source image: {}", e)))?;

        let mut dst_image = Image::new(width, height, PixelType::U8x3);

        // Lanczos3 keeps thumbnail edges crisp
        let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Lanczos3));

        self.resizer
            .resize(&src_image, &mut dst_image, &options)
            .map_err(|e| GenerateError::ResizeFailed(e.to_string()))?;

        RgbImage::from_raw(width, height, dst_image.into_vec()).ok_or_else(|| {
            GenerateError::ResizeFailed("Failed to create result buffer".to_string())
        })
    }
}

impl Default for FastResizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb, Rgba};

    fn create_test_image(width: u32, height: u32) -> DynamicImage {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            let r = (x * 255 / width.max(1)) as u8;
            let g = (y * 255 / height.max(1)) as u8;
            let b = ((x + y) * 128 / (width + height).max(1)) as u8;
            Rgb([r, g, b])
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn landscape_is_bounded_by_width() {
        assert_eq!(thumbnail_dimensions(800, 600, 200), (200, 150));
    }

    #[test]
    fn portrait_is_bounded_by_height() {
        assert_eq!(thumbnail_dimensions(600, 800, 200), (150, 200));
    }

    #[test]
    fn small_images_are_not_enlarged() {
        assert_eq!(thumbnail_dimensions(120, 80, 200), (120, 80));
    }

    #[test]
    fn extreme_aspect_keeps_one_pixel() {
        assert_eq!(thumbnail_dimensions(10_000, 10, 200), (200, 1));
    }

    #[test]
    fn dimensions_round_to_nearest() {
        // 333 * (200 / 1000) = 66.6
        assert_eq!(thumbnail_dimensions(1000, 333, 200), (200, 67));
    }

    #[test]
    fn resize_produces_requested_dimensions() {
        let mut resizer = FastResizer::new();
        let resized = resizer.resize_rgb(&create_test_image(400, 300), 200, 150).unwrap();

        assert_eq!(resized.dimensions(), (200, 150));
    }

    #[test]
    fn resize_flattens_alpha() {
        let rgba = ImageBuffer::from_pixel(40, 40, Rgba([10u8, 20, 30, 128]));
        let mut resizer = FastResizer::new();

        let resized = resizer
            .resize_rgb(&DynamicImage::ImageRgba8(rgba), 20, 20)
            .unwrap();

        assert_eq!(resized.dimensions(), (20, 20));
    }

    #[test]
    fn resize_rejects_zero_destination() {
        let mut resizer = FastResizer::new();
        let result = resizer.resize_rgb(&create_test_image(10, 10), 0, 5);
        assert!(matches!(result, Err(GenerateError::ResizeFailed(_))));
    }

    #[test]
    fn resizer_reuse() {
        let mut resizer = FastResizer::new();
        let image = create_test_image(100, 100);

        let first = resizer.resize_rgb(&image, 50, 50).unwrap();
        let second = resizer.resize_rgb(&image, 50, 50).unwrap();

        assert_eq!(first.as_raw(), second.as_raw());
    }
}
