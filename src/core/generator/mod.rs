//! # Generator Module
//!
//! Turns source images into small JPEG thumbnails.
//!
//! ## How It Works
//! 1. Decode the source bytes (zune-jpeg fast path for JPEG)
//! 2. Scale so the longer side fits the target, never enlarging
//! 3. Resize with `fast_image_resize`
//! 4. Re-encode as JPEG at the configured quality
//!
//! Decoded bitmaps are owned buffers and are dropped on every exit path.

pub mod decode;
pub mod resize;

pub use decode::{FastDecoder, SourceFormat};
pub use resize::{thumbnail_dimensions, FastResizer};

use crate::error::GenerateError;
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use std::borrow::Cow;
use std::path::PathBuf;

/// Where a thumbnail's source image comes from
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// Raw image bytes already in memory
    Bytes(Vec<u8>),
    /// An image file on disk
    File(PathBuf),
}

impl ImageSource {
    /// Read the source image bytes
    pub fn load(&self) -> Result<Cow<'_, [u8]>, GenerateError> {
        match self {
            ImageSource::Bytes(bytes) => Ok(Cow::Borrowed(bytes)),
            ImageSource::File(path) => std::fs::read(path)
                .map(Cow::Owned)
                .map_err(|e| GenerateError::IoError {
                    path: path.clone(),
                    source: e,
                }),
        }
    }
}

impl From<Vec<u8>> for ImageSource {
    fn from(bytes: Vec<u8>) -> Self {
        ImageSource::Bytes(bytes)
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        ImageSource::File(path)
    }
}

/// Produces encoded thumbnail bytes from source image bytes
pub trait ThumbnailGenerator: Send + Sync {
    /// Downscale `source` so its longer side is at most
    /// `target_max_dimension` and re-encode it at `quality` (0.0-1.0).
    fn generate(
        &self,
        source: &[u8],
        target_max_dimension: u32,
        quality: f32,
    ) -> Result<Vec<u8>, GenerateError>;
}

/// Production generator: decode, resize, JPEG encode
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegThumbnailer;

impl JpegThumbnailer {
    pub fn new() -> Self {
        Self
    }
}

/// Map a 0.0-1.0 quality factor to the JPEG encoder's 1-100 scale
pub fn jpeg_quality(quality: f32) -> u8 {
    if !quality.is_finite() {
        return 80;
    }
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

impl ThumbnailGenerator for JpegThumbnailer {
    fn generate(
        &self,
        source: &[u8],
        target_max_dimension: u32,
        quality: f32,
    ) -> Result<Vec<u8>, GenerateError> {
        let image = FastDecoder::decode(source)?;
        let (width, height) =
            thumbnail_dimensions(image.width(), image.height(), target_max_dimension);

        let thumbnail = FastResizer::new().resize_rgb(&image, width, height)?;
        drop(image);

        let mut encoded = Vec::new();
        JpegEncoder::new_with_quality(&mut encoded, jpeg_quality(quality))
            .encode(thumbnail.as_raw(), width, height, ExtendedColorType::Rgb8)
            .map_err(|e| GenerateError::EncodeFailed(e.to_string()))?;

        Ok(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn decoded_dimensions(bytes: &[u8]) -> (u32, u32) {
        let image = image::load_from_memory(bytes).unwrap();
        (image.width(), image.height())
    }

    #[test]
    fn output_is_jpeg() {
        let thumb = JpegThumbnailer.generate(&png_bytes(400, 300), 200, 0.8).unwrap();
        assert_eq!(SourceFormat::sniff(&thumb), SourceFormat::Jpeg);
    }

    #[test]
    fn output_fits_target_and_keeps_aspect() {
        let thumb = JpegThumbnailer.generate(&png_bytes(800, 600), 200, 0.8).unwrap();
        assert_eq!(decoded_dimensions(&thumb), (200, 150));
    }

    #[test]
    fn small_source_keeps_its_size() {
        let thumb = JpegThumbnailer.generate(&png_bytes(64, 32), 200, 0.8).unwrap();
        assert_eq!(decoded_dimensions(&thumb), (64, 32));
    }

    #[test]
    fn transparent_source_is_encoded() {
        let img = RgbaImage::from_pixel(50, 50, Rgba([255, 0, 0, 0]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();

        let thumb = JpegThumbnailer.generate(&out.into_inner(), 20, 0.8).unwrap();
        assert_eq!(decoded_dimensions(&thumb), (20, 20));
    }

    #[test]
    fn undecodable_source_fails() {
        let result = JpegThumbnailer.generate(b"not an image", 200, 0.8);
        assert!(matches!(result, Err(GenerateError::DecodeError { .. })));
    }

    #[test]
    fn quality_mapping_is_clamped() {
        assert_eq!(jpeg_quality(0.8), 80);
        assert_eq!(jpeg_quality(0.0), 1);
        assert_eq!(jpeg_quality(1.5), 100);
        assert_eq!(jpeg_quality(f32::NAN), 80);
    }

    #[test]
    fn missing_file_source_reports_path() {
        let source = ImageSource::File(PathBuf::from("/definitely/not/here.jpg"));
        match source.load() {
            Err(GenerateError::IoError { path, .. }) => {
                assert_eq!(path, PathBuf::from("/definitely/not/here.jpg"))
            }
            other => panic!("unexpected result: {:?}", other.map(|b| b.len())),
        }
    }
}
