//! Image Encoders
//!
//! One lossy encoder per output format behind a common trait, so the
//! optimizer can re-encode a borrowed pixel buffer at different qualities
//! and tests can substitute their own.

use std::sync::Arc;
use image::{codecs::jpeg, Rgb, RgbImage, RgbaImage};

use crate::models::ImageFormat;
use super::image::ImageError;

/// Encodes an RGBA buffer at a given quality
pub trait ImageEncoder: Send + Sync {
    /// Format produced by this encoder
    fn format(&self) -> ImageFormat;

    /// Encode `pixels` at `quality` (1-100)
    fn encode(&self, pixels: &RgbaImage, quality: u8) -> Result<Vec<u8>, ImageError>;
}

/// Lossy WebP through libwebp
#[derive(Debug, Default, Clone, Copy)]
pub struct WebPEncoder;

impl ImageEncoder for WebPEncoder {
    fn format(&self) -> ImageFormat {
        ImageFormat::WebP
    }

    fn encode(&self, pixels: &RgbaImage, quality: u8) -> Result<Vec<u8>, ImageError> {
        let encoder = webp::Encoder::from_rgba(pixels.as_raw(), pixels.width(), pixels.height());
        let memory = encoder
            .encode_simple(false, quality.clamp(1, 100) as f32)
            .map_err(|e| ImageError::Encode {
                format: "webp",
                reason: format!("{:?}", e),
            })?;

        Ok(memory.to_vec())
    }
}

/// Baseline JPEG; transparent pixels are flattened onto white
#[derive(Debug, Default, Clone, Copy)]
pub struct JpegEncoder;

impl ImageEncoder for JpegEncoder {
    fn format(&self) -> ImageFormat {
        ImageFormat::Jpeg
    }

    fn encode(&self, pixels: &RgbaImage, quality: u8) -> Result<Vec<u8>, ImageError> {
        let flattened = RgbImage::from_fn(pixels.width(), pixels.height(), |x, y| {
            let [r, g, b, a] = pixels.get_pixel(x, y).0;
            let alpha = a as u16;
            let blend = |c: u8| ((c as u16 * alpha + 255 * (255 - alpha)) / 255) as u8;
            Rgb([blend(r), blend(g), blend(b)])
        });

        let mut buffer = Vec::new();
        jpeg::JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100))
            .encode_image(&flattened)?;

        Ok(buffer)
    }
}

/// Default encoder for a format
pub fn encoder_for(format: ImageFormat) -> Arc<dyn ImageEncoder> {
    match format {
        ImageFormat::WebP => Arc::new(WebPEncoder),
        ImageFormat::Jpeg => Arc::new(JpegEncoder),
    }
}
