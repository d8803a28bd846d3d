//! Image Service
//!
//! Decode, orientation fix-up and bounded resize. Produces the pixel buffer
//! that every encode attempt borrows.

use std::io::Cursor;
use image::{imageops::FilterType, DynamicImage, RgbaImage};

use crate::models::ImageDimensions;

/// Image processing error
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Failed to encode {format}: {reason}")]
    Encode { format: &'static str, reason: String },
    #[error("Image has no pixels")]
    Empty,
}

/// Image service for processing
pub struct ImageService {
    /// Resampling filter used when downscaling
    filter: FilterType,
}

impl ImageService {
    /// Create a new image service
    pub fn new() -> Self {
        Self {
            filter: FilterType::Lanczos3,
        }
    }

    /// Decode and rotate upright according to EXIF orientation
    pub fn decode(&self, data: &[u8]) -> Result<DynamicImage, ImageError> {
        let img = image::load_from_memory(data)?;
        if img.width() == 0 || img.height() == 0 {
            return Err(ImageError::Empty);
        }

        Ok(apply_orientation(img, read_orientation(data)))
    }

    /// Downscale so the longer edge fits `max_dimension`. Never upscales.
    pub fn resize_to_fit(&self, img: DynamicImage, max_dimension: u32) -> DynamicImage {
        let current = ImageDimensions::new(img.width(), img.height());
        let target = current.fit_within(max_dimension);

        if target == current {
            img
        } else {
            img.resize_exact(target.width, target.height, self.filter)
        }
    }

    /// Decode, orient and resize into an RGBA buffer ready for encoding
    pub fn prepare(&self, data: &[u8], max_dimension: u32) -> Result<RgbaImage, ImageError> {
        let img = self.decode(data)?;
        Ok(self.resize_to_fit(img, max_dimension).into_rgba8())
    }
}

impl Default for ImageService {
    fn default() -> Self {
        Self::new()
    }
}

/// Read the EXIF orientation tag. Returns 1 (upright) when absent.
pub fn read_orientation(data: &[u8]) -> u32 {
    let mut cursor = Cursor::new(data);
    let reader = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(reader) => reader,
        Err(_) => return 1,
    };

    reader
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
        .unwrap_or(1)
}

/// Apply an EXIF orientation value (1-8)
pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    /// Encode a smooth gradient as JPEG
    pub(crate) fn gradient_jpeg(width: u32, height: u32) -> Vec<u8> {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });
        let mut bytes = Vec::new();
        image::codecs::jpeg::JpegEncoder::new_with_quality(&mut bytes, 90)
            .encode_image(&img)
            .unwrap();
        bytes
    }

    /// Splice an EXIF APP1 segment carrying only an orientation tag after SOI
    pub(crate) fn with_orientation(jpeg: &[u8], orientation: u16) -> Vec<u8> {
        let mut tiff = Vec::new();
        tiff.extend_from_slice(b"II*\0");
        tiff.extend_from_slice(&8u32.to_le_bytes());
        tiff.extend_from_slice(&1u16.to_le_bytes());
        tiff.extend_from_slice(&0x0112u16.to_le_bytes());
        tiff.extend_from_slice(&3u16.to_le_bytes());
        tiff.extend_from_slice(&1u32.to_le_bytes());
        tiff.extend_from_slice(&orientation.to_le_bytes());
        tiff.extend_from_slice(&[0, 0]);
        tiff.extend_from_slice(&0u32.to_le_bytes());

        let mut payload = b"Exif\0\0".to_vec();
        payload.extend_from_slice(&tiff);

        let mut out = jpeg[..2].to_vec();
        out.extend_from_slice(&[0xFF, 0xE1]);
        out.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
        out.extend_from_slice(&payload);
        out.extend_from_slice(&jpeg[2..]);
        out
    }

    #[test]
    fn test_orientation_rotates_dimensions() {
        let service = ImageService::new();
        let jpeg = with_orientation(&gradient_jpeg(40, 20), 6);

        assert_eq!(read_orientation(&jpeg), 6);
        let img = service.decode(&jpeg).unwrap();
        assert_eq!((img.width(), img.height()), (20, 40));
    }

    #[test]
    fn test_missing_orientation_is_upright() {
        let jpeg = gradient_jpeg(40, 20);
        assert_eq!(read_orientation(&jpeg), 1);
        assert_eq!(read_orientation(b"not an image"), 1);
    }

    #[test]
    fn test_prepare_downscales() {
        let service = ImageService::new();
        let pixels = service.prepare(&gradient_jpeg(300, 400), 100).unwrap();
        assert_eq!((pixels.width(), pixels.height()), (75, 100));
    }

    #[test]
    fn test_prepare_never_upscales() {
        let service = ImageService::new();
        let pixels = service.prepare(&gradient_jpeg(120, 90), 1200).unwrap();
        assert_eq!((pixels.width(), pixels.height()), (120, 90));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let service = ImageService::new();
        assert!(matches!(
            service.decode(b"definitely not pixels"),
            Err(ImageError::Image(_))
        ));
    }
}
