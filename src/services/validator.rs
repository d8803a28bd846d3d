//! Input Validator
//!
//! Rejects unsuitable uploads before any decoding happens.

use mime::Mime;

use crate::models::SourceImage;
use super::optimizer::OptimizeError;

/// Raw upload ceiling, independent of any preset
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Raster types the optimizer accepts
pub const ALLOWED_IMAGE_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

/// Upload validator
#[derive(Debug, Clone)]
pub struct InputValidator {
    /// Maximum raw upload size in bytes
    max_upload_bytes: u64,
}

impl InputValidator {
    pub fn new() -> Self {
        Self::with_max_upload_bytes(DEFAULT_MAX_UPLOAD_BYTES)
    }

    pub fn with_max_upload_bytes(max_upload_bytes: u64) -> Self {
        Self { max_upload_bytes }
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    /// Check a declared MIME type against the allow-list.
    ///
    /// Parameters are ignored and the legacy `image/jpg` spelling is accepted.
    pub fn is_allowed(&self, declared: &str) -> bool {
        let Ok(parsed) = declared.trim().parse::<Mime>() else {
            return false;
        };

        let essence = parsed.essence_str().to_ascii_lowercase();
        let essence = if essence == "image/jpg" { "image/jpeg" } else { essence.as_str() };

        ALLOWED_IMAGE_TYPES.contains(&essence)
    }

    /// Check type then size, without consuming the file
    pub fn check(&self, file: &SourceImage) -> Result<(), OptimizeError> {
        if !self.is_allowed(&file.mime_type) {
            return Err(OptimizeError::UnsupportedFormat(file.mime_type.clone()));
        }

        if file.size() > self.max_upload_bytes {
            return Err(OptimizeError::FileTooLarge {
                size: file.size(),
                max: self.max_upload_bytes,
            });
        }

        Ok(())
    }

    /// Validate and pass the untouched file through
    pub fn validate(&self, file: SourceImage) -> Result<SourceImage, OptimizeError> {
        self.check(&file)?;
        Ok(file)
    }
}

impl Default for InputValidator {
    fn default() -> Self {
        Self::new()
    }
}
