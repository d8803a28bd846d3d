//! Image Models
//!
//! Output formats and pixel dimensions.

use serde::{Deserialize, Serialize};

/// Image format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    WebP,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }
}

impl Default for ImageFormat {
    fn default() -> Self {
        Self::WebP
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Jpeg => write!(f, "JPEG"),
            Self::WebP => write!(f, "WebP"),
        }
    }
}

/// Image dimensions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

impl ImageDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn longer_edge(&self) -> u32 {
        self.width.max(self.height)
    }

    /// Scale so the longer edge is at most `max_dimension`.
    ///
    /// Never upscales. The longer edge lands exactly on `max_dimension` and
    /// the shorter edge is rounded, never below one pixel.
    pub fn fit_within(&self, max_dimension: u32) -> Self {
        let longer = self.longer_edge();
        if longer == 0 || max_dimension == 0 || longer <= max_dimension {
            return *self;
        }

        let scale = max_dimension as f64 / longer as f64;
        let scaled = |edge: u32| ((edge as f64 * scale).round() as u32).clamp(1, max_dimension);

        if self.width >= self.height {
            Self::new(max_dimension, scaled(self.height))
        } else {
            Self::new(scaled(self.width), max_dimension)
        }
    }
}

impl std::fmt::Display for ImageDimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
