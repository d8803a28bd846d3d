//! Optimizer Service
//!
//! Adaptive optimization: fit an image into a preset's dimension bound and
//! byte budget with the fewest re-encodes.
//!
//! Every call is independent; the only shared state is the immutable preset
//! registry. The async entry points run the CPU-bound work on tokio's
//! blocking pool. There is no cancellation: dropping the returned future
//! abandons the result but the encode still runs to completion.

use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::models::{
    format_megabytes, ImageDimensions, ImageFormat, OptimizationPreset, PresetName,
    PresetRegistry, SourceImage,
};
use super::encoder::{encoder_for, ImageEncoder};
use super::image::{ImageError, ImageService};
use super::quality::{QualitySearch, SearchState, MAX_ATTEMPTS};
use super::validator::InputValidator;

/// Optimizer service error
#[derive(Debug, thiserror::Error)]
pub enum OptimizeError {
    #[error("Unsupported format: {0} (expected JPEG, PNG or WebP)")]
    UnsupportedFormat(String),
    #[error("File too large: {} exceeds the {} upload limit", megabytes(.size), megabytes(.max))]
    FileTooLarge { size: u64, max: u64 },
    #[error("Optimization failed: {0}")]
    OptimizationFailed(String),
}

fn megabytes(bytes: &u64) -> String {
    format_megabytes(*bytes)
}

impl OptimizeError {
    /// Stable identifier for API responses
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat(_) => "unsupported_format",
            Self::FileTooLarge { .. } => "file_too_large",
            Self::OptimizationFailed(_) => "optimization_failed",
        }
    }

    /// Message suitable for showing to the person who picked the file
    pub fn user_message(&self) -> String {
        match self {
            Self::UnsupportedFormat(_) => {
                "This file type isn't supported. Please choose a JPEG, PNG or WebP image.".to_string()
            }
            Self::FileTooLarge { max, .. } => format!(
                "This image is too large. Please choose a file under {}.",
                format_megabytes(*max)
            ),
            Self::OptimizationFailed(_) => {
                "We couldn't process this image. Please try a different file.".to_string()
            }
        }
    }
}

impl From<ImageError> for OptimizeError {
    fn from(err: ImageError) -> Self {
        Self::OptimizationFailed(err.to_string())
    }
}

/// Optimized image result
#[derive(Debug, Clone)]
pub struct OptimizedImage {
    /// Encoded image data
    pub data: Vec<u8>,
    /// Encoded size in bytes
    pub size: u64,
    /// Output format
    pub format: ImageFormat,
    /// Output MIME type
    pub mime_type: &'static str,
    /// Filename with the output extension
    pub filename: String,
    /// Output dimensions
    pub dimensions: ImageDimensions,
    /// Quality of the returned encode
    pub quality: u8,
    /// Encoded size of every attempt, in order
    pub attempt_sizes: Vec<u64>,
    /// How the quality search ended
    pub outcome: SearchState,
    /// Budget the search aimed for
    pub budget: u64,
    /// Original size in bytes
    pub original_size: u64,
}

impl OptimizedImage {
    /// Number of encodes performed
    pub fn attempts(&self) -> u32 {
        self.attempt_sizes.len() as u32
    }

    pub fn within_budget(&self) -> bool {
        self.size <= self.budget
    }

    /// Get bytes saved
    pub fn bytes_saved(&self) -> u64 {
        self.original_size.saturating_sub(self.size)
    }

    /// Savings percentage (negative when the output grew)
    pub fn savings_percent(&self) -> f64 {
        if self.original_size == 0 {
            return 0.0;
        }
        (self.original_size as f64 - self.size as f64) / self.original_size as f64 * 100.0
    }
}

/// Optimizer service
#[derive(Clone)]
pub struct OptimizerService {
    /// Preset table
    presets: Arc<PresetRegistry>,
    /// Upload checks
    validator: InputValidator,
    /// Decode/resize pipeline
    image_service: Arc<ImageService>,
    /// Replaces the per-format encoder when set
    encoder: Option<Arc<dyn ImageEncoder>>,
}

impl OptimizerService {
    /// Create a new optimizer service
    pub fn new(presets: Arc<PresetRegistry>) -> Self {
        Self {
            presets,
            validator: InputValidator::new(),
            image_service: Arc::new(ImageService::new()),
            encoder: None,
        }
    }

    pub fn with_validator(mut self, validator: InputValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Use `encoder` for every preset regardless of its preferred format
    pub fn with_encoder(mut self, encoder: Arc<dyn ImageEncoder>) -> Self {
        self.encoder = Some(encoder);
        self
    }

    pub fn presets(&self) -> &PresetRegistry {
        &self.presets
    }

    pub fn validator(&self) -> &InputValidator {
        &self.validator
    }

    /// Optimize without validating. Runs on the blocking pool.
    pub async fn optimize(
        &self,
        file: SourceImage,
        preset: PresetName,
    ) -> Result<OptimizedImage, OptimizeError> {
        let service = self.clone();
        tokio::task::spawn_blocking(move || service.optimize_blocking(&file, preset))
            .await
            .map_err(|e| OptimizeError::OptimizationFailed(format!("worker failed: {}", e)))?
    }

    /// Validate, then optimize. Validation errors are returned before any
    /// work is scheduled.
    pub async fn validate_and_optimize(
        &self,
        file: SourceImage,
        preset: PresetName,
    ) -> Result<OptimizedImage, OptimizeError> {
        let file = self.validator.validate(file)?;
        self.optimize(file, preset).await
    }

    /// Synchronous `validate_and_optimize`
    pub fn validate_and_optimize_blocking(
        &self,
        file: &SourceImage,
        preset: PresetName,
    ) -> Result<OptimizedImage, OptimizeError> {
        self.validator.check(file)?;
        self.optimize_blocking(file, preset)
    }

    /// Synchronous `optimize` against a registry preset
    pub fn optimize_blocking(
        &self,
        file: &SourceImage,
        preset: PresetName,
    ) -> Result<OptimizedImage, OptimizeError> {
        self.optimize_with_preset(file, self.presets.get(preset))
    }

    /// Core pipeline: decode, orient, resize once, then search quality.
    ///
    /// The resized buffer is borrowed by every encode. An encoder error at
    /// any attempt aborts the call. Returns the last encode whether or not
    /// it met the budget.
    pub fn optimize_with_preset(
        &self,
        file: &SourceImage,
        preset: &OptimizationPreset,
    ) -> Result<OptimizedImage, OptimizeError> {
        let encoder = self
            .encoder
            .clone()
            .unwrap_or_else(|| encoder_for(preset.preferred_format));

        let pixels = self.image_service.prepare(&file.data, preset.max_dimension)?;
        let dimensions = ImageDimensions::new(pixels.width(), pixels.height());

        let mut search = QualitySearch::new(preset.initial_quality(), preset.max_output_bytes);
        let mut attempt_sizes = Vec::with_capacity(MAX_ATTEMPTS as usize);
        let mut last: Option<(Vec<u8>, u8)> = None;

        while let SearchState::Encoding { quality } = search.state() {
            let encoded = encoder.encode(&pixels, quality)?;
            let size = encoded.len() as u64;
            attempt_sizes.push(size);

            debug!(
                preset = %preset.name,
                attempt = attempt_sizes.len(),
                quality,
                size,
                budget = preset.max_output_bytes,
                "Encoded attempt"
            );

            search.record(size);
            last = Some((encoded, quality));
        }

        let (data, quality) = last.ok_or_else(|| {
            OptimizeError::OptimizationFailed("encoder produced no output".to_string())
        })?;

        let format = encoder.format();
        let result = OptimizedImage {
            size: data.len() as u64,
            data,
            format,
            mime_type: format.mime_type(),
            filename: derive_filename(&file.filename, format),
            dimensions,
            quality,
            attempt_sizes,
            outcome: search.state(),
            budget: preset.max_output_bytes,
            original_size: file.size(),
        };

        if result.within_budget() {
            info!(
                preset = %preset.name,
                file = %file.filename,
                dimensions = %result.dimensions,
                attempts = result.attempts(),
                quality = result.quality,
                size = result.size,
                original_size = result.original_size,
                "Image optimized"
            );
        } else {
            warn!(
                preset = %preset.name,
                file = %file.filename,
                attempts = result.attempts(),
                quality = result.quality,
                size = result.size,
                budget = result.budget,
                outcome = result.outcome.label(),
                "Image still over budget after quality search"
            );
        }

        Ok(result)
    }
}

/// Replace or append the extension for `format` (`cover.jpg` -> `cover.webp`)
pub fn derive_filename(original: &str, format: ImageFormat) -> String {
    let stem = Path::new(original)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("image");

    format!("{}.{}", stem, format.extension())
}
