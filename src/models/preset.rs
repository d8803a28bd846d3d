//! Optimization Presets
//!
//! Named output constraints for each kind of image the storefront serves.

use std::str::FromStr;
use serde::{Deserialize, Serialize};

use super::image::ImageFormat;

/// Preset error
#[derive(Debug, thiserror::Error)]
pub enum PresetError {
    #[error("Unknown preset: {0}")]
    Unknown(String),
    #[error("Invalid preset {name}: {reason}")]
    Invalid { name: PresetName, reason: String },
}

/// Image use case
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum PresetName {
    BookCover,
    AuthorPhoto,
    HeroBackground,
    PostFeaturedImage,
    PostInlineImage,
}

impl PresetName {
    pub const ALL: [PresetName; 5] = [
        Self::BookCover,
        Self::AuthorPhoto,
        Self::HeroBackground,
        Self::PostFeaturedImage,
        Self::PostInlineImage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BookCover => "bookCover",
            Self::AuthorPhoto => "authorPhoto",
            Self::HeroBackground => "heroBackground",
            Self::PostFeaturedImage => "postFeaturedImage",
            Self::PostInlineImage => "postInlineImage",
        }
    }

    /// Storage directory for newly written images of this kind
    pub fn storage_dir(&self) -> &'static str {
        match self {
            Self::BookCover => "book-covers",
            Self::AuthorPhoto => "author-photos",
            Self::HeroBackground => "hero",
            Self::PostFeaturedImage => "posts/featured",
            Self::PostInlineImage => "posts/inline",
        }
    }
}

impl std::fmt::Display for PresetName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PresetName {
    type Err = PresetError;

    /// Accepts `bookCover`, `book-cover` and `book_cover` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_lowercase();

        Self::ALL
            .into_iter()
            .find(|name| name.as_str().to_lowercase() == normalized)
            .ok_or_else(|| PresetError::Unknown(s.to_string()))
    }
}

/// Output constraints for one use case
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct OptimizationPreset {
    pub name: PresetName,
    /// Byte budget for the encoded output
    pub max_output_bytes: u64,
    /// Upper bound on the longer edge, in pixels
    pub max_dimension: u32,
    /// Initial encoder quality in (0, 1]
    pub target_quality: f32,
    pub preferred_format: ImageFormat,
}

impl OptimizationPreset {
    pub fn new(
        name: PresetName,
        max_output_bytes: u64,
        max_dimension: u32,
        target_quality: f32,
        preferred_format: ImageFormat,
    ) -> Result<Self, PresetError> {
        let invalid = |reason: &str| PresetError::Invalid {
            name,
            reason: reason.to_string(),
        };

        if max_output_bytes == 0 {
            return Err(invalid("max_output_bytes must be greater than 0"));
        }
        if max_dimension == 0 {
            return Err(invalid("max_dimension must be greater than 0"));
        }
        if !(target_quality > 0.0 && target_quality <= 1.0) {
            return Err(invalid("target_quality must be in (0, 1]"));
        }

        Ok(Self {
            name,
            max_output_bytes,
            max_dimension,
            target_quality,
            preferred_format,
        })
    }

    /// Built-in constraints for a use case
    pub fn standard(name: PresetName) -> Self {
        let (max_output_bytes, max_dimension) = match name {
            PresetName::BookCover => (157_286, 1200),
            PresetName::AuthorPhoto => (104_858, 800),
            PresetName::HeroBackground => (314_573, 1920),
            PresetName::PostFeaturedImage => (209_715, 1200),
            PresetName::PostInlineImage => (157_286, 1000),
        };

        Self {
            name,
            max_output_bytes,
            max_dimension,
            target_quality: 0.85,
            preferred_format: ImageFormat::WebP,
        }
    }

    /// Initial quality as an integer percent
    pub fn initial_quality(&self) -> u8 {
        (self.target_quality * 100.0).round().clamp(1.0, 100.0) as u8
    }

    /// Whether a stored object of `size` bytes is close enough to the budget
    /// to be left alone.
    pub fn is_within(&self, size: u64, threshold_percent: u32) -> bool {
        (size as u128) * 100 <= (self.max_output_bytes as u128) * threshold_percent as u128
    }
}

/// Immutable lookup from use case to preset
///
/// Built once at startup and passed to the services that need it.
#[derive(Debug, Clone)]
pub struct PresetRegistry {
    book_cover: OptimizationPreset,
    author_photo: OptimizationPreset,
    hero_background: OptimizationPreset,
    post_featured_image: OptimizationPreset,
    post_inline_image: OptimizationPreset,
}

impl PresetRegistry {
    /// The production preset table
    pub fn standard() -> Self {
        Self::from_fn(OptimizationPreset::standard)
    }

    /// Build a registry from a constructor per use case.
    ///
    /// The returned preset's `name` is forced to the slot it fills.
    pub fn from_fn(build: impl Fn(PresetName) -> OptimizationPreset) -> Self {
        let slot = |name| OptimizationPreset { name, ..build(name) };

        Self {
            book_cover: slot(PresetName::BookCover),
            author_photo: slot(PresetName::AuthorPhoto),
            hero_background: slot(PresetName::HeroBackground),
            post_featured_image: slot(PresetName::PostFeaturedImage),
            post_inline_image: slot(PresetName::PostInlineImage),
        }
    }

    pub fn get(&self, name: PresetName) -> &OptimizationPreset {
        match name {
            PresetName::BookCover => &self.book_cover,
            PresetName::AuthorPhoto => &self.author_photo,
            PresetName::HeroBackground => &self.hero_background,
            PresetName::PostFeaturedImage => &self.post_featured_image,
            PresetName::PostInlineImage => &self.post_inline_image,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &OptimizationPreset> {
        PresetName::ALL.into_iter().map(move |name| self.get(name))
    }
}

impl Default for PresetRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table() {
        let registry = PresetRegistry::standard();

        let cover = registry.get(PresetName::BookCover);
        assert_eq!(cover.max_output_bytes, 157_286);
        assert_eq!(cover.max_dimension, 1200);

        let author = registry.get(PresetName::AuthorPhoto);
        assert_eq!(author.max_output_bytes, 104_858);
        assert_eq!(author.max_dimension, 800);

        assert_eq!(registry.get(PresetName::HeroBackground).max_output_bytes, 314_573);
        assert_eq!(registry.get(PresetName::PostFeaturedImage).max_output_bytes, 209_715);
        assert_eq!(registry.get(PresetName::PostInlineImage).max_dimension, 1000);

        for preset in registry.iter() {
            assert!(preset.max_output_bytes > 0);
            assert!(preset.max_dimension > 0);
            assert_eq!(preset.initial_quality(), 85);
            assert_eq!(preset.preferred_format, ImageFormat::WebP);
        }
    }

    #[test]
    fn test_parse_preset_name() {
        assert_eq!("bookCover".parse::<PresetName>().unwrap(), PresetName::BookCover);
        assert_eq!("author-photo".parse::<PresetName>().unwrap(), PresetName::AuthorPhoto);
        assert_eq!("POST_INLINE_IMAGE".parse::<PresetName>().unwrap(), PresetName::PostInlineImage);
        assert!("banner".parse::<PresetName>().is_err());
    }

    #[test]
    fn test_preset_name_serde() {
        let json = serde_json::to_string(&PresetName::HeroBackground).unwrap();
        assert_eq!(json, "\"heroBackground\"");
        let back: PresetName = serde_json::from_str("\"postFeaturedImage\"").unwrap();
        assert_eq!(back, PresetName::PostFeaturedImage);
    }

    #[test]
    fn test_preset_invariants() {
        assert!(OptimizationPreset::new(PresetName::BookCover, 0, 100, 0.8, ImageFormat::WebP).is_err());
        assert!(OptimizationPreset::new(PresetName::BookCover, 100, 0, 0.8, ImageFormat::WebP).is_err());
        assert!(OptimizationPreset::new(PresetName::BookCover, 100, 100, 0.0, ImageFormat::WebP).is_err());
        assert!(OptimizationPreset::new(PresetName::BookCover, 100, 100, 1.5, ImageFormat::WebP).is_err());
        assert!(OptimizationPreset::new(PresetName::BookCover, 100, 100, 1.0, ImageFormat::Jpeg).is_ok());
    }

    #[test]
    fn test_from_fn_forces_slot_name() {
        let registry = PresetRegistry::from_fn(|_| {
            OptimizationPreset::new(PresetName::BookCover, 1_000, 64, 0.5, ImageFormat::Jpeg).unwrap()
        });
        let hero = registry.get(PresetName::HeroBackground);
        assert_eq!(hero.name, PresetName::HeroBackground);
        assert_eq!(hero.max_output_bytes, 1_000);
    }

    #[test]
    fn test_is_within_threshold() {
        let preset = OptimizationPreset::standard(PresetName::BookCover);
        let limit = preset.max_output_bytes * 120 / 100;
        assert!(preset.is_within(preset.max_output_bytes, 120));
        assert!(preset.is_within(limit, 120));
        assert!(!preset.is_within(limit + 2, 120));
    }
}
