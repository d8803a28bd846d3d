//! ShelfMedia - Adaptive Image Optimization for the Bookstore Platform
//!
//! ShelfMedia turns arbitrary uploads into web-ready images that fit a
//! per-use-case byte budget:
//!
//! - **Presets**: Book covers, author photos, hero backgrounds and post images
//! - **Adaptive Quality**: Step quality down until the budget is met
//! - **Single Resize**: Decode and resize once, re-encode from the same pixels
//! - **EXIF Orientation**: Phone photos come out upright
//! - **Migration**: Re-optimize stored images when a budget changes
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shelfmedia::{PresetName, ShelfMediaPlugin};
//!
//! #[tokio::main]
//! async fn main() {
//!     let plugin = ShelfMediaPlugin::new();
//!     plugin.initialize().await.expect("Failed to initialize");
//!
//!     let data = std::fs::read("cover.jpg").unwrap();
//!     let response = plugin
//!         .upload_handler()
//!         .upload(data, "cover.jpg", "image/jpeg", PresetName::BookCover)
//!         .await
//!         .unwrap();
//!     println!("Uploaded: {} ({})", response.url, response.size_formatted);
//! }
//! ```
//!
//! ## Configuration
//!
//! ```rust,ignore
//! use shelfmedia::{MediaSettings, ShelfMediaPlugin};
//!
//! let mut settings = MediaSettings::default();
//! settings.storage_path = "/srv/media".to_string();
//! settings.skip_threshold_percent = 120;
//!
//! let plugin = ShelfMediaPlugin::with_settings(settings);
//! ```

pub mod models;
pub mod services;
pub mod handlers;
pub mod settings;
pub mod plugin;

// Re-exports
pub use models::{
    ImageDimensions, ImageFormat, ImageRecord, OptimizationPreset, PresetError, PresetName,
    PresetRegistry, SourceImage,
};

pub use services::{
    ImageService, MigrationDriver, MigrationOptions, MigrationReport, ObjectStore,
    OptimizeError, OptimizedImage, OptimizerService, RecordStore,
};

pub use handlers::UploadHandler;

pub use settings::{MediaSettings, SettingsError};
pub use plugin::ShelfMediaPlugin;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the plugin with default settings
pub fn init() -> ShelfMediaPlugin {
    ShelfMediaPlugin::new()
}

/// Initialize with custom settings
pub fn init_with_settings(settings: MediaSettings) -> ShelfMediaPlugin {
    ShelfMediaPlugin::with_settings(settings)
}
