//! ShelfMedia Services
//!
//! Image optimization, storage and migration services.

pub mod encoder;
pub mod image;
pub mod migration;
pub mod optimizer;
pub mod quality;
pub mod records;
pub mod storage;
pub mod validator;

pub use encoder::{encoder_for, ImageEncoder, JpegEncoder, WebPEncoder};
pub use image::{ImageError, ImageService};
pub use migration::{
    MigrationDriver, MigrationError, MigrationOptions, MigrationReport, RecordOutcome, RecordStatus,
};
pub use optimizer::{OptimizeError, OptimizedImage, OptimizerService};
pub use quality::{QualitySearch, SearchState};
pub use records::{JsonRecordStore, RecordError, RecordStore};
pub use storage::{LocalStorage, ObjectStore, StorageError, StoredFile};
pub use validator::InputValidator;
