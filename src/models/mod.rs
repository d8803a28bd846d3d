//! ShelfMedia Models
//!
//! Data structures shared by the optimizer, storage and migration services.

pub mod image;
pub mod media;
pub mod preset;

pub use self::image::*;
pub use self::media::*;
pub use self::preset::*;
