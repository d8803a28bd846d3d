//! ShelfMedia Settings

use std::path::Path;
use serde::{Deserialize, Serialize};

use crate::services::migration::DEFAULT_SKIP_THRESHOLD_PERCENT;
use crate::services::validator::DEFAULT_MAX_UPLOAD_BYTES;

/// Settings error
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid settings file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid settings: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Media settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MediaSettings {
    // Storage
    /// Root directory for stored objects
    pub storage_path: String,
    /// Base URL for stored objects
    pub base_url: String,
    /// JSON file holding image records
    pub records_path: String,

    // Upload limits
    /// Maximum raw upload size in bytes
    pub max_upload_bytes: u64,

    // Migration
    /// Objects at or below this percentage of their budget are skipped
    pub skip_threshold_percent: u32,

    // Logging
    pub json_logs: bool,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            storage_path: "uploads/media".to_string(),
            base_url: "/media".to_string(),
            records_path: "uploads/records.json".to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            skip_threshold_percent: DEFAULT_SKIP_THRESHOLD_PERCENT,
            json_logs: false,
        }
    }
}

impl MediaSettings {
    /// Load settings from file. Missing keys take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&content)?;
        Ok(settings)
    }

    /// Save settings to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SettingsError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate settings
    pub fn validate(&self) -> Result<(), SettingsError> {
        let mut errors = Vec::new();

        if self.storage_path.is_empty() {
            errors.push("Storage path cannot be empty".to_string());
        }

        if self.records_path.is_empty() {
            errors.push("Records path cannot be empty".to_string());
        }

        if self.max_upload_bytes == 0 {
            errors.push("Max upload size must be greater than 0".to_string());
        }

        if self.skip_threshold_percent < 100 {
            errors.push("Skip threshold must be at least 100 percent".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(SettingsError::Invalid(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let settings = MediaSettings::default();
        assert_eq!(settings.max_upload_bytes, 50 * 1024 * 1024);
        assert_eq!(settings.skip_threshold_percent, 120);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("media.json");

        let settings = MediaSettings {
            base_url: "https://cdn.example.test".to_string(),
            json_logs: true,
            ..Default::default()
        };
        settings.save(&path).unwrap();

        assert_eq!(MediaSettings::load(&path).unwrap(), settings);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("media.json");
        std::fs::write(&path, r#"{ "storage_path": "/srv/media" }"#).unwrap();

        let settings = MediaSettings::load(&path).unwrap();
        assert_eq!(settings.storage_path, "/srv/media");
        assert_eq!(settings.skip_threshold_percent, 120);
    }

    #[test]
    fn test_validate_collects_errors() {
        let settings = MediaSettings {
            storage_path: String::new(),
            skip_threshold_percent: 90,
            ..Default::default()
        };

        match settings.validate() {
            Err(SettingsError::Invalid(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
