//! Upload Handlers
//!
//! File picker uploads: validate, optimize for the chosen preset, store.

use std::sync::Arc;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::models::{format_bytes, sanitize_filename, PresetName, SourceImage};
use crate::services::storage::unique_object_path;
use crate::services::{ObjectStore, OptimizeError, OptimizerService, StorageError};
use crate::services::validator::ALLOWED_IMAGE_TYPES;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub path: String,
    pub url: String,
    pub filename: String,
    pub mime_type: String,
    pub size: u64,
    pub size_formatted: String,
    pub width: u32,
    pub height: u32,
    pub quality: u8,
    pub within_budget: bool,
}

/// Error body shown to the uploader
#[derive(Debug, Serialize, PartialEq)]
pub struct UploadErrorResponse {
    pub kind: String,
    pub message: String,
}

impl From<OptimizeError> for UploadErrorResponse {
    fn from(err: OptimizeError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.user_message(),
        }
    }
}

impl From<StorageError> for UploadErrorResponse {
    fn from(_: StorageError) -> Self {
        Self {
            kind: "storage_failed".to_string(),
            message: "We couldn't save this image. Please try again.".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    /// Preset name in any accepted spelling (`bookCover`, `book-cover`)
    pub preset: String,
    pub mime_type: Option<String>,
}

/// Upload handler
pub struct UploadHandler {
    optimizer: OptimizerService,
    storage: Arc<dyn ObjectStore>,
}

impl UploadHandler {
    pub fn new(optimizer: OptimizerService, storage: Arc<dyn ObjectStore>) -> Self {
        Self { optimizer, storage }
    }

    /// Handle a single file upload
    pub async fn upload(
        &self,
        data: Vec<u8>,
        filename: &str,
        mime_type: &str,
        preset: PresetName,
    ) -> Result<UploadResponse, UploadErrorResponse> {
        let source = SourceImage::new(data, mime_type, filename);

        let optimized = self
            .optimizer
            .validate_and_optimize(source, preset)
            .await
            .map_err(|e| {
                error!(filename, preset = %preset, error = %e, "Upload rejected");
                UploadErrorResponse::from(e)
            })?;

        let path = unique_object_path(preset.storage_dir(), optimized.format.extension());
        let stored = self
            .storage
            .put(&path, &optimized.data, optimized.mime_type)
            .await
            .map_err(|e| {
                error!(path = %path, error = %e, "Failed to store optimized upload");
                UploadErrorResponse::from(e)
            })?;

        info!(
            filename,
            preset = %preset,
            path = %stored.path,
            size = stored.size,
            original_size = optimized.original_size,
            "Upload stored"
        );

        Ok(UploadResponse {
            path: stored.path,
            url: stored.url,
            filename: sanitize_filename(&optimized.filename),
            mime_type: optimized.mime_type.to_string(),
            size: stored.size,
            size_formatted: format_bytes(stored.size),
            width: optimized.dimensions.width,
            height: optimized.dimensions.height,
            quality: optimized.quality,
            within_budget: optimized.within_budget(),
        })
    }

    /// Upload with the preset given by name
    pub async fn upload_request(
        &self,
        data: Vec<u8>,
        filename: &str,
        request: UploadRequest,
    ) -> Result<UploadResponse, UploadErrorResponse> {
        let preset = request
            .preset
            .parse::<PresetName>()
            .map_err(|e| UploadErrorResponse {
                kind: "unknown_preset".to_string(),
                message: e.to_string(),
            })?;

        let mime_type = request.mime_type.unwrap_or_else(|| {
            mime_guess::from_path(filename)
                .first_or_octet_stream()
                .to_string()
        });

        self.upload(data, filename, &mime_type, preset).await
    }

    /// Handle multiple file uploads for one preset, in order
    pub async fn upload_multiple(
        &self,
        files: Vec<(Vec<u8>, String, String)>,
        preset: PresetName,
    ) -> Vec<Result<UploadResponse, UploadErrorResponse>> {
        let mut results = Vec::with_capacity(files.len());

        for (data, filename, mime_type) in files {
            results.push(self.upload(data, &filename, &mime_type, preset).await);
        }

        results
    }

    /// Validate file before upload
    pub fn validate_file(&self, size: u64, mime_type: &str) -> Result<(), UploadErrorResponse> {
        let validator = self.optimizer.validator();

        if !validator.is_allowed(mime_type) {
            return Err(OptimizeError::UnsupportedFormat(mime_type.to_string()).into());
        }

        if size > validator.max_upload_bytes() {
            return Err(OptimizeError::FileTooLarge {
                size,
                max: validator.max_upload_bytes(),
            }
            .into());
        }

        Ok(())
    }

    /// Get allowed file types
    pub fn get_allowed_types(&self) -> Vec<String> {
        ALLOWED_IMAGE_TYPES.iter().map(|t| t.to_string()).collect()
    }

    /// Get max file size
    pub fn get_max_file_size(&self) -> u64 {
        self.optimizer.validator().max_upload_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PresetRegistry;
    use crate::services::image::tests::gradient_jpeg;
    use crate::services::LocalStorage;
    use tempfile::tempdir;

    fn handler(root: &std::path::Path) -> UploadHandler {
        let optimizer = OptimizerService::new(Arc::new(PresetRegistry::standard()));
        let storage = Arc::new(LocalStorage::new(root, "/media"));
        UploadHandler::new(optimizer, storage)
    }

    #[tokio::test]
    async fn test_upload_stores_webp() {
        let dir = tempdir().unwrap();
        let handler = handler(dir.path());

        let response = handler
            .upload(gradient_jpeg(1600, 1200), "Jane Doe.jpg", "image/jpeg", PresetName::AuthorPhoto)
            .await
            .unwrap();

        assert!(response.path.starts_with("author-photos/"));
        assert!(response.path.ends_with(".webp"));
        assert_eq!(response.url, format!("/media/{}", response.path));
        assert_eq!(response.filename, "jane-doe.webp");
        assert_eq!(response.mime_type, "image/webp");
        assert_eq!((response.width, response.height), (800, 600));
        assert!(response.within_budget);
        assert!(dir.path().join(&response.path).exists());
    }

    #[tokio::test]
    async fn test_upload_unsupported_type() {
        let dir = tempdir().unwrap();
        let handler = handler(dir.path());

        let err = handler
            .upload(b"GIF89a".to_vec(), "anim.gif", "image/gif", PresetName::BookCover)
            .await
            .unwrap_err();

        assert_eq!(err.kind, "unsupported_format");
        assert!(err.message.contains("JPEG, PNG or WebP"));
    }

    #[tokio::test]
    async fn test_upload_request_unknown_preset() {
        let dir = tempdir().unwrap();
        let handler = handler(dir.path());

        let request = UploadRequest {
            preset: "thumbnail".to_string(),
            mime_type: None,
        };
        let err = handler
            .upload_request(gradient_jpeg(10, 10), "a.jpg", request)
            .await
            .unwrap_err();

        assert_eq!(err.kind, "unknown_preset");
    }

    #[tokio::test]
    async fn test_upload_request_guesses_type_from_name() {
        let dir = tempdir().unwrap();
        let handler = handler(dir.path());

        let request = UploadRequest {
            preset: "post-inline-image".to_string(),
            mime_type: None,
        };
        let response = handler
            .upload_request(gradient_jpeg(120, 80), "inline.jpeg", request)
            .await
            .unwrap();

        assert!(response.path.starts_with("posts/inline/"));
    }

    #[tokio::test]
    async fn test_upload_multiple_keeps_order() {
        let dir = tempdir().unwrap();
        let handler = handler(dir.path());

        let results = handler
            .upload_multiple(
                vec![
                    (gradient_jpeg(50, 50), "a.jpg".to_string(), "image/jpeg".to_string()),
                    (vec![1, 2, 3], "b.pdf".to_string(), "application/pdf".to_string()),
                ],
                PresetName::PostFeaturedImage,
            )
            .await;

        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }

    #[test]
    fn test_validate_file() {
        let dir = tempdir().unwrap();
        let handler = handler(dir.path());

        assert!(handler.validate_file(1024, "image/png").is_ok());
        let err = handler.validate_file(80 * 1024 * 1024, "image/png").unwrap_err();
        assert_eq!(err.kind, "file_too_large");
        assert!(err.message.contains("50MB"));
        assert_eq!(handler.get_max_file_size(), 50 * 1024 * 1024);
        assert_eq!(handler.get_allowed_types().len(), 3);
    }
}
