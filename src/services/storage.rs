//! Storage Service
//!
//! Object storage seam and the local filesystem implementation.

use std::path::{Component, Path, PathBuf};
use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};
use tokio::fs;
use uuid::Uuid;

/// Storage error
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("Upload failed: {0}")]
    UploadFailed(String),
}

/// Stored file information
#[derive(Debug, Clone)]
pub struct StoredFile {
    /// Relative path
    pub path: String,
    /// Public URL
    pub url: String,
    /// File size in bytes
    pub size: u64,
    /// Content hash
    pub hash: String,
}

/// Durable object storage addressed by relative path
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Read an object
    async fn get(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Write an object, replacing any existing one at `path`
    async fn put(&self, path: &str, data: &[u8], content_type: &str) -> Result<StoredFile, StorageError>;

    /// Remove an object. Missing objects are not an error.
    async fn delete(&self, path: &str) -> Result<(), StorageError>;

    /// Public URL for a path
    fn public_url(&self, path: &str) -> String;
}

/// Filesystem-backed object store
pub struct LocalStorage {
    /// Base uploads directory
    root: PathBuf,
    /// Base URL for uploads
    base_url: String,
}

impl LocalStorage {
    /// Create a new local storage
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }

    /// Initialize storage (create directories)
    pub async fn init(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Get uploads directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check if file exists
    pub async fn exists(&self, path: &str) -> bool {
        match self.full_path(path) {
            Ok(full) => fs::try_exists(full).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Get file size
    pub async fn size(&self, path: &str) -> Result<u64, StorageError> {
        let metadata = fs::metadata(self.full_path(path)?).await?;
        Ok(metadata.len())
    }

    /// Resolve a relative object path, refusing anything that escapes the root
    fn full_path(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path);
        let safe = !path.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));

        if !safe {
            return Err(StorageError::InvalidPath(path.to_string()));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl ObjectStore for LocalStorage {
    async fn get(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let full_path = self.full_path(path)?;

        match fs::read(&full_path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, path: &str, data: &[u8], content_type: &str) -> Result<StoredFile, StorageError> {
        let full_path = self.full_path(path)?;

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::write(&full_path, data).await?;

        tracing::debug!(path, content_type, size = data.len(), "Stored object");

        Ok(StoredFile {
            path: path.to_string(),
            url: self.public_url(path),
            size: data.len() as u64,
            hash: content_hash(data),
        })
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let full_path = self.full_path(path)?;

        match fs::remove_file(&full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}

/// SHA-256 of the content, hex encoded
pub fn content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Fresh object path under `dir`: `<dir>/<timestamp>-<random>.<ext>`
pub fn unique_object_path(dir: &str, extension: &str) -> String {
    let timestamp = Utc::now().format("%Y%m%d%H%M%S%3f");
    let random = Uuid::new_v4().simple().to_string();
    let name = format!("{}-{}.{}", timestamp, &random[..12], extension);

    let dir = dir.trim_matches('/');
    if dir.is_empty() {
        name
    } else {
        format!("{}/{}", dir, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_storage_put_and_get() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "/media/");
        storage.init().await.unwrap();

        let stored = storage
            .put("book-covers/a.webp", b"RIFF....WEBP", "image/webp")
            .await
            .unwrap();

        assert_eq!(stored.url, "/media/book-covers/a.webp");
        assert_eq!(stored.size, 12);
        assert_eq!(stored.hash.len(), 64);
        assert_eq!(storage.get("book-covers/a.webp").await.unwrap(), b"RIFF....WEBP");
        assert_eq!(storage.size("book-covers/a.webp").await.unwrap(), 12);
    }

    #[tokio::test]
    async fn test_storage_delete() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "/media");

        storage.put("delete-me.jpg", b"data", "image/jpeg").await.unwrap();
        assert!(storage.exists("delete-me.jpg").await);

        storage.delete("delete-me.jpg").await.unwrap();
        assert!(!storage.exists("delete-me.jpg").await);

        // second delete is a no-op
        storage.delete("delete-me.jpg").await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_object() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "/media");
        assert!(matches!(
            storage.get("nope.webp").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_escaping_paths() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "/media");

        for path in ["../secret", "/etc/passwd", "a/../../b", ""] {
            assert!(
                matches!(storage.get(path).await, Err(StorageError::InvalidPath(_))),
                "{}",
                path
            );
        }
    }

    #[test]
    fn test_unique_object_path() {
        let a = unique_object_path("author-photos/", "webp");
        let b = unique_object_path("author-photos", "webp");
        assert!(a.starts_with("author-photos/"));
        assert!(a.ends_with(".webp"));
        assert_ne!(a, b);
        assert!(!unique_object_path("", "jpg").contains('/'));
    }
}
